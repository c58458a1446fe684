use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The DEVSHELF_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/devshelf/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var("DEVSHELF_DATA_DIR") {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("devshelf")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one subdirectory per installed doc.
    pub fn docs_dir(&self) -> PathBuf {
        self.root.join("docs")
    }

    /// Move docs out of the old double-nested `docs/docs/<slug>` layout.
    ///
    /// Safe to run on every start: returns 0 once nothing is left to move.
    /// Slugs that already exist at the new location are left in place. A
    /// doc that cannot be moved does not stop the others; every failure is
    /// reported in one [`Error::MigrationFailed`] at the end.
    pub fn migrate_legacy_layout(&self) -> Result<usize> {
        let legacy = self.docs_dir().join("docs");
        if !legacy.is_dir() {
            return Ok(0);
        }

        let mut migrated = 0;
        let mut failed = Vec::new();
        for entry in std::fs::read_dir(&legacy)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let target = self.docs_dir().join(entry.file_name());
            if target.exists() {
                tracing::warn!(
                    slug = %entry.file_name().to_string_lossy(),
                    "skipping migration, doc already exists at new location"
                );
                continue;
            }

            match std::fs::rename(entry.path(), &target) {
                Ok(()) => migrated += 1,
                Err(e) => {
                    failed.push(format!(
                        "{} ({e})",
                        entry.file_name().to_string_lossy()
                    ));
                }
            }
        }

        if std::fs::remove_dir(&legacy).is_err() {
            tracing::debug!(
                path = %legacy.display(),
                "legacy docs directory not empty, leaving it"
            );
        }
        if migrated > 0 {
            tracing::info!(count = migrated, "migrated documentation sets");
        }

        if failed.is_empty() {
            Ok(migrated)
        } else {
            Err(Error::MigrationFailed { failed })
        }
    }
}
