use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    data_dir::DataDir,
    docset::{Doc, Index, Meta, strip_fragment},
    error::{Error, Result},
};

/// Resolves a search hit to the HTML stored for it.
pub trait ContentSource {
    /// Load the raw HTML for `path` within the doc `source_id`.
    ///
    /// Any `#fragment` on `path` is ignored.
    fn load_content(&self, source_id: &str, path: &str) -> Result<Vec<u8>>;
}

/// Installed documentation on disk.
///
/// ```text
/// docs/<slug>/index.json
/// docs/<slug>/meta.json
/// docs/<slug>/content/<path>.html
/// cache/manifest.json
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn open(data_dir: &DataDir) -> Self {
        Self::new(data_dir.root())
    }

    fn docs_dir(&self) -> PathBuf {
        self.root.join("docs")
    }

    fn doc_dir(&self, slug: &str) -> Result<PathBuf> {
        if !is_safe_slug(slug) {
            return Err(Error::InvalidPath(slug.to_string()));
        }
        Ok(self.docs_dir().join(slug))
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join("cache").join("manifest.json")
    }

    /// Install a doc from its index and its `path -> html` content map.
    ///
    /// Replaces any previous install of the same slug. Content keys that
    /// would escape the content directory are skipped.
    pub fn install(
        &self,
        slug: &str,
        index: &Index,
        db: &HashMap<String, String>,
        doc: Option<&Doc>,
    ) -> Result<Meta> {
        let doc_dir = self.doc_dir(slug)?;
        if doc_dir.exists() {
            std::fs::remove_dir_all(&doc_dir)?;
        }
        let content_dir = doc_dir.join("content");
        std::fs::create_dir_all(&content_dir)?;

        write_json(&doc_dir.join("index.json"), index)?;

        let written = db
            .par_iter()
            .map(|(key, html)| -> Result<bool> {
                let Some(file) = content_file(&content_dir, key) else {
                    tracing::warn!(slug, key = %key, "skipping unsafe content path");
                    return Ok(false);
                };
                if let Some(parent) = file.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&file, html)?;
                Ok(true)
            })
            .collect::<Result<Vec<bool>>>()?;
        let count = written.iter().filter(|w| **w).count();
        tracing::debug!(slug, files = count, "wrote content files");

        let installed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let meta = Meta {
            slug: slug.to_string(),
            mtime: doc.map_or(0, |d| d.mtime),
            installed,
            db_size: doc.map_or(0, |d| d.db_size),
        };
        write_json(&doc_dir.join("meta.json"), &meta)?;

        Ok(meta)
    }

    pub fn load_index(&self, slug: &str) -> Result<Index> {
        let path = self.doc_dir(slug)?.join("index.json");
        let bytes = read_or_not_found(&path, "doc", slug)?;
        Index::from_json(&bytes)
    }

    pub fn load_meta(&self, slug: &str) -> Result<Meta> {
        let path = self.doc_dir(slug)?.join("meta.json");
        let bytes = read_or_not_found(&path, "doc", slug)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn is_installed(&self, slug: &str) -> bool {
        self.doc_dir(slug).is_ok_and(|dir| dir.is_dir())
    }

    /// Slugs of all installed docs, sorted.
    pub fn list_installed(&self) -> Result<Vec<String>> {
        let docs_dir = self.docs_dir();
        if !docs_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut slugs = Vec::new();
        for entry in std::fs::read_dir(&docs_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            slugs.push(name);
        }
        slugs.sort();
        Ok(slugs)
    }

    pub fn uninstall(&self, slug: &str) -> Result<()> {
        let dir = self.doc_dir(slug)?;
        if !dir.is_dir() {
            return Err(Error::NotFound {
                kind: "doc",
                name: slug.to_string(),
            });
        }
        std::fs::remove_dir_all(dir)?;
        Ok(())
    }

    pub fn save_manifest(&self, docs: &[Doc]) -> Result<()> {
        let path = self.manifest_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_json(&path, &docs)
    }

    pub fn load_manifest(&self) -> Result<Vec<Doc>> {
        let path = self.manifest_path();
        let bytes =
            read_or_not_found(&path, "manifest", &path.display().to_string())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl ContentSource for Store {
    fn load_content(&self, source_id: &str, path: &str) -> Result<Vec<u8>> {
        let content_dir = self.doc_dir(source_id)?.join("content");
        let key = strip_fragment(path);
        let file = content_file(&content_dir, key)
            .ok_or_else(|| Error::InvalidPath(path.to_string()))?;
        read_or_not_found(&file, "content", &format!("{source_id}/{key}"))
    }
}

fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\'])
}

/// Map a content key like `api/map` to `content/api/map.html`.
///
/// Returns `None` for keys with empty, `.` or `..` segments.
fn content_file(content_dir: &Path, key: &str) -> Option<PathBuf> {
    let safe = !key.is_empty()
        && !key.contains('\\')
        && key
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    safe.then(|| content_dir.join(format!("{key}.html")))
}

fn read_or_not_found(
    path: &Path,
    kind: &'static str,
    name: &str,
) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound {
            kind,
            name: name.to_string(),
        },
        _ => Error::Io(e),
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docset::{Entry, EntryType};

    fn sample_index() -> Index {
        Index {
            entries: vec![Entry::new("testEntry", "test/path", "test")],
            types: vec![EntryType {
                name: "testType".into(),
                count: 1,
                slug: "test".into(),
            }],
        }
    }

    fn sample_db() -> HashMap<String, String> {
        HashMap::from([(
            "test/path".to_string(),
            "<h1>Test Content</h1>".to_string(),
        )])
    }

    #[test]
    fn install_writes_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let doc = Doc {
            name: "Test".into(),
            slug: "test".into(),
            mtime: 12345,
            db_size: 100,
            ..Doc::default()
        };

        let meta = store
            .install("test", &sample_index(), &sample_db(), Some(&doc))
            .unwrap();

        assert_eq!(meta.slug, "test");
        assert_eq!(meta.mtime, 12345);
        assert_eq!(meta.db_size, 100);
        let doc_dir = tmp.path().join("docs").join("test");
        assert!(doc_dir.join("index.json").exists());
        assert!(doc_dir.join("meta.json").exists());
        assert!(doc_dir.join("content").join("test/path.html").exists());
    }

    #[test]
    fn install_round_trips_index_and_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        store
            .install("test", &sample_index(), &sample_db(), None)
            .unwrap();

        assert_eq!(store.load_index("test").unwrap(), sample_index());
        assert_eq!(store.load_meta("test").unwrap().mtime, 0);
        let html = store.load_content("test", "test/path").unwrap();
        assert_eq!(html, b"<h1>Test Content</h1>");
    }

    #[test]
    fn install_skips_traversal_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let mut db = sample_db();
        db.insert("../escape".into(), "nope".into());
        db.insert("a//b".into(), "nope".into());

        store.install("test", &sample_index(), &db, None).unwrap();

        assert!(!tmp.path().join("docs").join("test").join("escape.html").exists());
        assert!(store.load_content("test", "test/path").is_ok());
    }

    #[test]
    fn reinstall_replaces_previous_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let mut db = sample_db();
        db.insert("old".into(), "<p>old</p>".into());
        store.install("test", &sample_index(), &db, None).unwrap();
        store
            .install("test", &sample_index(), &sample_db(), None)
            .unwrap();

        assert!(matches!(
            store.load_content("test", "old"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn load_content_ignores_fragment() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        store
            .install("test", &sample_index(), &sample_db(), None)
            .unwrap();

        let html = store.load_content("test", "test/path#section").unwrap();
        assert_eq!(html, b"<h1>Test Content</h1>");
    }

    #[test]
    fn load_content_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());

        assert!(matches!(
            store.load_content("test", "../../etc/passwd"),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            store.load_content("../x", "a"),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn load_content_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());

        let err = store.load_content("react", "hooks").unwrap_err();
        assert_eq!(err.to_string(), "content not found: react/hooks");
    }

    #[test]
    fn list_and_uninstall() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        assert!(store.list_installed().unwrap().is_empty());

        store.install("vue", &Index::default(), &HashMap::new(), None).unwrap();
        store.install("go", &Index::default(), &HashMap::new(), None).unwrap();

        assert_eq!(store.list_installed().unwrap(), vec!["go", "vue"]);
        assert!(store.is_installed("go"));

        store.uninstall("go").unwrap();
        assert!(!store.is_installed("go"));
        assert_eq!(store.list_installed().unwrap(), vec!["vue"]);
        assert!(matches!(
            store.uninstall("go"),
            Err(Error::NotFound { kind: "doc", .. })
        ));
    }

    #[test]
    fn manifest_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        assert!(store.load_manifest().is_err());

        let docs = vec![Doc {
            name: "React".into(),
            slug: "react".into(),
            release: "18.3.1".into(),
            ..Doc::default()
        }];
        store.save_manifest(&docs).unwrap();

        assert_eq!(store.load_manifest().unwrap(), docs);
    }
}
