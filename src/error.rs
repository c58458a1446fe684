use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),

    #[error("invalid content path: {0}")]
    InvalidPath(String),

    #[error("source '{0}' was loaded more than once")]
    DuplicateSource(String),

    #[error(
        "no documentation installed. Run 'devshelf import <doc>' to install documentation"
    )]
    NothingInstalled,

    #[error(
        "no cached catalog. Run 'devshelf import <doc> --index FILE --db FILE --manifest docs.json' to cache one"
    )]
    NoCatalog,

    #[error("none of the installed docs could be loaded")]
    NoLoadableDocs,

    #[error("failed to uninstall: {}", failed.join(", "))]
    UninstallFailed { failed: Vec<String> },

    #[error("could not migrate: {}", failed.join(", "))]
    MigrationFailed { failed: Vec<String> },

    #[error("no matching docs found for: {}", requested.join(", "))]
    NoMatchingSources { requested: Vec<String> },

    #[error("no results found for {query:?}")]
    NoResults { query: String },
}

impl Error {
    /// Whether this error means "nothing found" rather than a failure.
    ///
    /// These are reported to the user as plain messages.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoMatchingSources { .. } | Self::NoResults { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_found_messages_are_distinguishable() {
        let sources = Error::NoMatchingSources {
            requested: vec!["docA".into(), "docC".into()],
        };
        let results = Error::NoResults {
            query: "xyz".into(),
        };

        assert_eq!(sources.to_string(), "no matching docs found for: docA, docC");
        assert_eq!(results.to_string(), "no results found for \"xyz\"");
        assert!(sources.is_recoverable());
        assert!(results.is_recoverable());
    }

    #[test]
    fn aggregate_failures_list_every_item() {
        let err = Error::UninstallFailed {
            failed: vec!["react".into(), "vue".into()],
        };
        assert_eq!(err.to_string(), "failed to uninstall: react, vue");
        assert!(!err.is_recoverable());
        assert!(!Error::NoLoadableDocs.is_recoverable());
    }

    #[test]
    fn io_errors_are_not_recoverable() {
        let err = Error::from(std::io::Error::other("boom"));
        assert!(!err.is_recoverable());
    }
}
