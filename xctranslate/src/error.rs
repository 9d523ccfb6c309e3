//! All error types for the xctranslate crate.
//!
//! [`Error`] is reserved for conditions that abort a run: a catalog that
//! cannot be read, parsed or written, or a configuration that cannot be
//! honoured. Provider-side failures are modeled separately by
//! [`crate::provider::ProviderError`] and never surface here.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("catalog not found: {}", .0.display())]
    CatalogNotFound(PathBuf),

    #[error("catalog parse error in {}: {source}", .path.display())]
    CatalogParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog write error for {}: {source}", .path.display())]
    CatalogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid language code `{0}`")]
    InvalidLanguage(String),

    #[error("provider setup error: {0}")]
    Provider(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Creates a new catalog write error for `path`.
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::CatalogWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Whether this error came from the catalog store. Store failures are the
    /// only errors that end a translation run.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Error::CatalogNotFound(_) | Error::CatalogParse { .. } | Error::CatalogWrite { .. }
        )
    }
}
