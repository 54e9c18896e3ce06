//! Error types for package auditing.
//!
//! Most problems found inside a package are not errors in this sense: they are
//! reported as [`Diagnostic`](crate::diagnostic::Diagnostic)s. The variants here
//! describe failures that stop a single step from producing a result at all.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed XML.
    #[error("XML parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid pack URI: {0}")]
    InvalidPackUri(String),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
