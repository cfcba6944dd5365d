//! Reading collection files, writing collection artifacts and computing where
//! those artifacts belong.

pub mod archive;
pub mod collection;
pub mod routing;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error on '{path}': {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed collection file '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Collection field names do not declare the required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Directory '{0}' does not exist")]
    MissingDirectory(PathBuf),

    #[error("Failed to encode collection summary: {0}")]
    Json(#[from] serde_json::Error),
}

impl IoError {
    pub(crate) fn file(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> IoError {
        let path = path.into();
        move |source| IoError::File { path, source }
    }
}
