//! Error types of the acquisition pipeline.

use std::path::PathBuf;

use odim_parser::DecodeError;
use renderer::{ClassifyError, EmitError};
use thiserror::Error;

/// Failure talking to the remote mirror or storing what it sent.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure turning a downloaded file into an image.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Classification failed: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Rendering failed: {0}")]
    Emit(#[from] EmitError),

    #[error("Conversion worker failed: {0}")]
    Worker(String),
}

/// Failure moving a finished image to its published name.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("Failed to rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
