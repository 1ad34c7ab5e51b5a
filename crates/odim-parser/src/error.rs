//! Error types for ODIM decoding operations.

use thiserror::Error;

/// Result type for decoder operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Error types for ODIM decoding.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The container could not be opened
    #[error("Failed to open {path}: {message}")]
    Open { path: String, message: String },

    /// Missing required dataset or group
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Any other HDF5 library failure
    #[error("HDF5 error: {0}")]
    Hdf5(String),
}
