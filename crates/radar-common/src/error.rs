//! Error types for the archive query surface.

use thiserror::Error;

/// Result type alias using RadarError.
pub type RadarResult<T> = Result<T, RadarError>;

/// Primary error type for archive queries.
#[derive(Debug, Error)]
pub enum RadarError {
    // === Request Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    // === Lookup Errors ===
    #[error("Unknown product '{0}'")]
    ProductNotFound(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    // === Infrastructure Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl RadarError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            RadarError::MissingParameter(_) | RadarError::InvalidTime(_) => 400,

            RadarError::ProductNotFound(_) | RadarError::NotFound(_) => 404,

            RadarError::StorageError(_) => 500,
        }
    }

    /// Short machine-readable code used in JSON error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            RadarError::MissingParameter(_) => "MissingParameterValue",
            RadarError::InvalidTime(_) => "InvalidDimensionValue",
            RadarError::ProductNotFound(_) => "ProductNotDefined",
            RadarError::NotFound(_) => "NotFound",
            RadarError::StorageError(_) => "NoApplicableCode",
        }
    }
}

impl From<std::io::Error> for RadarError {
    fn from(err: std::io::Error) -> Self {
        RadarError::StorageError(err.to_string())
    }
}
