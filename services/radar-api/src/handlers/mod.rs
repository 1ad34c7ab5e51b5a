//! HTTP request handlers for the archive API.

pub mod archive;
pub mod error;
pub mod health;

pub use error::ApiError;
