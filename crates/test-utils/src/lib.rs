//! Shared test utilities for the radar archive workspace.
//!
//! This crate provides common testing infrastructure including:
//! - ODIM_H5 fixture files written with the HDF5 library
//! - Raw grid generators
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
