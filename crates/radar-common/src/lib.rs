//! Common types and utilities shared across the radar archive services.

pub mod artifact;
pub mod error;
pub mod grid;
pub mod product;
pub mod time;

pub use artifact::{ArtifactName, ARTIFACT_EXTENSION};
pub use error::{RadarError, RadarResult};
pub use grid::{Calibration, RadarFrame};
pub use product::ProductId;
pub use time::{parse_capture_stamp, TimeParseError, TimeRange};
