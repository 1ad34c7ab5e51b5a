//! Published artifact file names.
//!
//! Two layouts are recognised:
//! - current: `<prefix>_<YYYYMMDDHHMMSS>_<score>.png`, score with three decimals
//! - legacy: `<prefix>_<YYYYMMDDHHMMSS>.png`, no score
//!
//! Only the current layout is produced. Temporary outputs use a hidden
//! `.<stem>.png.tmp` name so that a stray temp file never matches either
//! layout.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::time::parse_capture_stamp;

/// Extension of published artifacts (without the dot).
pub const ARTIFACT_EXTENSION: &str = "png";

const TEMP_SUFFIX: &str = ".png.tmp";

/// A parsed artifact file name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactName {
    /// Capture time embedded in the name.
    pub timestamp: DateTime<Utc>,
    /// Rain score, present only in the current layout.
    pub rain_score: Option<f64>,
}

impl ArtifactName {
    /// Parse an artifact file name, returning `None` if it follows neither layout.
    pub fn parse(file_name: &str) -> Option<Self> {
        let name = file_name.strip_suffix(".png")?;
        let parts: Vec<&str> = name.split('_').collect();

        // current layout: ..._<stamp>_<score>
        if parts.len() >= 2 {
            if let Some(timestamp) = parse_capture_stamp(parts[parts.len() - 2]) {
                let rain_score = parts[parts.len() - 1]
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite());
                return Some(Self {
                    timestamp,
                    rain_score,
                });
            }
        }

        // legacy layout: ..._<stamp>
        let timestamp = parse_capture_stamp(parts.last()?)?;
        Some(Self {
            timestamp,
            rain_score: None,
        })
    }
}

/// Final artifact name for a source stem and rain score.
pub fn scored_file_name(stem: &str, rain_score: f64) -> String {
    format!("{}_{:.3}.{}", stem, rain_score, ARTIFACT_EXTENSION)
}

/// Temporary output name for a source stem.
pub fn temporary_file_name(stem: &str) -> String {
    format!(".{}{}", stem, TEMP_SUFFIX)
}

/// True for names produced by [`temporary_file_name`].
pub fn is_temporary(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name.ends_with(TEMP_SUFFIX)
}

/// Source file name without its extension, e.g. `T_PABV23_C_OKPR_20240601120000`.
pub fn source_stem(source_name: &str) -> &str {
    Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source_name)
}

/// Capture time carried by the last `_` segment of a source stem.
pub fn stem_capture_time(stem: &str) -> Option<DateTime<Utc>> {
    stem.rsplit('_').next().and_then(parse_capture_stamp)
}
