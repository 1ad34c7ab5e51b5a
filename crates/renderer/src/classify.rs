//! Classification of radar frames into palette bins.
//!
//! Every strategy turns a [`RadarFrame`] into a [`ClassifiedGrid`] whose
//! values are `-1` (transparent) or an index into the product palette:
//!
//! - [`ThresholdClassifier`]: reflectivity in dBZ against lower-bound thresholds
//! - [`RawCodeClassifier`]: linear bins over raw integer codes
//! - [`LevelClassifier`]: physical values against accumulation levels
//!
//! The rain score of a grid is the fraction of non-transparent pixels.

use radar_common::RadarFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::palette::{Palette, CHMI_DBZ_THRESHOLDS, PRECIP_LEVELS_MM};

/// Class value of a transparent pixel.
pub const TRANSPARENT: i16 = -1;

/// Weakest echo shown when no raw visibility floor is configured.
pub const MIN_VISIBLE_DBZ: f64 = 4.0;

/// First raw code of bin 0 for MaxZ composites.
pub const DEFAULT_RAW_MIN: i32 = 73;

/// Raw codes per bin for MaxZ composites.
pub const DEFAULT_RAW_STEP: i32 = 8;

#[derive(Debug, Error, PartialEq)]
pub enum ClassifyError {
    #[error("Classifier defines {bins} bins but the palette has {palette} colours")]
    PaletteMismatch { bins: usize, palette: usize },

    #[error("Bin table must be non-empty and strictly increasing")]
    InvalidThresholds,

    #[error("Raw step must be positive, got {0}")]
    InvalidStep(i32),

    #[error("Cannot classify an empty grid")]
    EmptyGrid,
}

/// Per-pixel classes of a frame, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedGrid {
    width: usize,
    height: usize,
    classes: Vec<i16>,
}

impl ClassifiedGrid {
    pub fn new(width: usize, height: usize, classes: Vec<i16>) -> Result<Self, ClassifyError> {
        if classes.is_empty() || width * height != classes.len() {
            return Err(ClassifyError::EmptyGrid);
        }
        Ok(Self {
            width,
            height,
            classes,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn classes(&self) -> &[i16] {
        &self.classes
    }

    pub fn class_at(&self, x: usize, y: usize) -> Option<i16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.classes[y * self.width + x])
    }

    /// Number of pixels with a class `>= 0`.
    pub fn visible_count(&self) -> usize {
        self.classes.iter().filter(|&&c| c >= 0).count()
    }

    /// Fraction of non-transparent pixels, in `[0, 1]`.
    pub fn rain_score(&self) -> f64 {
        self.visible_count() as f64 / self.classes.len() as f64
    }
}

/// Strategy turning a decoded frame into palette classes.
pub trait Classifier: Send + Sync {
    fn classify(&self, frame: &RadarFrame) -> Result<ClassifiedGrid, ClassifyError>;
}

/// Index of the last entry `<= value`, or `-1` below the first entry.
///
/// Right-open, lower-inclusive bins; values at or above the last entry map
/// to the last bin. NaN maps to `-1`.
#[inline]
fn lower_bound_bin(table: &[f64], value: f64) -> i16 {
    if value.is_nan() {
        return TRANSPARENT;
    }
    table.partition_point(|&t| t <= value) as i16 - 1
}

fn validate_table(table: &[f64], palette: &Palette) -> Result<(), ClassifyError> {
    if table.is_empty()
        || table.windows(2).any(|w| !(w[0] < w[1]))
        || table.iter().any(|t| !t.is_finite())
    {
        return Err(ClassifyError::InvalidThresholds);
    }
    if table.len() != palette.len() {
        return Err(ClassifyError::PaletteMismatch {
            bins: table.len(),
            palette: palette.len(),
        });
    }
    Ok(())
}

fn classify_frame<F>(frame: &RadarFrame, mut f: F) -> Result<ClassifiedGrid, ClassifyError>
where
    F: FnMut(u16) -> i16,
{
    let classes = frame.raw.iter().map(|&raw| f(raw)).collect();
    ClassifiedGrid::new(frame.width, frame.height, classes)
}

// ============================================================================
// Reflectivity thresholds
// ============================================================================

/// Bins reflectivity (dBZ) against ascending lower-bound thresholds.
///
/// A pixel is visible when it is neither nodata nor undetect and either
/// `raw >= raw_visible_min` (when configured) or `dbz >= 4`.
#[derive(Debug, Clone)]
pub struct ThresholdClassifier {
    thresholds: Vec<f64>,
    raw_visible_min: Option<u16>,
}

impl ThresholdClassifier {
    pub fn new(
        thresholds: Vec<f64>,
        raw_visible_min: Option<u16>,
        palette: &Palette,
    ) -> Result<Self, ClassifyError> {
        validate_table(&thresholds, palette)?;
        Ok(Self {
            thresholds,
            raw_visible_min,
        })
    }
}

impl Classifier for ThresholdClassifier {
    fn classify(&self, frame: &RadarFrame) -> Result<ClassifiedGrid, ClassifyError> {
        let cal = frame.calibration;
        classify_frame(frame, |raw| {
            if cal.is_missing(raw) {
                return TRANSPARENT;
            }
            let dbz = cal.physical(raw);
            let visible = match self.raw_visible_min {
                Some(floor) => raw >= floor,
                None => dbz >= MIN_VISIBLE_DBZ,
            };
            if visible {
                lower_bound_bin(&self.thresholds, dbz)
            } else {
                TRANSPARENT
            }
        })
    }
}

// ============================================================================
// Raw code bins
// ============================================================================

/// Bins raw codes linearly: `bin = floor((raw - raw_min) / raw_step)`.
#[derive(Debug, Clone)]
pub struct RawCodeClassifier {
    raw_min: i32,
    raw_step: i32,
    bins: usize,
}

impl RawCodeClassifier {
    pub fn new(raw_min: i32, raw_step: i32, palette: &Palette) -> Result<Self, ClassifyError> {
        if raw_step <= 0 {
            return Err(ClassifyError::InvalidStep(raw_step));
        }
        Ok(Self {
            raw_min,
            raw_step,
            bins: palette.len(),
        })
    }
}

impl Classifier for RawCodeClassifier {
    fn classify(&self, frame: &RadarFrame) -> Result<ClassifiedGrid, ClassifyError> {
        let cal = frame.calibration;
        let bins = self.bins as i32;
        classify_frame(frame, |raw| {
            if cal.is_missing(raw) {
                return TRANSPARENT;
            }
            let bin = (raw as i32 - self.raw_min).div_euclid(self.raw_step);
            if (0..bins).contains(&bin) {
                bin as i16
            } else {
                TRANSPARENT
            }
        })
    }
}

// ============================================================================
// Accumulation levels
// ============================================================================

/// Bins physical values against strictly increasing levels.
///
/// Below the first level is transparent; at or above the last level
/// saturates into the last bin.
#[derive(Debug, Clone)]
pub struct LevelClassifier {
    levels: Vec<f64>,
}

impl LevelClassifier {
    pub fn new(levels: Vec<f64>, palette: &Palette) -> Result<Self, ClassifyError> {
        validate_table(&levels, palette)?;
        Ok(Self { levels })
    }
}

impl Classifier for LevelClassifier {
    fn classify(&self, frame: &RadarFrame) -> Result<ClassifiedGrid, ClassifyError> {
        let cal = frame.calibration;
        classify_frame(frame, |raw| {
            if cal.is_missing(raw) {
                return TRANSPARENT;
            }
            lower_bound_bin(&self.levels, cal.physical(raw))
        })
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Classifier selection as written in product configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierSpec {
    Thresholds {
        #[serde(default = "default_dbz_thresholds")]
        thresholds: Vec<f64>,
        #[serde(default)]
        raw_visible_min: Option<u16>,
    },
    RawCode {
        #[serde(default = "default_raw_min")]
        raw_min: i32,
        #[serde(default = "default_raw_step")]
        raw_step: i32,
        /// Must equal the palette length when given.
        #[serde(default)]
        bins: Option<usize>,
    },
    Levels {
        #[serde(default = "default_precip_levels")]
        levels: Vec<f64>,
    },
}

fn default_dbz_thresholds() -> Vec<f64> {
    CHMI_DBZ_THRESHOLDS.to_vec()
}

fn default_precip_levels() -> Vec<f64> {
    PRECIP_LEVELS_MM.to_vec()
}

fn default_raw_min() -> i32 {
    DEFAULT_RAW_MIN
}

fn default_raw_step() -> i32 {
    DEFAULT_RAW_STEP
}

impl ClassifierSpec {
    /// Build the classifier, checking its bin count against `palette`.
    pub fn build(&self, palette: &Palette) -> Result<Box<dyn Classifier>, ClassifyError> {
        Ok(match self {
            ClassifierSpec::Thresholds {
                thresholds,
                raw_visible_min,
            } => Box::new(ThresholdClassifier::new(
                thresholds.clone(),
                *raw_visible_min,
                palette,
            )?),
            ClassifierSpec::RawCode {
                raw_min,
                raw_step,
                bins,
            } => {
                if let Some(bins) = bins {
                    if *bins != palette.len() {
                        return Err(ClassifyError::PaletteMismatch {
                            bins: *bins,
                            palette: palette.len(),
                        });
                    }
                }
                Box::new(RawCodeClassifier::new(*raw_min, *raw_step, palette)?)
            }
            ClassifierSpec::Levels { levels } => {
                Box::new(LevelClassifier::new(levels.clone(), palette)?)
            }
        })
    }
}
