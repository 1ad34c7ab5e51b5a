//! Decoded radar frames.

use serde::{Deserialize, Serialize};

/// Physical calibration attached to a raw radar grid.
///
/// Physical value = `raw * gain + offset`. `nodata` and `undetect` are raw
/// codes marking pixels without a measurement; either may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub gain: f64,
    pub offset: f64,
    pub nodata: Option<f64>,
    pub undetect: Option<f64>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
            nodata: None,
            undetect: None,
        }
    }
}

impl Calibration {
    /// Convert a raw code to physical units.
    #[inline]
    pub fn physical(&self, raw: u16) -> f64 {
        raw as f64 * self.gain + self.offset
    }

    /// True if the raw code is the nodata or undetect marker.
    #[inline]
    pub fn is_missing(&self, raw: u16) -> bool {
        let raw = raw as f64;
        self.nodata == Some(raw) || self.undetect == Some(raw)
    }
}

/// A raw 2-D radar grid with its calibration, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarFrame {
    pub width: usize,
    pub height: usize,
    pub raw: Vec<u16>,
    pub calibration: Calibration,
}

impl RadarFrame {
    /// Create a frame, returning `None` if `raw` does not match the shape.
    pub fn new(
        width: usize,
        height: usize,
        raw: Vec<u16>,
        calibration: Calibration,
    ) -> Option<Self> {
        if width.checked_mul(height)? != raw.len() {
            return None;
        }
        Some(Self {
            width,
            height,
            raw,
            calibration,
        })
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Physical values for every pixel, in the same order as `raw`.
    pub fn physical_values(&self) -> Vec<f64> {
        self.raw
            .iter()
            .map(|&raw| self.calibration.physical(raw))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_value() {
        let cal = Calibration {
            gain: 0.5,
            offset: -32.0,
            nodata: Some(255.0),
            undetect: Some(0.0),
        };
        assert_eq!(cal.physical(80), 8.0);
        assert!(cal.is_missing(255));
        assert!(cal.is_missing(0));
        assert!(!cal.is_missing(80));
    }

    #[test]
    fn test_frame_shape_checked() {
        assert!(RadarFrame::new(2, 2, vec![0; 4], Calibration::default()).is_some());
        assert!(RadarFrame::new(2, 3, vec![0; 4], Calibration::default()).is_none());
    }

    #[test]
    fn test_missing_codes_absent() {
        let cal = Calibration::default();
        assert!(!cal.is_missing(0));
        assert!(!cal.is_missing(255));
    }
}
