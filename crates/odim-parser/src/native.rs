//! Native ODIM_H5 reading using the HDF5 library.
//!
//! ODIM composites keep the quantity grid in `dataset1/data1/data` and its
//! calibration as attributes of `dataset1/data1/what`.

use std::path::Path;
use std::sync::Once;

use radar_common::{Calibration, RadarFrame};
use tracing::debug;

use crate::error::{DecodeError, DecodeResult};

/// Path of the quantity grid inside the container.
pub const DATA_PATH: &str = "dataset1/data1/data";

/// Path of the group carrying calibration attributes.
pub const WHAT_PATH: &str = "dataset1/data1/what";

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when probing for optional
/// attributes like `undetect`). This disables that output by calling
/// H5Eset_auto2 with null handlers. Safe to call more than once.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Read the first quantity of an ODIM_H5 file into a [`RadarFrame`].
pub fn load_odim_frame(path: &Path) -> DecodeResult<RadarFrame> {
    silence_hdf5_errors();

    let file = hdf5::File::open(path).map_err(|e| DecodeError::Open {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let dataset = file
        .dataset(DATA_PATH)
        .map_err(|_| DecodeError::MissingData(DATA_PATH.to_string()))?;

    let shape = dataset.shape();
    let (height, width) = match shape.as_slice() {
        [h, w] => (*h, *w),
        other => {
            return Err(DecodeError::InvalidFormat(format!(
                "expected 2-D grid at {}, got shape {:?}",
                DATA_PATH, other
            )))
        }
    };
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidFormat(format!(
            "empty grid at {} ({}x{})",
            DATA_PATH, width, height
        )));
    }

    let raw: Vec<u16> = dataset
        .read_raw::<u16>()
        .map_err(|e| DecodeError::Hdf5(format!("Failed to read {}: {}", DATA_PATH, e)))?;

    let what = file
        .group(WHAT_PATH)
        .map_err(|_| DecodeError::MissingData(WHAT_PATH.to_string()))?;

    let calibration = Calibration {
        gain: get_f64_attr(&what, "gain")?.unwrap_or(1.0),
        offset: get_f64_attr(&what, "offset")?.unwrap_or(0.0),
        nodata: get_f64_attr(&what, "nodata")?,
        undetect: get_f64_attr(&what, "undetect")?,
    };

    debug!(
        path = %path.display(),
        width = width,
        height = height,
        gain = calibration.gain,
        offset = calibration.offset,
        nodata = ?calibration.nodata,
        undetect = ?calibration.undetect,
        "Decoded ODIM frame"
    );

    RadarFrame::new(width, height, raw, calibration).ok_or_else(|| {
        DecodeError::InvalidFormat(format!("grid size does not match shape {}x{}", width, height))
    })
}

fn has_attr(group: &hdf5::Group, name: &str) -> DecodeResult<bool> {
    let names = group
        .attr_names()
        .map_err(|e| DecodeError::Hdf5(format!("Failed to list attributes: {}", e)))?;
    Ok(names.iter().any(|n| n == name))
}

/// Read a numeric scalar attribute, `None` if the attribute is absent.
fn get_f64_attr(group: &hdf5::Group, name: &str) -> DecodeResult<Option<f64>> {
    if !has_attr(group, name)? {
        return Ok(None);
    }
    let value = group
        .attr(name)
        .and_then(|attr| attr.read_scalar::<f64>())
        .map_err(|e| DecodeError::InvalidFormat(format!("attribute '{}': {}", name, e)))?;
    Ok(Some(value))
}
