//! ODIM_H5 reader for radar composites.
//!
//! Decodes the first quantity of an ODIM_H5 container into a
//! [`RadarFrame`]: the raw integer grid plus its `gain`/`offset` calibration
//! and the optional `nodata`/`undetect` marker codes.
//!
//! Absent `nodata`/`undetect` attributes mean "no such marker"; absent
//! `gain`/`offset` default to `1.0`/`0.0`. An unreadable container or a
//! missing `dataset1/data1` layout is a [`DecodeError`].

pub mod error;
pub mod native;

use std::path::Path;

pub use error::{DecodeError, DecodeResult};
pub use native::{silence_hdf5_errors, DATA_PATH, WHAT_PATH};
pub use radar_common::{Calibration, RadarFrame};

/// Read a radar frame from an ODIM_H5 file.
pub fn read_frame<P: AsRef<Path>>(path: P) -> DecodeResult<RadarFrame> {
    native::load_odim_frame(path.as_ref())
}
