//! ODIM_H5 fixture files for decoder and pipeline tests.
//!
//! Fixtures are written with the same layout as CHMI composites:
//! `dataset1/data1/data` holds an 8-bit grid and `dataset1/data1/what`
//! carries the calibration attributes.

use std::path::{Path, PathBuf};

/// Calibration of CHMI reflectivity composites: dBZ = raw * 0.5 - 32.
pub mod chmi {
    pub const GAIN: f64 = 0.5;
    pub const OFFSET: f64 = -32.0;
    pub const NODATA: f64 = 255.0;
    pub const UNDETECT: f64 = 0.0;
}

/// Description of an ODIM_H5 file to write.
#[derive(Debug, Clone)]
pub struct OdimFixture {
    pub width: usize,
    pub height: usize,
    /// Row-major raw codes, `width * height` values
    pub data: Vec<u8>,
    pub gain: Option<f64>,
    pub offset: Option<f64>,
    pub nodata: Option<f64>,
    pub undetect: Option<f64>,
}

impl OdimFixture {
    /// A reflectivity fixture with full CHMI calibration.
    pub fn reflectivity(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            gain: Some(chmi::GAIN),
            offset: Some(chmi::OFFSET),
            nodata: Some(chmi::NODATA),
            undetect: Some(chmi::UNDETECT),
        }
    }

    /// A fixture without any calibration attributes.
    pub fn uncalibrated(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            gain: None,
            offset: None,
            nodata: None,
            undetect: None,
        }
    }

    /// Write the fixture to `path`.
    pub fn write(&self, path: &Path) -> hdf5::Result<()> {
        assert_eq!(
            self.data.len(),
            self.width * self.height,
            "fixture data does not match its shape"
        );

        let file = hdf5::File::create(path)?;
        let data1 = file.create_group("dataset1")?.create_group("data1")?;

        let dataset = data1
            .new_dataset::<u8>()
            .shape((self.height, self.width))
            .create("data")?;
        dataset.write_raw(self.data.as_slice())?;

        let what = data1.create_group("what")?;
        let attrs = [
            ("gain", self.gain),
            ("offset", self.offset),
            ("nodata", self.nodata),
            ("undetect", self.undetect),
        ];
        for (name, value) in attrs {
            if let Some(value) = value {
                what.new_attr::<f64>()
                    .shape(())
                    .create(name)?
                    .write_scalar(&value)?;
            }
        }

        Ok(())
    }

    /// Write the fixture as `name` inside `dir`, returning the full path.
    pub fn write_to(&self, dir: &Path, name: &str) -> hdf5::Result<PathBuf> {
        let path = dir.join(name);
        self.write(&path)?;
        Ok(path)
    }
}

/// Write an HDF5 file that has no `dataset1` group at all.
pub fn write_empty_container(path: &Path) -> hdf5::Result<()> {
    let file = hdf5::File::create(path)?;
    file.create_group("how")?;
    Ok(())
}

/// Create a scratch directory removed on drop.
pub fn scratch_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}
