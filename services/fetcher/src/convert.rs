//! Conversion of downloaded frames into published images.
//!
//! decode → classify → render → temporary file → rename to the scored name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use radar_common::artifact::{scored_file_name, source_stem, stem_capture_time};
use renderer::emit::write_temporary;
use renderer::png::with_text_chunk;
use renderer::{Classifier, EmitError, Emitter};
use tracing::{debug, info, instrument};

use crate::error::{ConvertError, PublishError};

/// `tEXt` keyword carrying the capture time of a frame.
pub const CAPTURE_TIME_KEYWORD: &str = "Capture-Time";

/// A rendered image waiting under its temporary name.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub stem: String,
    pub temp_path: PathBuf,
    pub rain_score: f64,
    pub width: usize,
    pub height: usize,
}

/// Per-product conversion chain.
pub struct ConversionPipeline {
    classifier: Box<dyn Classifier>,
    emitter: Emitter,
}

impl ConversionPipeline {
    pub fn new(classifier: Box<dyn Classifier>, emitter: Emitter) -> Self {
        Self {
            classifier,
            emitter,
        }
    }

    /// Convert `raw_path` into a temporary image inside `output_dir`.
    #[instrument(skip(self, output_dir), fields(raw = %raw_path.display()))]
    pub fn convert(&self, raw_path: &Path, output_dir: &Path) -> Result<Conversion, ConvertError> {
        let frame = odim_parser::read_frame(raw_path)?;
        let grid = self.classifier.classify(&frame)?;
        let rain_score = grid.rain_score();

        let name = raw_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let stem = source_stem(name).to_string();

        let mut png = self.emitter.render(&grid)?;
        if let Some(captured) = stem_capture_time(&stem) {
            png = with_text_chunk(png, CAPTURE_TIME_KEYWORD, &captured.to_rfc3339())
                .map_err(EmitError::from)?;
        }

        let temp_path = write_temporary(output_dir, &stem, &png)?;
        debug!(
            temp = %temp_path.display(),
            rain_score,
            bytes = png.len(),
            "Rendered frame"
        );

        Ok(Conversion {
            stem,
            temp_path,
            rain_score,
            width: frame.width,
            height: frame.height,
        })
    }

    /// [`convert`](Self::convert) on the blocking thread pool.
    ///
    /// A panicking or cancelled worker is reported as [`ConvertError::Worker`].
    pub async fn convert_blocking(
        self: Arc<Self>,
        raw_path: PathBuf,
        output_dir: PathBuf,
    ) -> Result<Conversion, ConvertError> {
        tokio::task::spawn_blocking(move || self.convert(&raw_path, &output_dir))
            .await
            .map_err(|e| ConvertError::Worker(e.to_string()))?
    }
}

/// Rename a finished conversion to `<stem>_<score:.3>.png`.
///
/// Fails if the destination already exists; the temporary file is then left
/// in place.
pub fn publish(conversion: &Conversion, output_dir: &Path) -> Result<PathBuf, PublishError> {
    let destination = output_dir.join(scored_file_name(&conversion.stem, conversion.rain_score));
    if destination.exists() {
        return Err(PublishError::DestinationExists(destination));
    }

    std::fs::rename(&conversion.temp_path, &destination).map_err(|source| PublishError::Rename {
        from: conversion.temp_path.clone(),
        to: destination.clone(),
        source,
    })?;

    info!(
        path = %destination.display(),
        rain_score = conversion.rain_score,
        "Published image"
    );
    Ok(destination)
}
