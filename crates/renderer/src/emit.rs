//! Turning classified grids into transparent PNG images.
//!
//! [`RenderMode::Direct`] writes classes straight into an indexed PNG.
//! [`RenderMode::Plot`] draws them onto a raster surface first, which allows
//! scaling; at [`BASE_DPI`] both paths decode to the same pixels.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use radar_common::artifact::temporary_file_name;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiny_skia::{Paint, Pixmap, Rect, Transform};
use tracing::debug;

use crate::classify::ClassifiedGrid;
use crate::palette::Palette;
use crate::png::{self, PngError, Rgba};

/// Resolution at which one grid cell becomes one output pixel.
pub const BASE_DPI: u32 = 100;

/// Highest accepted plot resolution.
pub const MAX_DPI: u32 = 1600;

const TRANSPARENT_RGBA: Rgba = (0, 0, 0, 0);

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] PngError),

    #[error("Plot resolution must be within 1..={max} dpi, got {dpi}")]
    InvalidDpi { dpi: u32, max: u32 },

    #[error("Class {class} has no colour in a {palette}-entry palette")]
    ClassOutOfRange { class: i16, palette: usize },

    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// How classified grids are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenderMode {
    Direct,
    Plot {
        #[serde(default = "default_dpi")]
        dpi: u32,
    },
}

impl Default for RenderMode {
    fn default() -> Self {
        RenderMode::Direct
    }
}

fn default_dpi() -> u32 {
    BASE_DPI
}

/// Renders classified grids with a fixed palette.
#[derive(Debug, Clone)]
pub struct Emitter {
    palette: Palette,
    mode: RenderMode,
}

impl Emitter {
    pub fn new(palette: Palette, mode: RenderMode) -> Result<Self, EmitError> {
        if let RenderMode::Plot { dpi } = mode {
            if dpi == 0 || dpi > MAX_DPI {
                return Err(EmitError::InvalidDpi { dpi, max: MAX_DPI });
            }
        }
        Ok(Self { palette, mode })
    }

    /// Render `grid` to PNG bytes.
    pub fn render(&self, grid: &ClassifiedGrid) -> Result<Vec<u8>, EmitError> {
        check_classes(grid, &self.palette)?;
        match self.mode {
            RenderMode::Direct => self.render_direct(grid),
            RenderMode::Plot { dpi } => self.render_plot(grid, dpi),
        }
    }

    /// Indexed PNG: entry 0 is transparent, class `c` uses entry `c + 1`.
    fn render_direct(&self, grid: &ClassifiedGrid) -> Result<Vec<u8>, EmitError> {
        let mut palette = Vec::with_capacity(self.palette.len() + 1);
        palette.push(TRANSPARENT_RGBA);
        palette.extend(self.palette.colors().iter().map(|&(r, g, b)| (r, g, b, 255)));

        let indices: Vec<u8> = grid.classes().iter().map(|&c| (c + 1) as u8).collect();
        Ok(png::encode_indexed(
            grid.width(),
            grid.height(),
            &palette,
            &indices,
        )?)
    }

    fn render_plot(&self, grid: &ClassifiedGrid, dpi: u32) -> Result<Vec<u8>, EmitError> {
        let scale = dpi as f32 / BASE_DPI as f32;
        let width = ((grid.width() as f32 * scale).round() as u32).max(1);
        let height = ((grid.height() as f32 * scale).round() as u32).max(1);
        let mut pixmap =
            Pixmap::new(width, height).ok_or(EmitError::InvalidDpi { dpi, max: MAX_DPI })?;

        let mut paint = Paint::default();
        paint.anti_alias = false;

        let mut runs = 0usize;
        for (y, row) in grid.classes().chunks_exact(grid.width()).enumerate() {
            let mut x = 0;
            while x < row.len() {
                let class = row[x];
                let start = x;
                while x < row.len() && row[x] == class {
                    x += 1;
                }
                let Some((r, g, b)) = self.palette.color(class) else {
                    continue;
                };
                let rect = Rect::from_xywh(
                    start as f32 * scale,
                    y as f32 * scale,
                    (x - start) as f32 * scale,
                    scale,
                );
                if let Some(rect) = rect {
                    paint.set_color_rgba8(r, g, b, 255);
                    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
                    runs += 1;
                }
            }
        }
        debug!(width, height, dpi, runs, "Rasterized plot surface");

        let rgba: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        Ok(png::encode_auto(&rgba, width as usize, height as usize)?)
    }
}

fn check_classes(grid: &ClassifiedGrid, palette: &Palette) -> Result<(), EmitError> {
    let limit = palette.len() as i16;
    match grid.classes().iter().find(|&&c| c < -1 || c >= limit) {
        Some(&class) => Err(EmitError::ClassOutOfRange {
            class,
            palette: palette.len(),
        }),
        None => Ok(()),
    }
}

/// RGBA bytes of a grid as the emitter colours it, row-major.
pub fn rgba_pixels(grid: &ClassifiedGrid, palette: &Palette) -> Vec<u8> {
    grid.classes()
        .iter()
        .flat_map(|&c| match palette.color(c) {
            Some((r, g, b)) => [r, g, b, 255],
            None => [0, 0, 0, 0],
        })
        .collect()
}

/// Write `bytes` to the hidden temporary name for `stem` inside `dir`.
///
/// The file is flushed and synced before returning so that a later rename
/// publishes complete content.
pub fn write_temporary(dir: &Path, stem: &str, bytes: &[u8]) -> Result<PathBuf, EmitError> {
    let path = dir.join(temporary_file_name(stem));
    let mut file = File::create(&path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(path)
}
