//! Rendering of radar frames into transparent PNG images.
//!
//! - [`palette`]: legend colours and bin tables
//! - [`classify`]: frame → per-pixel classes and rain score
//! - [`emit`]: classes → PNG, direct or through a raster surface
//! - [`png`]: minimal PNG encoder (indexed and RGBA)

pub mod classify;
pub mod emit;
pub mod palette;
pub mod png;

pub use classify::{
    ClassifiedGrid, Classifier, ClassifierSpec, ClassifyError, LevelClassifier,
    RawCodeClassifier, ThresholdClassifier,
};
pub use emit::{Emitter, EmitError, RenderMode};
pub use palette::{Palette, PaletteError};
