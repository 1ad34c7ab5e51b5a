//! Application state for the archive API.

use std::path::Path;

use tracing::{info, warn};

use crate::archive::Archive;
use crate::config::{default_product_dirs, load_product_dirs};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub archive: Archive,
}

impl AppState {
    pub fn new(archive: Archive) -> Self {
        Self { archive }
    }

    /// Build the state from product configuration, falling back to the
    /// built-in CHMI products when none is found.
    pub fn from_config(config_dir: &Path, data_dir: &Path) -> Self {
        let dirs = load_product_dirs(config_dir, data_dir).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load product configs");
            Default::default()
        });
        let dirs = if dirs.is_empty() {
            warn!("No product configurations found, using built-in CHMI products");
            default_product_dirs(data_dir)
        } else {
            dirs
        };

        for (product, dir) in &dirs {
            info!(product = %product, dir = %dir.display(), "Serving product");
        }
        Self::new(Archive::new(dirs))
    }
}
