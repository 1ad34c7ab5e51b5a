//! Product directory configuration for the archive.
//!
//! Reads the same `products/*.yaml` files as the fetcher but only keeps
//! what the archive needs: the product id and its output directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use radar_common::ProductId;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveProductConfig {
    pub product: ProductSection,
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductSection {
    pub id: ProductId,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    pub output_dir: PathBuf,
}

fn default_enabled() -> bool {
    true
}

impl ArchiveProductConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Map every enabled product in `config_dir/products` to its output directory,
/// resolved against `data_dir`.
///
/// Unreadable files are logged and skipped.
pub fn load_product_dirs(
    config_dir: &Path,
    data_dir: &Path,
) -> Result<BTreeMap<ProductId, PathBuf>> {
    let products_dir = config_dir.join("products");
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&products_dir)
        .with_context(|| format!("Failed to read {}", products_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("yaml" | "yml")))
        .collect();
    paths.sort();

    let mut dirs = BTreeMap::new();
    for path in paths {
        match ArchiveProductConfig::load(&path) {
            Ok(config) if config.product.enabled => {
                debug!(product = %config.product.id, "Loaded product");
                dirs.insert(config.product.id, data_dir.join(config.storage.output_dir));
            }
            Ok(config) => debug!(product = %config.product.id, "Product disabled, skipping"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to load product config"),
        }
    }
    Ok(dirs)
}

/// Output directories of the built-in CHMI products.
pub fn default_product_dirs(data_dir: &Path) -> BTreeMap<ProductId, PathBuf> {
    [ProductId::PSEUDOCAPPI2KM, ProductId::MAXZ, ProductId::MERGE1H]
        .into_iter()
        .filter_map(|id| {
            let product: ProductId = id.parse().ok()?;
            Some((product, data_dir.join(format!("{}_png", id))))
        })
        .collect()
}
