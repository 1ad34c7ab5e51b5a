//! Configuration loading for radar products.
//!
//! Loads product configurations from YAML files in config/products/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use radar_common::ProductId;
use renderer::classify::{ClassifierSpec, DEFAULT_RAW_MIN, DEFAULT_RAW_STEP};
use renderer::palette::{Palette, CHMI_COLORS, CHMI_DBZ_THRESHOLDS, PRECIP_LEVELS_MM};
use renderer::RenderMode;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Base URL of the CHMI radar composite mirror.
pub const CHMI_COMPOSITE_URL: &str =
    "https://opendata.chmi.cz/meteorology/weather/radar/composite";

/// Root configuration loaded from a product YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductConfig {
    pub product: ProductInfo,
    pub source: SourceConfig,
    pub storage: StorageConfig,
    /// `#RRGGBB` legend colours; the CHMI legend when omitted.
    #[serde(default)]
    pub palette: Option<Vec<String>>,
    pub classifier: ClassifierSpec,
    #[serde(default)]
    pub render: RenderMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInfo {
    pub id: ProductId,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Where the listing lives and which links count as source files.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    ".hdf".to_string()
}

/// Raw and output directories, relative to the data directory unless absolute.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub raw_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ProductConfig {
    /// Load a product configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ProductConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(product = %config.product.id, path = %path.display(), "Loaded product config");
        Ok(config)
    }

    pub fn id(&self) -> &ProductId {
        &self.product.id
    }

    pub fn palette(&self) -> Result<Palette> {
        match &self.palette {
            Some(colors) => Palette::from_hex(colors.as_slice())
                .with_context(|| format!("Invalid palette for product {}", self.product.id)),
            None => Ok(Palette::chmi()),
        }
    }

    pub fn raw_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.storage.raw_dir)
    }

    pub fn output_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.storage.output_dir)
    }
}

/// Load all enabled product configurations from `config_dir/products`.
pub fn load_product_configs(config_dir: &Path) -> Result<Vec<ProductConfig>> {
    let products_dir = config_dir.join("products");

    if !products_dir.exists() {
        warn!(path = %products_dir.display(), "Products config directory not found");
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(&products_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "yaml" || ext == "yml"))
        .collect();
    paths.sort();

    let mut configs = Vec::new();
    for path in paths {
        match ProductConfig::load(&path) {
            Ok(config) => {
                if config.product.enabled {
                    info!(
                        product = %config.product.id,
                        name = %config.product.name,
                        "Loaded product configuration"
                    );
                    configs.push(config);
                } else {
                    debug!(product = %config.product.id, "Skipping disabled product");
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load product config");
            }
        }
    }

    info!(count = configs.len(), "Loaded product configurations");
    Ok(configs)
}

/// Built-in CHMI products, used when no YAML files are available.
pub fn default_configs() -> Vec<ProductConfig> {
    let product = |id: &str, name: &str, classifier: ClassifierSpec| -> Option<ProductConfig> {
        Some(ProductConfig {
            product: ProductInfo {
                id: id.parse().ok()?,
                name: name.to_string(),
                enabled: true,
            },
            source: SourceConfig {
                base_url: format!("{}/{}/hdf5/", CHMI_COMPOSITE_URL, id),
                extension: default_extension(),
            },
            storage: StorageConfig {
                raw_dir: PathBuf::from(id),
                output_dir: PathBuf::from(format!("{}_png", id)),
            },
            palette: Some(CHMI_COLORS.iter().map(|c| c.to_string()).collect()),
            classifier,
            render: RenderMode::Direct,
        })
    };

    [
        product(
            ProductId::PSEUDOCAPPI2KM,
            "Pseudo-CAPPI 2 km reflectivity",
            ClassifierSpec::Thresholds {
                thresholds: CHMI_DBZ_THRESHOLDS.to_vec(),
                raw_visible_min: Some(78),
            },
        ),
        product(
            ProductId::MAXZ,
            "Maximum reflectivity (MaxZ)",
            ClassifierSpec::RawCode {
                raw_min: DEFAULT_RAW_MIN,
                raw_step: DEFAULT_RAW_STEP,
                bins: Some(CHMI_COLORS.len()),
            },
        ),
        product(
            ProductId::MERGE1H,
            "One-hour precipitation accumulation",
            ClassifierSpec::Levels {
                levels: PRECIP_LEVELS_MM.to_vec(),
            },
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product_config() {
        let yaml = r#"
product:
  id: maxz
  name: "Maximum reflectivity (MaxZ)"

source:
  base_url: https://opendata.chmi.cz/meteorology/weather/radar/composite/maxz/hdf5/

storage:
  raw_dir: maxz
  output_dir: maxz_png

classifier:
  type: raw_code
  raw_min: 73
  raw_step: 8

render:
  mode: plot
  dpi: 100
"#;

        let config: ProductConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.id().as_str(), "maxz");
        assert!(config.product.enabled);
        assert_eq!(config.source.extension, ".hdf");
        assert_eq!(config.render, RenderMode::Plot { dpi: 100 });
        assert_eq!(
            config.raw_dir(Path::new("/data")),
            PathBuf::from("/data/maxz")
        );
        assert_eq!(config.palette().unwrap(), Palette::chmi());
        assert!(config.classifier.build(&Palette::chmi()).is_ok());
    }

    #[test]
    fn test_rejects_bad_product_id() {
        let yaml = r#"
product: { id: "../etc", name: x }
source: { base_url: "http://h/" }
storage: { raw_dir: a, output_dir: b }
classifier: { type: levels }
"#;
        assert!(serde_yaml::from_str::<ProductConfig>(yaml).is_err());
    }

    #[test]
    fn test_default_configs_build() {
        let configs = default_configs();
        let ids: Vec<&str> = configs.iter().map(|c| c.id().as_str()).collect();
        assert_eq!(ids, vec!["pseudocappi2km", "maxz", "merge1h"]);

        for config in &configs {
            let palette = config.palette().unwrap();
            assert!(config.classifier.build(&palette).is_ok());
        }
        assert_eq!(
            configs[1].source.base_url,
            "https://opendata.chmi.cz/meteorology/weather/radar/composite/maxz/hdf5/"
        );
        assert_eq!(configs[2].storage.output_dir, PathBuf::from("merge1h_png"));
    }

    #[test]
    fn test_load_product_configs_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let products = dir.path().join("products");
        std::fs::create_dir(&products).unwrap();
        std::fs::write(
            products.join("merge1h.yaml"),
            "product: { id: merge1h, name: Merge, enabled: false }\n\
             source: { base_url: \"http://h/\" }\n\
             storage: { raw_dir: m, output_dir: m_png }\n\
             classifier: { type: levels }\n",
        )
        .unwrap();
        std::fs::write(
            products.join("maxz.yaml"),
            "product: { id: maxz, name: MaxZ }\n\
             source: { base_url: \"http://h/\" }\n\
             storage: { raw_dir: x, output_dir: x_png }\n\
             classifier: { type: raw_code }\n",
        )
        .unwrap();
        std::fs::write(products.join("broken.yaml"), "product: [").unwrap();

        let configs = load_product_configs(dir.path()).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].id().as_str(), "maxz");
    }

    #[test]
    fn test_shipped_configs_match_defaults() {
        let config_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config");
        let shipped = load_product_configs(&config_dir).unwrap();
        assert_eq!(shipped.len(), 3);

        for default in default_configs() {
            let config = shipped
                .iter()
                .find(|c| c.id() == default.id())
                .expect("shipped config for every built-in product");
            assert_eq!(config.source.base_url, default.source.base_url);
            assert_eq!(config.classifier, default.classifier);
            assert_eq!(config.palette().unwrap(), default.palette().unwrap());
        }
    }
}
