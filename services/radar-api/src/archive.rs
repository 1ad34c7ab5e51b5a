//! Time-range queries over published images.
//!
//! The archive is the output directories themselves: each published file
//! name carries its capture time and, for current names, its rain score.
//! Nothing is indexed; every listing reads the directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use radar_common::artifact::is_temporary;
use radar_common::{ArtifactName, ProductId, RadarError, RadarResult, TimeRange};
use serde::{Serialize, Serializer};
use tracing::{debug, instrument};

/// One published image in a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveEntry {
    #[serde(serialize_with = "serialize_rfc3339")]
    pub timestamp: DateTime<Utc>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_score: Option<f64>,
}

fn serialize_rfc3339<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&time.to_rfc3339())
}

/// Download route of an artifact.
pub fn artifact_url(product: &ProductId, file_name: &str) -> String {
    format!("/api/{}/{}", product, file_name)
}

/// Output directories by product.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    products: BTreeMap<ProductId, PathBuf>,
}

impl Archive {
    pub fn new(products: BTreeMap<ProductId, PathBuf>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> impl Iterator<Item = &ProductId> {
        self.products.keys()
    }

    fn output_dir(&self, product: &str) -> RadarResult<(ProductId, &Path)> {
        let id: ProductId = product.parse()?;
        match self.products.get_key_value(&id) {
            Some((id, dir)) => Ok((id.clone(), dir.as_path())),
            None => Err(RadarError::ProductNotFound(product.to_string())),
        }
    }

    /// Artifacts of `product` captured within `range`, oldest first.
    ///
    /// Names that follow neither artifact layout are skipped. A product whose
    /// output directory does not exist yet has an empty archive.
    #[instrument(skip(self))]
    pub async fn list(&self, product: &str, range: &TimeRange) -> RadarResult<Vec<ArchiveEntry>> {
        let (id, dir) = self.output_dir(product)?;

        let mut read_dir = match tokio::fs::read_dir(dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Output directory missing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_temporary(&name) {
                continue;
            }
            let Some(parsed) = ArtifactName::parse(&name) else {
                debug!(file = %name, "Skipping unrecognised file");
                continue;
            };
            if !range.contains(&parsed.timestamp) {
                continue;
            }
            entries.push(ArchiveEntry {
                timestamp: parsed.timestamp,
                url: artifact_url(&id, &name),
                rain_score: parsed.rain_score,
            });
        }

        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.url.cmp(&b.url)));
        Ok(entries)
    }

    /// Bytes of one artifact of `product`.
    ///
    /// Names that could escape the output directory, or that refer to hidden
    /// files, are reported as not found.
    #[instrument(skip(self))]
    pub async fn fetch(&self, product: &str, file_name: &str) -> RadarResult<Vec<u8>> {
        let (_, dir) = self.output_dir(product)?;
        if !is_plain_file_name(file_name) {
            return Err(RadarError::NotFound(file_name.to_string()));
        }

        match tokio::fs::read(dir.join(file_name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RadarError::NotFound(file_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn archive_with(files: &[&str]) -> (tempfile::TempDir, Archive) {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("maxz_png");
        std::fs::create_dir_all(&out).unwrap();
        for name in files {
            std::fs::write(out.join(name), b"png").unwrap();
        }
        let products = BTreeMap::from([("maxz".parse().unwrap(), out)]);
        (dir, Archive::new(products))
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("T_PABV23_C_OKPR_20240601120000_0.500.png"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("../secret.png"));
        assert!(!is_plain_file_name("a/b.png"));
        assert!(!is_plain_file_name("a\\b.png"));
        assert!(!is_plain_file_name(".T_PABV23_C_OKPR_20240601120000.png.tmp"));
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let (_dir, archive) = archive_with(&[
            "T_PABV23_C_OKPR_20240601121000_0.250.png",
            "T_PABV23_C_OKPR_20240601120000_0.500.png",
            "T_PABV23_C_OKPR_20240601120500.png",
            "T_PABV23_C_OKPR_20240601130000_0.100.png",
            ".T_PABV23_C_OKPR_20240601121500.png.tmp",
            "README.txt",
        ]);

        let entries = archive
            .list("maxz", &TimeRange::new(at(12, 0), at(12, 30)))
            .await
            .unwrap();

        let times: Vec<_> = entries.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![at(12, 0), at(12, 5), at(12, 10)]);
        assert_eq!(entries[0].rain_score, Some(0.5));
        assert_eq!(entries[1].rain_score, None);
        assert_eq!(
            entries[0].url,
            "/api/maxz/T_PABV23_C_OKPR_20240601120000_0.500.png"
        );
    }

    #[tokio::test]
    async fn test_list_single_instant() {
        let (_dir, archive) = archive_with(&[
            "T_PABV23_C_OKPR_20240601120000_0.500.png",
            "T_PABV23_C_OKPR_20240601120500_0.000.png",
        ]);
        let entries = archive
            .list("maxz", &TimeRange::new(at(12, 0), at(12, 0)))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].timestamp, at(12, 0));
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(BTreeMap::from([(
            "maxz".parse().unwrap(),
            dir.path().join("absent"),
        )]));
        let entries = archive
            .list("maxz", &TimeRange::new(at(0, 0), at(23, 0)))
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (_dir, archive) = archive_with(&[]);
        let range = TimeRange::new(at(0, 0), at(23, 0));
        assert!(matches!(
            archive.list("merge1h", &range).await,
            Err(RadarError::ProductNotFound(_))
        ));
        assert!(matches!(
            archive.list("Not A Product", &range).await,
            Err(RadarError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch() {
        let name = "T_PABV23_C_OKPR_20240601120000_0.500.png";
        let (_dir, archive) = archive_with(&[name]);
        assert_eq!(archive.fetch("maxz", name).await.unwrap(), b"png");
        assert!(matches!(
            archive.fetch("maxz", "T_PABV23_C_OKPR_20240601120500_0.500.png").await,
            Err(RadarError::NotFound(_))
        ));
        assert!(matches!(
            archive.fetch("maxz", "../maxz_png/x.png").await,
            Err(RadarError::NotFound(_))
        ));
    }

    #[test]
    fn test_entry_json() {
        let entry = ArchiveEntry {
            timestamp: at(12, 0),
            url: "/api/maxz/x.png".into(),
            rain_score: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["timestamp"], "2024-06-01T12:00:00+00:00");
        assert!(json.get("rain_score").is_none());
    }
}
