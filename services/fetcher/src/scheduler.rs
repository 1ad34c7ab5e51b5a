//! The acquisition loop.
//!
//! Each tick walks every product through listing, download, conversion and
//! publishing, one file at a time, then sleeps until the next wall-clock
//! multiple of the polling interval.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use radar_common::ProductId;
use renderer::Emitter;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::alert::AlertSink;
use crate::config::ProductConfig;
use crate::convert::{publish, ConversionPipeline};
use crate::download::{DownloadOutcome, Downloader};
use crate::http::RetryingClient;
use crate::listing::{file_name_from_url, HttpListing, RemoteListing};
use crate::state::SeenSet;

/// Default polling interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Everything needed to process one product.
pub struct ProductRuntime {
    pub id: ProductId,
    pub base_url: String,
    pub raw_dir: PathBuf,
    pub output_dir: PathBuf,
    pub listing: Arc<dyn RemoteListing>,
    pub pipeline: Arc<ConversionPipeline>,
    pub seen: SeenSet,
}

impl ProductRuntime {
    /// Build the runtime for `config`, scanning its raw directory.
    pub fn from_config(
        config: &ProductConfig,
        data_dir: &Path,
        client: &RetryingClient,
    ) -> Result<Self> {
        let palette = config.palette()?;
        let classifier = config
            .classifier
            .build(&palette)
            .with_context(|| format!("Invalid classifier for product {}", config.id()))?;
        let emitter = Emitter::new(palette, config.render)
            .with_context(|| format!("Invalid render settings for product {}", config.id()))?;

        let raw_dir = config.raw_dir(data_dir);
        let seen = SeenSet::scan(&raw_dir)
            .with_context(|| format!("Failed to scan {}", raw_dir.display()))?;
        info!(product = %config.id(), seen = seen.len(), "Product ready");

        Ok(Self {
            id: config.id().clone(),
            base_url: config.source.base_url.clone(),
            raw_dir,
            output_dir: config.output_dir(data_dir),
            listing: Arc::new(HttpListing::new(client.clone(), config.source.extension.clone())),
            pipeline: Arc::new(ConversionPipeline::new(classifier, emitter)),
            seen,
        })
    }
}

/// Counters for one product in one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub listed: usize,
    pub skipped: usize,
    pub downloaded: usize,
    pub converted: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for TickSummary {
    fn add_assign(&mut self, other: Self) {
        self.listed += other.listed;
        self.skipped += other.skipped;
        self.downloaded += other.downloaded;
        self.converted += other.converted;
        self.failed += other.failed;
    }
}

/// State of the acquisition loop, built once at start-up.
pub struct FetcherContext {
    products: Vec<ProductRuntime>,
    downloader: Downloader,
    alerts: Arc<dyn AlertSink>,
    interval: Duration,
}

impl FetcherContext {
    pub fn new(
        products: Vec<ProductRuntime>,
        downloader: Downloader,
        alerts: Arc<dyn AlertSink>,
        interval: Duration,
    ) -> Self {
        Self {
            products,
            downloader,
            alerts,
            interval,
        }
    }

    pub fn products(&self) -> &[ProductRuntime] {
        &self.products
    }

    /// Run one pass over all products.
    ///
    /// Per-file failures are alerted and counted; only failures that leave
    /// the loop unable to continue are returned.
    pub async fn run_tick(&mut self) -> Result<TickSummary> {
        let mut total = TickSummary::default();

        for index in 0..self.products.len() {
            let summary = self.run_product(index).await?;
            info!(
                product = %self.products[index].id,
                listed = summary.listed,
                skipped = summary.skipped,
                downloaded = summary.downloaded,
                converted = summary.converted,
                failed = summary.failed,
                "Product cycle complete"
            );
            total += summary;
        }

        Ok(total)
    }

    async fn run_product(&mut self, index: usize) -> Result<TickSummary> {
        let product = &mut self.products[index];
        let mut summary = TickSummary::default();

        for dir in [&product.raw_dir, &product.output_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        let urls = match product.listing.list_available(&product.base_url).await {
            Ok(urls) => urls,
            Err(e) => {
                error!(product = %product.id, error = %e, "Listing failed");
                self.alerts
                    .notify(&format!("Failed to list {} files: {}", product.id, e))
                    .await;
                return Ok(summary);
            }
        };
        summary.listed = urls.len();

        for url in urls {
            let Some(name) = file_name_from_url(&url).map(str::to_string) else {
                warn!(url = %url, "Listing entry has no file name");
                summary.skipped += 1;
                continue;
            };
            if product.seen.contains(&name) {
                debug!(file = %name, "Already downloaded, skipping");
                summary.skipped += 1;
                continue;
            }

            let raw_path = match self.downloader.download(&url, &product.raw_dir, &name).await {
                Ok(DownloadOutcome::Downloaded { path, .. }) => {
                    summary.downloaded += 1;
                    path
                }
                Ok(DownloadOutcome::AlreadyPresent(_)) => {
                    product.seen.insert(name);
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(product = %product.id, url = %url, error = %e, "Download failed");
                    self.alerts
                        .notify(&format!("Failed to download {}: {}", url, e))
                        .await;
                    summary.failed += 1;
                    continue;
                }
            };
            product.seen.insert(name.clone());

            let conversion = match product
                .pipeline
                .clone()
                .convert_blocking(raw_path, product.output_dir.clone())
                .await
            {
                Ok(conversion) => conversion,
                Err(e) => {
                    error!(product = %product.id, file = %name, error = %e, "Conversion failed");
                    self.alerts
                        .notify(&format!("Failed to convert {}: {}", name, e))
                        .await;
                    summary.failed += 1;
                    continue;
                }
            };

            match publish(&conversion, &product.output_dir) {
                Ok(_) => summary.converted += 1,
                Err(e) => {
                    error!(product = %product.id, file = %name, error = %e, "Publish failed");
                    self.alerts
                        .notify(&format!("Failed to publish {}: {}", name, e))
                        .await;
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Run ticks until a shutdown signal arrives between ticks.
    pub async fn run_forever(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        loop {
            let summary = self.run_tick().await?;
            let wait = until_next_boundary(Utc::now(), self.interval);
            info!(
                listed = summary.listed,
                converted = summary.converted,
                failed = summary.failed,
                sleep_ms = wait.as_millis() as u64,
                "Tick complete"
            );

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down acquisition loop");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        Ok(())
    }
}

/// First multiple of `interval` since the epoch strictly after `now`.
pub fn next_boundary(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let step = (interval.as_millis() as i64).max(1);
    let next = (now.timestamp_millis().div_euclid(step) + 1) * step;
    Utc.timestamp_millis_opt(next).single().unwrap_or(now)
}

/// Time from `now` to [`next_boundary`].
pub fn until_next_boundary(now: DateTime<Utc>, interval: Duration) -> Duration {
    (next_boundary(now, interval) - now)
        .to_std()
        .unwrap_or(interval)
}
