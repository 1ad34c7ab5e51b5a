//! Radar composite fetcher.
//!
//! Harvests radar composites from the CHMI open-data mirror with:
//! - Retrying listing and download requests
//! - Download-once tracking rebuilt from the raw directories
//! - Conversion to transparent PNGs named by capture time and rain score
//! - Webhook alerts on failures

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use fetcher::alert::{alert_sink, fatal_message, AlertSink};
use fetcher::config::{self, ProductConfig};
use fetcher::{Downloader, FetcherContext, ProductRuntime, RetryPolicy, RetryingClient};

#[derive(Parser, Debug)]
#[command(name = "radar-fetcher")]
#[command(about = "Harvest radar composites and publish scored PNG images")]
struct Args {
    /// Seconds between polls; ticks are aligned to multiples of this
    #[arg(long, env = "CHECK_EVERY", default_value = "30")]
    check_every: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log file (appended); "-" logs to stdout
    #[arg(long, env = "LOG_FILE", default_value = "radar_data_realtime.log")]
    log_file: String,

    /// Configuration directory (contains products/*.yaml)
    #[arg(long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Root for the raw and output directories
    #[arg(long, env = "DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Chat webhook receiving alerts
    #[arg(long, env = "DISCORD_WEBHOOK_URL")]
    webhook_url: Option<String>,

    /// Run a single tick and exit
    #[arg(long)]
    once: bool,

    /// Only process this product
    #[arg(short, long)]
    product: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    info!(
        check_every = args.check_every,
        data_dir = %args.data_dir.display(),
        "Starting radar fetcher"
    );

    let client =
        RetryingClient::new(RetryPolicy::default()).context("Failed to create HTTP client")?;
    let alerts = alert_sink(client.inner().clone(), args.webhook_url.clone());

    match run(&args, client, alerts.clone()).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %format!("{:#}", e), "FATAL error, stopping");
            alerts.notify(&fatal_message(&format!("{:#}", e))).await;
            Err(e)
        }
    }
}

async fn run(args: &Args, client: RetryingClient, alerts: Arc<dyn AlertSink>) -> Result<()> {
    let configs = select_products(load_configs(args)?, args.product.as_deref())?;

    let products = configs
        .iter()
        .map(|config| ProductRuntime::from_config(config, &args.data_dir, &client))
        .collect::<Result<Vec<_>>>()?;

    let interval = Duration::from_secs(args.check_every.max(1));
    let mut context = FetcherContext::new(products, Downloader::new(client), alerts, interval);

    if args.once {
        info!("Running single acquisition tick");
        let summary = context.run_tick().await?;
        info!(
            listed = summary.listed,
            downloaded = summary.downloaded,
            converted = summary.converted,
            failed = summary.failed,
            "Single tick complete"
        );
        return Ok(());
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let shutdown_rx = shutdown_tx.subscribe();

    // Handle Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx.send(()).ok();
    });

    context.run_forever(shutdown_rx).await
}

fn load_configs(args: &Args) -> Result<Vec<ProductConfig>> {
    let configs = config::load_product_configs(&args.config_dir).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load product configs");
        Vec::new()
    });
    if configs.is_empty() {
        warn!("No product configurations found, using built-in CHMI products");
        return Ok(config::default_configs());
    }
    Ok(configs)
}

fn select_products(configs: Vec<ProductConfig>, only: Option<&str>) -> Result<Vec<ProductConfig>> {
    let Some(only) = only else {
        return Ok(configs);
    };
    let selected: Vec<_> = configs
        .into_iter()
        .filter(|c| c.id().as_str() == only)
        .collect();
    anyhow::ensure!(!selected.is_empty(), "Unknown product: {}", only);
    Ok(selected)
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.log_file == "-" {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.log_file)
            .with_context(|| format!("Failed to open log file {}", args.log_file))?;
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .json()
            .init();
    }

    Ok(())
}
