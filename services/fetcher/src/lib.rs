//! Radar composite harvester.
//!
//! Polls a remote directory listing for new ODIM_H5 composites, downloads
//! each file once, converts it into a transparent PNG and publishes it under
//! a name carrying the capture time and rain score.

pub mod alert;
pub mod config;
pub mod convert;
pub mod download;
pub mod error;
pub mod http;
pub mod listing;
pub mod scheduler;
pub mod state;

pub use alert::{AlertSink, LogAlerter, WebhookAlerter};
pub use config::{load_product_configs, ProductConfig};
pub use convert::{publish, Conversion, ConversionPipeline};
pub use download::{DownloadOutcome, Downloader};
pub use error::{ConvertError, FetchError, PublishError};
pub use http::{RetryPolicy, RetryingClient};
pub use listing::{extract_links, HttpListing, RemoteListing};
pub use scheduler::{FetcherContext, ProductRuntime, TickSummary};
pub use state::SeenSet;
