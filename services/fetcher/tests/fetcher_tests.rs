//! Integration tests for the acquisition pipeline against a local mirror.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use fetcher::{
    publish, AlertSink, Conversion, Downloader, DownloadOutcome, FetchError, FetcherContext,
    HttpListing, ProductConfig, ProductRuntime, PublishError, RemoteListing, RetryPolicy,
    RetryingClient, SeenSet,
};
use radar_common::artifact::temporary_file_name;
use radar_common::ArtifactName;
use test_utils::{constant_grid, scratch_dir, source_name, OdimFixture};

// ============================================================================
// Helpers
// ============================================================================

fn fast_client() -> RetryingClient {
    RetryingClient::new(RetryPolicy {
        max_retries: 5,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    })
    .unwrap()
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[derive(Default)]
struct RecordingAlerts(Mutex<Vec<String>>);

impl RecordingAlerts {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn notify(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

/// A fake open-data mirror serving the files of one directory.
#[derive(Clone)]
struct Mirror {
    dir: PathBuf,
    downloads: Arc<AtomicUsize>,
}

async fn mirror_listing(State(mirror): State<Mirror>) -> String {
    let mut names: Vec<String> = std::fs::read_dir(&mirror.dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let mut body = String::from("<html><body><pre>\n<a href=\"../\">../</a>\n");
    for name in names {
        body.push_str(&format!(
            "<a href=\"{0}\">{0}</a>  01-Jun-2024 12:02  4096\n",
            name
        ));
    }
    body.push_str("</pre></body></html>\n");
    body
}

async fn mirror_file(
    State(mirror): State<Mirror>,
    UrlPath(name): UrlPath<String>,
) -> Result<Vec<u8>, StatusCode> {
    mirror.downloads.fetch_add(1, Ordering::SeqCst);
    std::fs::read(mirror.dir.join(name)).map_err(|_| StatusCode::NOT_FOUND)
}

async fn start_mirror(dir: &Path) -> (String, Arc<AtomicUsize>) {
    let mirror = Mirror {
        dir: dir.to_path_buf(),
        downloads: Arc::new(AtomicUsize::new(0)),
    };
    let downloads = mirror.downloads.clone();
    let router = Router::new()
        .route("/maxz/", get(mirror_listing))
        .route("/maxz/:name", get(mirror_file))
        .with_state(mirror);
    (serve(router).await, downloads)
}

fn maxz_config(base_url: &str) -> ProductConfig {
    let yaml = format!(
        r#"
product: {{ id: maxz, name: MaxZ }}
source: {{ base_url: "{}/maxz/" }}
storage: {{ raw_dir: maxz, output_dir: maxz_png }}
classifier: {{ type: raw_code }}
"#,
        base_url
    );
    serde_yaml::from_str(&yaml).unwrap()
}

fn context(
    config: &ProductConfig,
    data_dir: &Path,
    client: &RetryingClient,
    alerts: Arc<RecordingAlerts>,
) -> FetcherContext {
    let runtime = ProductRuntime::from_config(config, data_dir, client).unwrap();
    FetcherContext::new(
        vec![runtime],
        Downloader::new(client.clone()),
        alerts,
        Duration::from_secs(30),
    )
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ============================================================================
// Retry behaviour
// ============================================================================

async fn flaky(State(calls): State<Arc<AtomicUsize>>) -> (StatusCode, &'static str) {
    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
        (StatusCode::SERVICE_UNAVAILABLE, "busy")
    } else {
        (StatusCode::OK, "ok")
    }
}

async fn broken(State(calls): State<Arc<AtomicUsize>>) -> StatusCode {
    calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::BAD_GATEWAY
}

async fn missing(State(calls): State<Arc<AtomicUsize>>) -> StatusCode {
    calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}

#[tokio::test]
async fn test_retries_transient_statuses() {
    let calls = Arc::new(AtomicUsize::new(0));
    let base = serve(
        Router::new()
            .route("/flaky", get(flaky))
            .with_state(calls.clone()),
    )
    .await;

    let response = fast_client()
        .get(&format!("{}/flaky", base), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let base = serve(
        Router::new()
            .route("/broken", get(broken))
            .with_state(calls.clone()),
    )
    .await;

    let err = fast_client()
        .get(&format!("{}/broken", base), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 6, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let base = serve(
        Router::new()
            .route("/missing", get(missing))
            .with_state(calls.clone()),
    )
    .await;

    let err = fast_client()
        .get(&format!("{}/missing", base), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Http { status: 404, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Listing and download
// ============================================================================

#[tokio::test]
async fn test_http_listing_returns_absolute_urls() {
    let source = scratch_dir();
    std::fs::write(source.path().join(source_name("20240601120000")), b"x").unwrap();
    std::fs::write(source.path().join("notes.txt"), b"x").unwrap();
    let (base, _) = start_mirror(source.path()).await;

    let listing = HttpListing::new(fast_client(), ".hdf");
    let urls = listing
        .list_available(&format!("{}/maxz/", base))
        .await
        .unwrap();
    assert_eq!(
        urls,
        vec![format!(
            "{}/maxz/T_PABV23_C_OKPR_20240601120000.hdf",
            base
        )]
    );
}

#[tokio::test]
async fn test_download_failure_leaves_no_partial() {
    let source = scratch_dir();
    let raw = scratch_dir();
    let (base, _) = start_mirror(source.path()).await;

    let downloader = Downloader::new(fast_client());
    let err = downloader
        .download(&format!("{}/maxz/absent.hdf", base), raw.path(), "absent.hdf")
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Http { status: 404, .. }));
    assert!(file_names(raw.path()).is_empty());
}

#[tokio::test]
async fn test_download_skips_existing_file() {
    let source = scratch_dir();
    let raw = scratch_dir();
    let name = source_name("20240601120000");
    std::fs::write(source.path().join(&name), b"remote").unwrap();
    std::fs::write(raw.path().join(&name), b"local").unwrap();
    let (base, downloads) = start_mirror(source.path()).await;

    let outcome = Downloader::new(fast_client())
        .download(&format!("{}/maxz/{}", base, name), raw.path(), &name)
        .await
        .unwrap();
    assert_eq!(outcome, DownloadOutcome::AlreadyPresent(raw.path().join(&name)));
    assert_eq!(downloads.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read(raw.path().join(&name)).unwrap(), b"local");
}

/// Serves `body`, but first creates a non-empty directory where the
/// downloader will try to rename the finished file.
#[derive(Clone)]
struct Obstructed {
    target: PathBuf,
}

async fn obstructed_file(State(obstructed): State<Obstructed>) -> Vec<u8> {
    std::fs::create_dir_all(obstructed.target.join("occupied")).unwrap();
    b"payload".to_vec()
}

#[tokio::test]
async fn test_failed_rename_leaves_no_partial() {
    let raw = scratch_dir();
    let name = source_name("20240601120000");
    let base = serve(
        Router::new()
            .route("/maxz/:name", get(obstructed_file))
            .with_state(Obstructed {
                target: raw.path().join(&name),
            }),
    )
    .await;

    let err = Downloader::new(fast_client())
        .download(&format!("{}/maxz/{}", base, name), raw.path(), &name)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Io { .. }));
    assert!(raw.path().join(&name).is_dir());
    assert_eq!(file_names(raw.path()), vec![name]);
}

// ============================================================================
// Full ticks
// ============================================================================

#[tokio::test]
async fn test_tick_downloads_converts_and_publishes() {
    let source = scratch_dir();
    let data = scratch_dir();

    // undetect, bin 0, nodata, bin 3 -> score 0.5
    OdimFixture::reflectivity(2, 2, vec![0, 80, 255, 100])
        .write_to(source.path(), &source_name("20240601120000"))
        .unwrap();
    OdimFixture::reflectivity(2, 2, constant_grid(2, 2, 255))
        .write_to(source.path(), &source_name("20240601120500"))
        .unwrap();

    let (base, downloads) = start_mirror(source.path()).await;
    let client = fast_client();
    let alerts = Arc::new(RecordingAlerts::default());
    let config = maxz_config(&base);
    let mut ctx = context(&config, data.path(), &client, alerts.clone());

    let summary = ctx.run_tick().await.unwrap();
    assert_eq!(summary.listed, 2);
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.converted, 2);
    assert_eq!(summary.failed, 0);
    assert!(alerts.messages().is_empty());

    let published = file_names(&data.path().join("maxz_png"));
    assert_eq!(
        published,
        vec![
            "T_PABV23_C_OKPR_20240601120000_0.500.png".to_string(),
            "T_PABV23_C_OKPR_20240601120500_0.000.png".to_string(),
        ]
    );

    let parsed = ArtifactName::parse(&published[0]).unwrap();
    assert_eq!(parsed.rain_score, Some(0.5));

    let png = std::fs::read(data.path().join("maxz_png").join(&published[1])).unwrap();
    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    assert!(img.pixels().all(|p| p.0[3] == 0));
    let needle = b"Capture-Time\x002024-06-01T12:05:00+00:00";
    assert!(png.windows(needle.len()).any(|w| w == needle));

    // Second tick: nothing new.
    let summary = ctx.run_tick().await.unwrap();
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.downloaded, 0);
    assert_eq!(downloads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_restart_does_not_download_again() {
    let source = scratch_dir();
    let data = scratch_dir();
    OdimFixture::reflectivity(2, 1, vec![80, 90])
        .write_to(source.path(), &source_name("20240601120000"))
        .unwrap();

    let (base, downloads) = start_mirror(source.path()).await;
    let client = fast_client();
    let config = maxz_config(&base);

    let mut first = context(&config, data.path(), &client, Arc::new(RecordingAlerts::default()));
    first.run_tick().await.unwrap();
    assert_eq!(downloads.load(Ordering::SeqCst), 1);

    let seen = SeenSet::scan(&data.path().join("maxz")).unwrap();
    assert!(seen.contains(&source_name("20240601120000")));

    let mut second = context(&config, data.path(), &client, Arc::new(RecordingAlerts::default()));
    let summary = second.run_tick().await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.downloaded, 0);
    assert_eq!(downloads.load(Ordering::SeqCst), 1);
    assert_eq!(second.products()[0].seen.len(), 1);
}

#[tokio::test]
async fn test_conversion_failure_is_alerted_and_not_retried() {
    let source = scratch_dir();
    let data = scratch_dir();
    let name = source_name("20240601120000");
    std::fs::write(source.path().join(&name), b"not an hdf5 file").unwrap();

    let (base, downloads) = start_mirror(source.path()).await;
    let client = fast_client();
    let alerts = Arc::new(RecordingAlerts::default());
    let mut ctx = context(&maxz_config(&base), data.path(), &client, alerts.clone());

    let summary = ctx.run_tick().await.unwrap();
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.converted, 0);
    assert_eq!(summary.failed, 1);

    let messages = alerts.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains(&name));

    // The raw file stays and is not fetched again.
    assert!(data.path().join("maxz").join(&name).exists());
    assert!(file_names(&data.path().join("maxz_png")).is_empty());
    let summary = ctx.run_tick().await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(downloads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_listing_failure_is_alerted() {
    let data = scratch_dir();
    let base = serve(Router::new().route(
        "/maxz/",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    ))
    .await;

    let alerts = Arc::new(RecordingAlerts::default());
    let mut ctx = context(&maxz_config(&base), data.path(), &fast_client(), alerts.clone());

    let summary = ctx.run_tick().await.unwrap();
    assert_eq!(summary.listed, 0);
    assert_eq!(alerts.messages().len(), 1);
    assert!(alerts.messages()[0].starts_with("Failed to list maxz"));
}

/// A mirror listing one file that is missing on the first request.
#[derive(Clone)]
struct LateMirror {
    name: String,
    body: Arc<Vec<u8>>,
    requests: Arc<AtomicUsize>,
}

async fn late_listing(State(mirror): State<LateMirror>) -> String {
    format!("<a href=\"{0}\">{0}</a>  01-Jun-2024 12:02  4096\n", mirror.name)
}

async fn late_file(State(mirror): State<LateMirror>) -> Result<Vec<u8>, StatusCode> {
    if mirror.requests.fetch_add(1, Ordering::SeqCst) == 0 {
        Err(StatusCode::NOT_FOUND)
    } else {
        Ok(mirror.body.as_ref().clone())
    }
}

#[tokio::test]
async fn test_download_failure_is_retried_next_tick() {
    let source = scratch_dir();
    let data = scratch_dir();
    let name = source_name("20240601120000");
    let fixture = OdimFixture::reflectivity(2, 1, vec![80, 255])
        .write_to(source.path(), &name)
        .unwrap();

    let mirror = LateMirror {
        name: name.clone(),
        body: Arc::new(std::fs::read(fixture).unwrap()),
        requests: Arc::new(AtomicUsize::new(0)),
    };
    let requests = mirror.requests.clone();
    let base = serve(
        Router::new()
            .route("/maxz/", get(late_listing))
            .route("/maxz/:name", get(late_file))
            .with_state(mirror),
    )
    .await;

    let alerts = Arc::new(RecordingAlerts::default());
    let mut ctx = context(&maxz_config(&base), data.path(), &fast_client(), alerts.clone());

    let summary = ctx.run_tick().await.unwrap();
    assert_eq!(summary.listed, 1);
    assert_eq!(summary.downloaded, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(alerts.messages().len(), 1);
    assert!(alerts.messages()[0].starts_with("Failed to download"));
    assert!(!ctx.products()[0].seen.contains(&name));
    assert!(file_names(&data.path().join("maxz")).is_empty());

    let summary = ctx.run_tick().await.unwrap();
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.converted, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(requests.load(Ordering::SeqCst), 2);
    assert!(ctx.products()[0].seen.contains(&name));
    assert_eq!(
        file_names(&data.path().join("maxz_png")),
        vec!["T_PABV23_C_OKPR_20240601120000_0.500.png".to_string()]
    );
    assert_eq!(alerts.messages().len(), 1);
}

// ============================================================================
// Publishing
// ============================================================================

#[test]
fn test_publish_refuses_existing_destination() {
    let out = scratch_dir();
    let stem = "T_PABV23_C_OKPR_20240601120000";
    let temp_path = out.path().join(temporary_file_name(stem));
    std::fs::write(&temp_path, b"new").unwrap();
    let destination = out.path().join("T_PABV23_C_OKPR_20240601120000_0.250.png");
    std::fs::write(&destination, b"old").unwrap();

    let conversion = Conversion {
        stem: stem.to_string(),
        temp_path: temp_path.clone(),
        rain_score: 0.25,
        width: 2,
        height: 2,
    };

    match publish(&conversion, out.path()) {
        Err(PublishError::DestinationExists(path)) => assert_eq!(path, destination),
        other => panic!("unexpected publish result {:?}", other),
    }
    assert_eq!(std::fs::read(&temp_path).unwrap(), b"new");
    assert_eq!(std::fs::read(&destination).unwrap(), b"old");
}
