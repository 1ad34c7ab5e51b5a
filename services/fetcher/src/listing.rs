//! Discovery of source files on the remote mirror.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;
use crate::http::RetryingClient;

/// Timeout for fetching a listing page.
pub const LISTING_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can enumerate the files available under a base URL.
#[async_trait]
pub trait RemoteListing: Send + Sync {
    /// Absolute URLs of the available files, in listing order.
    async fn list_available(&self, base_url: &str) -> Result<Vec<String>, FetchError>;
}

/// Scrapes an HTML directory index for links to files with a given extension.
#[derive(Debug, Clone)]
pub struct HttpListing {
    client: RetryingClient,
    extension: String,
    timeout: Duration,
}

impl HttpListing {
    pub fn new(client: RetryingClient, extension: impl Into<String>) -> Self {
        Self {
            client,
            extension: extension.into(),
            timeout: LISTING_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl RemoteListing for HttpListing {
    async fn list_available(&self, base_url: &str) -> Result<Vec<String>, FetchError> {
        let response = self.client.get(base_url, self.timeout).await?;
        let body = response.text().await.map_err(|e| FetchError::Request {
            url: base_url.to_string(),
            source: e,
        })?;

        let links = extract_links(base_url, &body, &self.extension);
        debug!(url = %base_url, count = links.len(), "Parsed listing");
        Ok(links)
    }
}

/// Pull file links out of a listing page.
///
/// A line counts when it mentions `extension` and carries an `href="`
/// attribute; its first double-quoted value is taken as the link. Relative
/// links are joined onto `base_url`.
pub fn extract_links(base_url: &str, body: &str, extension: &str) -> Vec<String> {
    body.lines()
        .filter(|line| line.contains(extension) && line.contains("href=\""))
        .filter_map(|line| line.split('"').nth(1))
        .filter(|link| !link.is_empty())
        .map(|link| join_url(base_url, link))
        .collect()
}

fn join_url(base_url: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    let link = link.trim_start_matches("./");
    if base_url.ends_with('/') {
        format!("{}{}", base_url, link)
    } else {
        format!("{}/{}", base_url, link)
    }
}

/// Last path segment of a URL, without query or fragment.
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    path.rsplit('/').next().filter(|name| !name.is_empty())
}
