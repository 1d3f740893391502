//! HTTP fetcher for downloading filter lists.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::DownloadError;

#[cfg(test)]
use mockall::automock;

/// Maximum size per filter file (10 MB)
pub const DEFAULT_MAX_FILTER_SIZE: usize = 10 * 1024 * 1024;

/// Raw result of a GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// The transport used to fetch filter bodies.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET and return the status together with the full body.
    async fn get(&self, url: &str) -> Result<HttpResponse, DownloadError>;
}

/// Production [`HttpClient`] backed by reqwest with rustls.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Create a client whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("filtersync/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DownloadError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Download a filter body. Anything other than `200 OK` is a failure.
pub async fn download(
    client: &dyn HttpClient,
    url: &str,
    max_size: usize,
) -> Result<Vec<u8>, DownloadError> {
    debug!("Downloading filter from {}", url);

    let response = client.get(url).await?;
    if response.status != 200 {
        return Err(DownloadError::Status(response.status));
    }
    if response.body.len() > max_size {
        return Err(DownloadError::TooLarge {
            size: response.body.len(),
            max: max_size,
        });
    }

    debug!("Downloaded {} bytes from {}", response.body.len(), url);
    Ok(response.body)
}

/// Count significant lines: non-empty and not starting with `#` or `!`.
pub fn classify(body: &[u8]) -> u64 {
    body.split(|b| *b == b'\n')
        .filter(|line| !matches!(line.first(), None | Some(&b'#') | Some(&b'!')))
        .count() as u64
}
