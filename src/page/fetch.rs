use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::constants::BROWSER_USER_AGENT;

/// Failure to fetch a video page.
///
/// Carries either the HTTP status or the transport cause so the caller can
/// decide whether a retry makes sense.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {url} failed with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("request for {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// HTTP status, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request { source, .. } => source.status(),
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request { source, .. } if source.is_timeout())
    }
}

/// Build the HTTP client shared by the page fetcher and the media downloader.
///
/// Disabling certificate validation is a policy; requests are still made.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_http_client(check_certificate: bool) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .danger_accept_invalid_certs(!check_certificate)
        .build()
}

/// Downloads video pages. Never retries.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    timeout: Duration,
}

impl PageFetcher {
    #[must_use]
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetch the page body as text.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure, timeout, or a non-2xx status.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = %url, "Downloading video webpage");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }
}
