//! Streaming download of a single media asset to disk.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::OverwritePolicy;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("file {path} not found on server {url}: {source}")]
    Request {
        url: String,
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },
    #[error("file {path} not found on server {url}: status {status}")]
    Status {
        url: String,
        path: PathBuf,
        status: StatusCode,
    },
    #[error("server sent an empty body for {url}")]
    EmptyBody { url: String },
    #[error("no {0} URL in video data")]
    NoCandidate(&'static str),
    #[error("download of {url} cancelled")]
    Cancelled { url: String },
}

/// What happened to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downloaded {
    /// New content was written.
    Written { bytes: u64 },
    /// A non-empty file was already present and the policy keeps it.
    Existing,
}

/// Streams remote assets to disk.
#[derive(Debug, Clone)]
pub struct MediaDownloader {
    client: Client,
    timeout: Duration,
}

impl MediaDownloader {
    #[must_use]
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Download `url` into `dest`.
    ///
    /// A zero-byte file left at `dest` by an earlier failed attempt is
    /// removed first. Under [`OverwritePolicy::Keep`] the file is created
    /// exclusively and an existing file is left untouched. On any failure,
    /// including cancellation and an empty body, nothing is left at `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request, the write, or the body is unusable.
    pub async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        policy: OverwritePolicy,
        cancel: &CancellationToken,
    ) -> Result<Downloaded, MediaError> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| MediaError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        remove_if_empty(dest).await;

        let mut file = match open_destination(dest, policy).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %dest.display(), "File already exists, not overwriting");
                return Ok(Downloaded::Existing);
            }
            Err(source) => {
                return Err(MediaError::Io {
                    path: dest.to_path_buf(),
                    source,
                })
            }
        };

        let result = self.stream_into(url, dest, &mut file, cancel).await;
        drop(file);

        match result {
            Ok(0) => {
                discard(dest).await;
                Err(MediaError::EmptyBody {
                    url: url.to_string(),
                })
            }
            Ok(bytes) => Ok(Downloaded::Written { bytes }),
            Err(e) => {
                discard(dest).await;
                Err(e)
            }
        }
    }

    async fn stream_into(
        &self,
        url: &str,
        dest: &Path,
        file: &mut File,
        cancel: &CancellationToken,
    ) -> Result<u64, MediaError> {
        let request_error = |source: reqwest::Error| MediaError::Request {
            url: url.to_string(),
            path: dest.to_path_buf(),
            source,
        };
        let write_error = |source: io::Error| MediaError::Io {
            path: dest.to_path_buf(),
            source,
        };

        let request = self.client.get(url).timeout(self.timeout).send();
        let mut response = tokio::select! {
            response = request => response.map_err(request_error)?,
            () = cancel.cancelled() => return Err(MediaError::Cancelled { url: url.to_string() }),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status {
                url: url.to_string(),
                path: dest.to_path_buf(),
                status,
            });
        }

        debug!(path = %dest.display(), "Downloading");

        let mut written: u64 = 0;
        loop {
            let chunk = tokio::select! {
                chunk = response.chunk() => chunk.map_err(request_error)?,
                () = cancel.cancelled() => return Err(MediaError::Cancelled { url: url.to_string() }),
            };
            let Some(chunk) = chunk else { break };
            file.write_all(&chunk).await.map_err(write_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_error)?;

        Ok(written)
    }
}

async fn open_destination(dest: &Path, policy: OverwritePolicy) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    match policy {
        OverwritePolicy::Keep => options.create_new(true),
        OverwritePolicy::Clobber => options.create(true).truncate(true),
    };
    options.open(dest).await
}

/// Remove a zero-byte file left by an interrupted attempt.
async fn remove_if_empty(path: &Path) {
    if let Ok(meta) = tokio::fs::metadata(path).await {
        if meta.is_file() && meta.len() == 0 {
            debug!(path = %path.display(), "Removing empty file from earlier attempt");
            discard(path).await;
        }
    }
}

/// Remove a partial file, ignoring a file that is already gone.
async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial file"),
    }
}
