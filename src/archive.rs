//! Download archive: the persisted set of video ids already downloaded.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::models::VideoId;

#[derive(Debug, Error)]
#[error("download archive {path}: {source}")]
pub struct ArchiveError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl ArchiveError {
    fn new(path: &Path, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug)]
struct Backing {
    path: PathBuf,
    file: Mutex<File>,
}

/// Append-only set of downloaded video ids.
///
/// Without a backing file the store only deduplicates within one run.
/// Lookups take a shared lock; `add` serializes on the file handle so every
/// id lands on disk exactly once.
#[derive(Debug)]
pub struct ArchiveStore {
    ids: RwLock<HashSet<VideoId>>,
    backing: Option<Backing>,
}

impl ArchiveStore {
    /// A store that is never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            ids: RwLock::new(HashSet::new()),
            backing: None,
        }
    }

    /// Open the archive at `path`, creating the file if needed, and load every
    /// id it lists. `None` gives an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub async fn open(path: Option<&Path>) -> Result<Self, ArchiveError> {
        let Some(path) = path else {
            return Ok(Self::in_memory());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArchiveError::new(path, e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .await
            .map_err(|e| ArchiveError::new(path, e))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .await
            .map_err(|e| ArchiveError::new(path, e))?;

        let ids: HashSet<VideoId> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(VideoId::new)
            .collect();

        // A file written by another tool may lack the final newline.
        if !contents.is_empty() && !contents.ends_with('\n') {
            file.write_all(b"\n")
                .await
                .map_err(|e| ArchiveError::new(path, e))?;
        }

        info!(path = %path.display(), count = ids.len(), "Loaded download archive");

        Ok(Self {
            ids: RwLock::new(ids),
            backing: Some(Backing {
                path: path.to_path_buf(),
                file: Mutex::new(file),
            }),
        })
    }

    /// Whether the id has been recorded.
    pub async fn contains(&self, id: &VideoId) -> bool {
        self.ids.read().await.contains(id)
    }

    /// Record an id. Returns `false` if it was already present, in which case
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if appending to the backing file fails. The id stays
    /// in the in-memory set.
    pub async fn add(&self, id: &VideoId) -> Result<bool, ArchiveError> {
        let Some(backing) = &self.backing else {
            return Ok(self.ids.write().await.insert(id.clone()));
        };

        let mut file = backing.file.lock().await;
        if !self.ids.write().await.insert(id.clone()) {
            return Ok(false);
        }

        let line = format!("{id}\n");
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| ArchiveError::new(&backing.path, e))?;
        file.flush()
            .await
            .map_err(|e| ArchiveError::new(&backing.path, e))?;

        debug!(video_id = %id, "Recorded in download archive");
        Ok(true)
    }

    /// Number of recorded ids.
    pub async fn len(&self) -> usize {
        self.ids.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ids.read().await.is_empty()
    }

    /// Flush and sync the backing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub async fn close(&self) -> Result<(), ArchiveError> {
        if let Some(backing) = &self.backing {
            let mut file = backing.file.lock().await;
            file.flush()
                .await
                .map_err(|e| ArchiveError::new(&backing.path, e))?;
            file.sync_all()
                .await
                .map_err(|e| ArchiveError::new(&backing.path, e))?;
            debug!(path = %backing.path.display(), "Closed download archive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = ArchiveStore::open(None).await.unwrap();
        let id = VideoId::new("1");
        assert!(!store.contains(&id).await);
        assert!(store.add(&id).await.unwrap());
        assert!(store.contains(&id).await);
        assert!(!store.add(&id).await.unwrap());
        assert_eq!(store.len().await, 1);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_reopen_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("archive.txt");

        let store = ArchiveStore::open(Some(&path)).await.unwrap();
        assert!(store.is_empty().await);
        for id in ["10", "20", "30"] {
            store.add(&VideoId::new(id)).await.unwrap();
        }
        store.close().await.unwrap();
        drop(store);

        let reopened = ArchiveStore::open(Some(&path)).await.unwrap();
        assert_eq!(reopened.len().await, 3);
        for id in ["10", "20", "30"] {
            assert!(reopened.contains(&VideoId::new(id)).await);
        }
        assert!(!reopened.contains(&VideoId::new("40")).await);
    }

    #[tokio::test]
    async fn test_existing_file_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.txt");
        tokio::fs::write(&path, "1\n\n2").await.unwrap();

        let store = ArchiveStore::open(Some(&path)).await.unwrap();
        assert!(store.contains(&VideoId::new("2")).await);
        store.add(&VideoId::new("3")).await.unwrap();
        store.close().await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = contents.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_duplicate_add_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.txt");
        let store = Arc::new(ArchiveStore::open(Some(&path)).await.unwrap());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.add(&VideoId::new("99")).await.unwrap()
            }));
        }
        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        store.close().await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "99\n");
    }

    #[tokio::test]
    async fn test_unreadable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as the archive file.
        assert!(ArchiveStore::open(Some(dir.path())).await.is_err());
    }
}
