use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::media::{Downloaded, MediaDownloader, MediaError};
use super::pacing::SleepInterval;
use crate::archive::ArchiveStore;
use crate::config::{Config, ConfigError};
use crate::error::{PipelineError, Severity, SkipKind};
use crate::models::{DownloadRecord, Video, VideoId};
use crate::page::{build_http_client, scrape, IdResolver, PageFetcher};
use crate::schema::{SchemaRegistry, SchemaVersion};
use crate::template::OutputTemplate;

/// Stages of the per-URL state machine, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Fetching,
    Scraping,
    Extracting,
    Validating,
    ArchiveCheck,
    Downloading,
    Persisting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Scraping => "scraping",
            Self::Extracting => "extracting",
            Self::Validating => "validating",
            Self::ArchiveCheck => "archive_check",
            Self::Downloading => "downloading",
            Self::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// Terminal state of one URL.
#[derive(Debug)]
pub enum Outcome {
    Done {
        id: VideoId,
        path: PathBuf,
        version: SchemaVersion,
    },
    /// Extracted and validated, nothing written.
    Simulated(VideoId),
    Skipped {
        url: String,
        error: PipelineError,
    },
}

/// Counts for a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub done: usize,
    pub simulated: usize,
    pub skipped: HashMap<SkipKind, usize>,
    /// URLs never started because the run was cancelled.
    pub remaining: usize,
    fatal: Option<PipelineError>,
}

impl RunSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Done { .. } => self.done += 1,
            Outcome::Simulated(_) => self.simulated += 1,
            Outcome::Skipped { error, .. } => {
                *self.skipped.entry(error.kind()).or_default() += 1;
                if error.is_fatal() && self.fatal.is_none() {
                    self.fatal = Some(error);
                }
            }
        }
    }

    fn merge(&mut self, other: RunSummary) {
        self.done += other.done;
        self.simulated += other.simulated;
        self.remaining += other.remaining;
        for (kind, count) in other.skipped {
            *self.skipped.entry(kind).or_default() += count;
        }
        if self.fatal.is_none() {
            self.fatal = other.fatal;
        }
    }

    #[must_use]
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    #[must_use]
    pub fn skipped_for(&self, kind: SkipKind) -> usize {
        self.skipped.get(&kind).copied().unwrap_or(0)
    }

    /// The error that aborted the run, if any.
    #[must_use]
    pub fn fatal_error(&self) -> Option<&PipelineError> {
        self.fatal.as_ref()
    }
}

/// The extraction-validation-download pipeline and its worker pool.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    resolver: IdResolver,
    fetcher: PageFetcher,
    registry: SchemaRegistry,
    template: OutputTemplate,
    media: MediaDownloader,
    archive: Arc<ArchiveStore>,
    pacing: SleepInterval,
}

impl Pipeline {
    /// Build every component from `config` and open the download archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the archive
    /// cannot be opened.
    pub async fn open(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let client = build_http_client(config.check_certificate)?;
        if !config.check_certificate {
            warn!("TLS certificate validation is disabled");
        }

        let archive = ArchiveStore::open(config.download_archive.as_deref()).await?;

        Ok(Self {
            resolver: IdResolver::new(&config.url_pattern)?,
            fetcher: PageFetcher::new(client.clone(), config.fetch_timeout),
            registry: SchemaRegistry::new(),
            template: OutputTemplate::parse(&config.output_template)?,
            media: MediaDownloader::new(client, config.download_timeout),
            archive: Arc::new(archive),
            pacing: SleepInterval::new(config.sleep_interval, config.max_sleep_interval),
            config,
        })
    }

    /// Shared handle to the download archive.
    #[must_use]
    pub fn archive(&self) -> Arc<ArchiveStore> {
        Arc::clone(&self.archive)
    }

    /// Process every URL with the configured number of workers, then close
    /// the archive.
    pub async fn run(self, urls: Vec<String>, cancel: CancellationToken) -> RunSummary {
        let total = urls.len();
        let workers = self.config.concurrency.clamp(1, total.max(1));
        let queue = Arc::new(Mutex::new(urls.into_iter().collect::<VecDeque<_>>()));
        let pipeline = Arc::new(self);

        info!(urls = total, workers, "Starting downloads");

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let pipeline = Arc::clone(&pipeline);
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            tasks.spawn(async move { pipeline.work(worker, &queue, &cancel).await });
        }

        let mut summary = RunSummary::default();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(worker_summary) => summary.merge(worker_summary),
                Err(e) => error!("Worker task panicked: {e}"),
            }
        }
        summary.remaining += queue.lock().await.len();

        if let Err(e) = pipeline.archive.close().await {
            error!(error = %e, "Failed to close download archive");
            if summary.fatal.is_none() {
                summary.fatal = Some(e.into());
            }
        }

        info!(
            done = summary.done,
            simulated = summary.simulated,
            skipped = summary.skipped_total(),
            remaining = summary.remaining,
            "Finished"
        );
        summary
    }

    async fn work(
        &self,
        worker: usize,
        queue: &Mutex<VecDeque<String>>,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        loop {
            let Some(url) = queue.lock().await.pop_front() else {
                break;
            };
            if !self.pacing.pause(cancel).await {
                queue.lock().await.push_front(url);
                break;
            }

            let outcome = self.process_url(&url, cancel).await;
            if let Outcome::Skipped { error, .. } = &outcome {
                if error.is_fatal() {
                    error!(worker, "Stopping all workers");
                    cancel.cancel();
                }
            }
            summary.record(outcome);
        }
        debug!(worker, "Worker finished");
        summary
    }

    /// Run one URL through every stage. Failures never escape; they become
    /// [`Outcome::Skipped`].
    pub async fn process_url(&self, url: &str, cancel: &CancellationToken) -> Outcome {
        match self.try_process(url, cancel).await {
            Ok(outcome) => outcome,
            Err(error) => {
                log_skip(url, &error);
                Outcome::Skipped {
                    url: url.to_string(),
                    error,
                }
            }
        }
    }

    async fn try_process(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome, PipelineError> {
        enter(Stage::Resolving, url, cancel)?;
        let id = self.resolver.resolve(url)?;

        enter(Stage::Fetching, url, cancel)?;
        let page = tokio::select! {
            page = self.fetcher.fetch(url) => page?,
            () = cancel.cancelled() => return Err(PipelineError::Cancelled),
        };
        let fetched_at = chrono::Utc::now().timestamp();

        enter(Stage::Scraping, url, cancel)?;
        let meta = scrape(&page, &id)?;

        enter(Stage::Extracting, url, cancel)?;
        let (extracted_with, video) = self.registry.extract_any(&meta)?;

        enter(Stage::Validating, url, cancel)?;
        let version = self.registry.validate(&video)?;
        if version != extracted_with {
            debug!(video_id = %id, extracted = %extracted_with, version = %version, "Validated against a newer schema");
        }

        enter(Stage::ArchiveCheck, url, cancel)?;
        if self.archive.contains(&id).await {
            return Err(PipelineError::AlreadyArchived(id));
        }

        let record = DownloadRecord {
            video_data: video,
            aweme_data: meta,
            version: version.to_string(),
            timestamp: fetched_at,
        };
        if self.config.dump_json || self.config.print_json {
            print_record(&record);
        }
        if self.config.is_simulation() {
            info!(video_id = %id, version = %version, "Simulated");
            return Ok(Outcome::Simulated(id));
        }

        let base = self.output_path(&record.video_data)?;

        enter(Stage::Downloading, url, cancel)?;
        self.download_media(&record.video_data, &base, cancel).await?;

        enter(Stage::Persisting, url, cancel)?;
        self.persist(&id, &record, &base).await?;

        info!(video_id = %id, path = %base.display(), version = %version, "Downloaded");
        Ok(Outcome::Done {
            id,
            path: base,
            version,
        })
    }

    /// Output path without extension.
    fn output_path(&self, video: &Video) -> Result<PathBuf, PipelineError> {
        let rendered = self.template.render(video)?;
        Ok(match &self.config.output_dir {
            Some(dir) => dir.join(rendered),
            None => PathBuf::from(rendered),
        })
    }

    /// Download the video and, when enabled, its thumbnail. The two are
    /// independent: a failed video does not stop the thumbnail, but it does
    /// fail the URL so nothing is archived.
    async fn download_media(
        &self,
        video: &Video,
        base: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let policy = self.config.overwrite;

        let video_result = match video.primary_play_url() {
            Some(play_url) => {
                let dest = with_suffix(base, ".mp4");
                self.media
                    .download_to(play_url, &dest, policy, cancel)
                    .await
                    .map(|outcome| log_download(&video.id, &dest, outcome))
            }
            None => Err(MediaError::NoCandidate("video")),
        };
        if matches!(video_result, Err(MediaError::Cancelled { .. })) {
            return Err(PipelineError::Cancelled);
        }

        if self.config.write_thumbnail {
            self.download_thumbnail(video, base, cancel).await?;
        }

        video_result.map_err(PipelineError::from)
    }

    async fn download_thumbnail(
        &self,
        video: &Video,
        base: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let Some(thumbnail_url) = video.primary_thumbnail_url() else {
            warn!(video_id = %video.id, "No thumbnail URL in video data");
            return Ok(());
        };
        let dest = with_suffix(base, ".jpg");
        match self
            .media
            .download_to(thumbnail_url, &dest, self.config.overwrite, cancel)
            .await
        {
            Ok(outcome) => log_download(&video.id, &dest, outcome),
            Err(MediaError::Cancelled { .. }) => return Err(PipelineError::Cancelled),
            Err(e) => warn!(video_id = %video.id, error = %e, "Thumbnail download failed"),
        }
        Ok(())
    }

    /// Write the sidecars, then record the id.
    ///
    /// Sidecars are rewritten on every successful pass, even when the media
    /// next to them was kept as [`Downloaded::Existing`]; they always describe
    /// the latest fetch.
    async fn persist(
        &self,
        id: &VideoId,
        record: &DownloadRecord,
        base: &Path,
    ) -> Result<(), PipelineError> {
        if self.config.write_json {
            let path = with_suffix(base, ".json");
            let body = serde_json::to_vec(record).map_err(|e| PipelineError::Sidecar {
                path: path.clone(),
                source: e.into(),
            })?;
            write_sidecar(&path, &body).await?;
        }

        if self.config.write_description {
            let path = with_suffix(base, ".description");
            write_sidecar(&path, record.video_data.description.as_bytes()).await?;
        }

        if !self.archive.add(id).await? {
            debug!(video_id = %id, "Already recorded by another worker");
        }
        Ok(())
    }
}

fn enter(stage: Stage, url: &str, cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    debug!(url = %url, stage = %stage, "Entering stage");
    Ok(())
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

async fn write_sidecar(path: &Path, contents: &[u8]) -> Result<(), PipelineError> {
    let sidecar_error = |source| PipelineError::Sidecar {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(sidecar_error)?;
    }
    tokio::fs::write(path, contents).await.map_err(sidecar_error)?;
    debug!(path = %path.display(), "Wrote sidecar");
    Ok(())
}

fn print_record(record: &DownloadRecord) {
    match serde_json::to_string(record) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(video_id = %record.video_data.id, error = %e, "Failed to serialize record"),
    }
}

fn log_download(video_id: &str, path: &Path, outcome: Downloaded) {
    match outcome {
        Downloaded::Written { bytes } => {
            debug!(video_id = %video_id, path = %path.display(), bytes, "Saved");
        }
        Downloaded::Existing => {
            info!(video_id = %video_id, path = %path.display(), "File already exists, keeping it");
        }
    }
}

fn log_skip(url: &str, error: &PipelineError) {
    let kind = error.kind();
    match kind.severity() {
        Severity::Info => info!(url = %url, kind = %kind, "Skipped: {error}"),
        Severity::Warn => warn!(url = %url, kind = %kind, "Skipped: {error}"),
        Severity::Error => error!(url = %url, kind = %kind, "Skipped: {error}"),
    }
}
