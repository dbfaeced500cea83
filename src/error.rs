//! Per-URL failure taxonomy.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::archiver::MediaError;
use crate::models::VideoId;
use crate::page::{FetchError, ResolveError, ScrapeError};
use crate::schema::ExtractError;
use crate::template::TemplateError;

/// Why a URL was skipped.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("cannot format output path: {0}")]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("failed to write {path}: {source}")]
    Sidecar {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("{0}: already recorded in archive")]
    AlreadyArchived(VideoId),
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipKind {
    InvalidUrl,
    IdNotFound,
    Fetch,
    MarkerNotFound,
    MalformedJson,
    UnexpectedShape,
    VideoUnavailable,
    NoMatchingSchema,
    NoValidSchema,
    MediaWrite,
    ArchiveIo,
    AlreadyArchived,
    Template,
    Sidecar,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl PipelineError {
    #[must_use]
    pub fn kind(&self) -> SkipKind {
        match self {
            Self::Resolve(ResolveError::InvalidUrl(_)) => SkipKind::InvalidUrl,
            Self::Resolve(ResolveError::IdNotFound(_)) => SkipKind::IdNotFound,
            Self::Fetch(_) => SkipKind::Fetch,
            Self::Scrape(ScrapeError::MarkerNotFound(_)) => SkipKind::MarkerNotFound,
            Self::Scrape(ScrapeError::MalformedJson { .. }) => SkipKind::MalformedJson,
            Self::Scrape(ScrapeError::UnexpectedShape(_)) => SkipKind::UnexpectedShape,
            Self::Scrape(ScrapeError::VideoUnavailable(_)) => SkipKind::VideoUnavailable,
            Self::Extract(ExtractError::NoMatchingSchema(_)) => SkipKind::NoMatchingSchema,
            Self::Extract(ExtractError::NoValidSchema(_)) => SkipKind::NoValidSchema,
            Self::Template(_) => SkipKind::Template,
            Self::Media(MediaError::Cancelled { .. }) | Self::Cancelled => SkipKind::Cancelled,
            Self::Media(_) => SkipKind::MediaWrite,
            Self::Sidecar { .. } => SkipKind::Sidecar,
            Self::Archive(_) => SkipKind::ArchiveIo,
            Self::AlreadyArchived(_) => SkipKind::AlreadyArchived,
        }
    }

    /// Whether the whole run must stop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == SkipKind::ArchiveIo
    }
}

impl SkipKind {
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::VideoUnavailable | Self::NoMatchingSchema | Self::NoValidSchema => {
                Severity::Warn
            }
            Self::AlreadyArchived | Self::Cancelled => Severity::Info,
            _ => Severity::Error,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::IdNotFound => "id_not_found",
            Self::Fetch => "fetch",
            Self::MarkerNotFound => "marker_not_found",
            Self::MalformedJson => "malformed_json",
            Self::UnexpectedShape => "unexpected_shape",
            Self::VideoUnavailable => "video_unavailable",
            Self::NoMatchingSchema => "no_matching_schema",
            Self::NoValidSchema => "no_valid_schema",
            Self::MediaWrite => "media_write",
            Self::ArchiveIo => "archive_io",
            Self::AlreadyArchived => "already_archived",
            Self::Template => "template",
            Self::Sidecar => "sidecar",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let id = VideoId::new("1");
        let err: PipelineError = ResolveError::InvalidUrl("x".into()).into();
        assert_eq!(err.kind(), SkipKind::InvalidUrl);

        let err: PipelineError = ScrapeError::VideoUnavailable(id.clone()).into();
        assert_eq!(err.kind(), SkipKind::VideoUnavailable);
        assert_eq!(err.kind().severity(), Severity::Warn);

        let err: PipelineError = ExtractError::NoMatchingSchema("1".into()).into();
        assert_eq!(err.kind(), SkipKind::NoMatchingSchema);

        let err: PipelineError = MediaError::Cancelled { url: "u".into() }.into();
        assert_eq!(err.kind(), SkipKind::Cancelled);
        assert_eq!(err.kind().severity(), Severity::Info);

        let err: PipelineError = MediaError::EmptyBody { url: "u".into() }.into();
        assert_eq!(err.kind(), SkipKind::MediaWrite);
        assert_eq!(err.kind().severity(), Severity::Error);

        let err = PipelineError::AlreadyArchived(id);
        assert_eq!(err.kind().severity(), Severity::Info);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_template_error_is_not_fatal() {
        let err: PipelineError = TemplateError::InvalidTimestamp(i64::MAX).into();
        assert_eq!(err.kind(), SkipKind::Template);
        assert!(!err.is_fatal());
    }
}
