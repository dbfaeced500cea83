use regex::Regex;
use thiserror::Error;

use crate::constants::DEFAULT_URL_PATTERN;
use crate::models::VideoId;

static DEFAULT_PATTERN: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(DEFAULT_URL_PATTERN).unwrap());

/// Name of the capture group holding the video id.
const ID_GROUP: &str = "id";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("URL is invalid: {0}")]
    InvalidUrl(String),
    #[error("unable to find video id in {0}")]
    IdNotFound(String),
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("URL pattern does not compile: {0}")]
    Compile(#[from] regex::Error),
    #[error("URL pattern has no named capture group `id`")]
    MissingIdGroup,
}

/// Turns video page URLs into video ids.
///
/// TikTok video URLs have formats like:
/// - `https://www.tiktok.com/@user/video/1234567890123456789`
/// - `https://www.tiktokv.com/share/video/1234567890123456789`
#[derive(Debug, Clone)]
pub struct IdResolver {
    pattern: Regex,
}

impl IdResolver {
    /// Build a resolver from a custom pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile or lacks an `id` group.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let pattern = Regex::new(pattern)?;
        if !pattern.capture_names().flatten().any(|name| name == ID_GROUP) {
            return Err(PatternError::MissingIdGroup);
        }
        Ok(Self { pattern })
    }

    /// Extract the video id from a URL.
    ///
    /// # Errors
    ///
    /// `InvalidUrl` when the URL does not match at all, `IdNotFound` when it
    /// matches but the `id` group did not participate.
    pub fn resolve(&self, url: &str) -> Result<VideoId, ResolveError> {
        let captures = self
            .pattern
            .captures(url.trim())
            .ok_or_else(|| ResolveError::InvalidUrl(url.to_string()))?;
        captures
            .name(ID_GROUP)
            .map(|m| VideoId::new(m.as_str()))
            .filter(|id| !id.as_str().is_empty())
            .ok_or_else(|| ResolveError::IdNotFound(url.to_string()))
    }
}

impl Default for IdResolver {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_video_id() {
        let resolver = IdResolver::default();
        assert_eq!(
            resolver
                .resolve("https://www.tiktok.com/@user/video/1234567890123456789")
                .unwrap()
                .as_str(),
            "1234567890123456789"
        );
        assert_eq!(
            resolver
                .resolve("https://www.tiktok.com/@some.user_1/video/9876543210?lang=en")
                .unwrap()
                .as_str(),
            "9876543210"
        );
        assert_eq!(
            resolver
                .resolve("http://www.tiktokv.com/share/video/6843000000000000000")
                .unwrap()
                .as_str(),
            "6843000000000000000"
        );
    }

    #[test]
    fn test_resolve_rejects_non_matching_urls() {
        let resolver = IdResolver::default();
        for url in [
            "",
            "not a url",
            "https://vm.tiktok.com/abc123",
            "https://www.tiktok.com/@user",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.tiktok.com/@user/video/abc",
        ] {
            assert!(
                matches!(resolver.resolve(url), Err(ResolveError::InvalidUrl(_))),
                "expected InvalidUrl for {url:?}"
            );
        }
    }

    #[test]
    fn test_optional_id_group_reports_id_not_found() {
        let resolver = IdResolver::new(r"^https://example\.com/v(?:/(?P<id>\d+))?").unwrap();
        assert_eq!(
            resolver.resolve("https://example.com/v/77").unwrap().as_str(),
            "77"
        );
        assert!(matches!(
            resolver.resolve("https://example.com/v"),
            Err(ResolveError::IdNotFound(_))
        ));
    }

    #[test]
    fn test_pattern_without_id_group_is_rejected() {
        assert!(matches!(
            IdResolver::new(r"^https://example\.com/(\d+)"),
            Err(PatternError::MissingIdGroup)
        ));
        assert!(matches!(
            IdResolver::new(r"(?P<id>"),
            Err(PatternError::Compile(_))
        ));
    }
}
