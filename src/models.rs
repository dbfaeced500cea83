//! Records passed between pipeline stages.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `props.pageProps` object scraped from a video page.
///
/// Its shape depends on the page layout the platform served, see
/// [`crate::schema`].
pub type RawMetadata = Map<String, Value>;

/// Platform-assigned identifier of a single video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical video record, independent of the page layout it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub user_id: String,
    /// Unix timestamp (seconds, UTC).
    pub create_time: i64,
    #[serde(default)]
    pub description: String,
    /// Candidate video URLs, best first.
    #[serde(default)]
    pub play_urls: Vec<String>,
    /// Candidate thumbnail URLs, best first.
    #[serde(default)]
    pub thumbnail_urls: Vec<String>,
    /// Layout-specific fields kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Video {
    #[must_use]
    pub fn primary_play_url(&self) -> Option<&str> {
        self.play_urls.first().map(String::as_str)
    }

    #[must_use]
    pub fn primary_thumbnail_url(&self) -> Option<&str> {
        self.thumbnail_urls.first().map(String::as_str)
    }
}

/// Contents of the `.json` sidecar written next to the media files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub video_data: Video,
    pub aweme_data: RawMetadata,
    /// Schema version the record was validated against.
    #[serde(rename = "tiktok-dl")]
    pub version: String,
    /// Unix timestamp of the page fetch.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_video() -> Video {
        let mut extra = Map::new();
        extra.insert("duration".to_string(), json!(15));
        Video {
            id: "6843000000000000000".to_string(),
            user_id: "42".to_string(),
            create_time: 1_598_918_400,
            description: "hello #fyp".to_string(),
            play_urls: vec!["https://v16.example.com/a.mp4".to_string()],
            thumbnail_urls: Vec::new(),
            extra,
        }
    }

    #[test]
    fn test_video_extra_fields_are_flattened() {
        let value = serde_json::to_value(sample_video()).unwrap();
        assert_eq!(value["duration"], json!(15));
        assert_eq!(value["thumbnail_urls"], json!([]));
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn test_download_record_uses_sidecar_keys() {
        let record = DownloadRecord {
            video_data: sample_video(),
            aweme_data: Map::new(),
            version: "20201020".to_string(),
            timestamp: 1_600_000_000,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["tiktok-dl"], json!("20201020"));
        assert_eq!(value["timestamp"], json!(1_600_000_000));
        assert_eq!(value["video_data"]["id"], json!("6843000000000000000"));
        assert!(value["aweme_data"].is_object());
    }

    #[test]
    fn test_primary_urls() {
        let video = sample_video();
        assert_eq!(
            video.primary_play_url(),
            Some("https://v16.example.com/a.mp4")
        );
        assert_eq!(video.primary_thumbnail_url(), None);
    }
}
