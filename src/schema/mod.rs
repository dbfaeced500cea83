//! Versioned extraction of canonical [`Video`] records from page metadata.
//!
//! The platform changes the shape of its embedded page data without notice.
//! Each known shape is one [`Extractor`] variant paired with a declarative
//! [`Schema`]; new layouts are supported by appending a variant.

use std::fmt;

use thiserror::Error;
use tracing::debug;

mod json;
mod v20200623;
mod v20201020;
pub mod validate;

pub use validate::{FieldRule, Kind, Schema, Violation};

use crate::models::{RawMetadata, Video};

/// Fields every schema version requires.
const COMMON_FIELDS: [FieldRule; 6] = [
    FieldRule::required("id", Kind::NumericString),
    FieldRule::required("user_id", Kind::String),
    FieldRule::required("create_time", Kind::Timestamp),
    FieldRule::required("description", Kind::String),
    FieldRule::required("play_urls", Kind::StringArray),
    FieldRule::required("thumbnail_urls", Kind::StringArray),
];

/// Date-coded tag of one page layout and its validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaVersion(&'static str);

impl SchemaVersion {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The metadata does not have the shape an extractor expects.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("expected {0}")]
pub struct ShapeMismatch(pub &'static str);

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no extractor matches the page data: {0}")]
    NoMatchingSchema(String),
    #[error("no valid schema exists for the extracted data: {0}")]
    NoValidSchema(String),
}

/// Known page layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    V20200623,
    V20201020,
}

impl Extractor {
    /// Every layout in the order support was added.
    pub const ALL: [Self; 2] = [Self::V20200623, Self::V20201020];

    #[must_use]
    pub fn version(self) -> SchemaVersion {
        match self {
            Self::V20200623 => SchemaVersion(v20200623::VERSION),
            Self::V20201020 => SchemaVersion(v20201020::VERSION),
        }
    }

    /// Map raw metadata to a [`Video`].
    ///
    /// # Errors
    ///
    /// Returns [`ShapeMismatch`] if the metadata is not in this layout.
    pub fn extract(self, meta: &RawMetadata) -> Result<Video, ShapeMismatch> {
        match self {
            Self::V20200623 => v20200623::extract(meta),
            Self::V20201020 => v20201020::extract(meta),
        }
    }

    #[must_use]
    pub fn schema(self) -> &'static Schema {
        match self {
            Self::V20200623 => &v20200623::SCHEMA,
            Self::V20201020 => &v20201020::SCHEMA,
        }
    }
}

/// Ordered collection of extractors, consulted newest first.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    extractors: Vec<Extractor>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Create a registry holding every known layout.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for extractor in Extractor::ALL {
            registry.register(extractor);
        }
        registry
    }

    /// Register an extractor. Later registrations are tried first.
    pub fn register(&mut self, extractor: Extractor) {
        if !self.extractors.contains(&extractor) {
            self.extractors.push(extractor);
        }
    }

    /// Registered extractors, newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = Extractor> + '_ {
        self.extractors.iter().rev().copied()
    }

    /// Extract a video with the first layout that both matches the metadata
    /// shape and whose schema accepts the result.
    ///
    /// # Errors
    ///
    /// `NoMatchingSchema` if no layout matches the shape, `NoValidSchema` if
    /// some did but every result failed validation.
    pub fn extract_any(&self, meta: &RawMetadata) -> Result<(SchemaVersion, Video), ExtractError> {
        let mut mismatches = Vec::new();
        let mut violations = Vec::new();

        for extractor in self.newest_first() {
            let version = extractor.version();
            let video = match extractor.extract(meta) {
                Ok(video) => video,
                Err(mismatch) => {
                    debug!(version = %version, reason = %mismatch, "Extractor does not match page data");
                    mismatches.push(format!("{version}: {mismatch}"));
                    continue;
                }
            };

            match check(extractor.schema(), &video) {
                Ok(()) => {
                    debug!(version = %version, video_id = %video.id, "Extracted video data");
                    return Ok((version, video));
                }
                Err(violation) => {
                    debug!(version = %version, reason = %violation, "Extracted data failed validation");
                    violations.push(format!("{version}: {violation}"));
                }
            }
        }

        if violations.is_empty() {
            Err(ExtractError::NoMatchingSchema(summary(&mismatches)))
        } else {
            Err(ExtractError::NoValidSchema(summary(&violations)))
        }
    }

    /// Find the newest schema version that accepts a video record.
    ///
    /// # Errors
    ///
    /// Returns `NoValidSchema` if no registered schema accepts it.
    pub fn validate(&self, video: &Video) -> Result<SchemaVersion, ExtractError> {
        let mut violations = Vec::new();
        for extractor in self.newest_first() {
            match check(extractor.schema(), video) {
                Ok(()) => {
                    debug!(version = %extractor.version(), "Schema validation success");
                    return Ok(extractor.version());
                }
                Err(violation) => violations.push(format!("{}: {violation}", extractor.version())),
            }
        }
        Err(ExtractError::NoValidSchema(summary(&violations)))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn check(schema: &Schema, video: &Video) -> Result<(), String> {
    let record = serde_json::to_value(video).map_err(|e| e.to_string())?;
    schema.validate(&record).map_err(|v| v.to_string())
}

fn summary(reasons: &[String]) -> String {
    if reasons.is_empty() {
        "no schemas registered".to_string()
    } else {
        reasons.join("; ")
    }
}
