use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::constants::{
    DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_OUTPUT_TEMPLATE,
    DEFAULT_URL_PATTERN,
};
use crate::page::PatternError;
use crate::template::{OutputTemplate, TemplateError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("invalid output template: {0}")]
    Template(#[from] TemplateError),
    #[error("invalid URL pattern: {0}")]
    UrlPattern(#[from] PatternError),
    #[error("failed to read batch file {path}: {source}")]
    BatchFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no URLs given; pass URLs or --batch-file")]
    NoUrls,
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Output
    pub output_dir: Option<PathBuf>,
    pub output_template: String,
    pub overwrite: OverwritePolicy,
    pub write_thumbnail: bool,
    pub write_json: bool,
    pub write_description: bool,

    // Video selection
    pub url_pattern: String,
    pub download_archive: Option<PathBuf>,

    // Network
    pub check_certificate: bool,
    pub fetch_timeout: Duration,
    pub download_timeout: Duration,

    // Workers
    pub concurrency: usize,
    pub sleep_interval: Duration,
    pub max_sleep_interval: Duration,

    // Simulation
    pub simulate: bool,
    pub dump_json: bool,
    pub print_json: bool,
}

/// What to do when a media file already exists at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Create files exclusively; never replace existing media.
    #[default]
    Keep,
    /// Replace existing files.
    Clobber,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: None,
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            overwrite: OverwritePolicy::Keep,
            write_thumbnail: true,
            write_json: true,
            write_description: false,

            url_pattern: DEFAULT_URL_PATTERN.to_string(),
            download_archive: None,

            check_certificate: true,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),

            concurrency: 1,
            sleep_interval: Duration::from_millis(200),
            max_sleep_interval: Duration::ZERO,

            simulate: false,
            dump_json: false,
            print_json: false,
        }
    }
}

impl Config {
    /// Whether media and sidecars are skipped.
    #[must_use]
    pub fn is_simulation(&self) -> bool {
        self.simulate || self.dump_json
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name: "concurrent-count".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !self.max_sleep_interval.is_zero() && self.max_sleep_interval < self.sleep_interval {
            return Err(ConfigError::InvalidValue {
                name: "max-sleep-interval".to_string(),
                message: "must be 0 or at least sleep-interval".to_string(),
            });
        }
        if self.fetch_timeout.is_zero() || self.download_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        OutputTemplate::parse(&self.output_template)?;
        crate::page::IdResolver::new(&self.url_pattern)?;
        Ok(())
    }
}

/// Parse a number of seconds as given on the command line.
///
/// # Errors
///
/// Returns an error for negative, non-finite, or unparsable values.
pub fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("`{value}` must be a non-negative number of seconds"));
    }
    Ok(Duration::from_secs_f64(secs))
}
