//! Command-line surface.

use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{parse_seconds, Config, ConfigError, OverwritePolicy};
use crate::constants::{
    DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_OUTPUT_TEMPLATE,
    DEFAULT_URL_PATTERN,
};

/// Download TikTok videos with their thumbnails and metadata.
#[derive(Parser, Debug, Clone)]
#[command(name = "tiktok-dl", version, about)]
pub struct Cli {
    /// Video URLs
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Download only videos not listed in the archive file, and record the
    /// ids of all downloaded videos in it
    #[arg(short = 'a', long, value_name = "FILE", env = "TIKTOK_DL_ARCHIVE")]
    pub download_archive: Option<PathBuf>,

    /// Number of videos processed concurrently
    #[arg(
        short = 'j',
        long = "concurrent-count",
        value_name = "N",
        env = "TIKTOK_DL_CONCURRENT",
        default_value_t = 1
    )]
    pub concurrency: usize,

    /// File containing URLs to download ('-' for stdin), one per line. Lines
    /// starting with '#', ';' or ']' are comments
    #[arg(short = 'i', long, value_name = "FILE")]
    pub batch_file: Option<PathBuf>,

    /// Output filename template, without extension
    #[arg(
        short = 'o',
        long,
        value_name = "TEMPLATE",
        env = "TIKTOK_DL_OUTPUT_TEMPLATE",
        default_value = DEFAULT_OUTPUT_TEMPLATE
    )]
    pub output_template: String,

    /// Directory prefix for all output files
    #[arg(short = 'P', long, value_name = "DIR", env = "TIKTOK_DL_DIRECTORY")]
    pub directory_prefix: Option<PathBuf>,

    /// Overwrite media files that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Write the video description to a .description file
    #[arg(long)]
    pub write_description: bool,

    /// Do not write the .json metadata file
    #[arg(long)]
    pub no_write_json: bool,

    /// Do not download the thumbnail
    #[arg(long)]
    pub no_write_thumbnail: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Suppress warnings; other messages are still shown
    #[arg(long)]
    pub no_warnings: bool,

    /// Log debugging information
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not download or write anything to disk
    #[arg(short, long)]
    pub simulate: bool,

    /// Simulate and print the metadata of each video as JSON
    #[arg(long)]
    pub dump_json: bool,

    /// Print the metadata of each video as JSON while downloading
    #[arg(long)]
    pub print_json: bool,

    /// Suppress HTTPS certificate validation
    #[arg(long)]
    pub no_check_certificate: bool,

    /// Seconds to sleep before each download
    #[arg(long, value_name = "SECONDS", default_value = "0.2", value_parser = parse_seconds)]
    pub sleep_interval: Duration,

    /// Upper bound of a randomized sleep before each download; 0 disables
    /// randomization
    #[arg(long, value_name = "SECONDS", default_value = "0", value_parser = parse_seconds)]
    pub max_sleep_interval: Duration,

    /// Regular expression with a named `id` group that extracts the video id
    #[arg(long, value_name = "REGEX", env = "TIKTOK_DL_URL_PATTERN", default_value = DEFAULT_URL_PATTERN)]
    pub url_pattern: String,

    /// Timeout for fetching a video page, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout: u64,

    /// Timeout for each media download, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_DOWNLOAD_TIMEOUT_SECS)]
    pub download_timeout: u64,
}

impl Cli {
    /// Build the run configuration from the parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn to_config(&self) -> Result<Config, ConfigError> {
        let config = Config {
            output_dir: self.directory_prefix.clone(),
            output_template: self.output_template.clone(),
            overwrite: if self.overwrite {
                OverwritePolicy::Clobber
            } else {
                OverwritePolicy::Keep
            },
            write_thumbnail: !self.no_write_thumbnail,
            write_json: !self.no_write_json,
            write_description: self.write_description,
            url_pattern: self.url_pattern.clone(),
            download_archive: self.download_archive.clone(),
            check_certificate: !self.no_check_certificate,
            fetch_timeout: Duration::from_secs(self.fetch_timeout),
            download_timeout: Duration::from_secs(self.download_timeout),
            concurrency: self.concurrency,
            sleep_interval: self.sleep_interval,
            max_sleep_interval: self.max_sleep_interval,
            simulate: self.simulate,
            dump_json: self.dump_json,
            print_json: self.print_json,
        };
        config.validate()?;
        Ok(config)
    }

    /// Default log filter for the chosen verbosity.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet || self.dump_json {
            "error"
        } else {
            "info"
        }
    }

    /// Whether warning events are dropped while lower levels stay visible.
    #[must_use]
    pub fn suppress_warnings(&self) -> bool {
        self.no_warnings
    }

    /// Positional URLs followed by those from the batch file.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch file cannot be read or no URL remains.
    pub fn collect_urls(&self) -> Result<Vec<String>, ConfigError> {
        let mut urls: Vec<String> = self
            .urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();

        if let Some(path) = &self.batch_file {
            let batch_error = |source| ConfigError::BatchFile {
                path: path.clone(),
                source,
            };
            let batch = if path.as_os_str() == "-" {
                read_batch(io::stdin().lock()).map_err(batch_error)?
            } else {
                let file = std::fs::File::open(path).map_err(batch_error)?;
                read_batch(BufReader::new(file)).map_err(batch_error)?
            };
            urls.extend(batch);
        }

        if urls.is_empty() {
            return Err(ConfigError::NoUrls);
        }
        Ok(urls)
    }
}

/// Read URLs from a batch file, skipping blank lines and comments.
///
/// # Errors
///
/// Returns an error if reading fails.
pub fn read_batch(reader: impl BufRead) -> io::Result<Vec<String>> {
    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() || line.starts_with(['#', ';', ']']) {
            continue;
        }
        urls.push(line.to_string());
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["tiktok-dl"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["https://www.tiktok.com/@a/video/1"]);
        let config = cli.to_config().unwrap();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.sleep_interval, Duration::from_millis(200));
        assert_eq!(config.max_sleep_interval, Duration::ZERO);
        assert_eq!(config.overwrite, OverwritePolicy::Keep);
        assert!(config.write_json);
        assert!(config.write_thumbnail);
        assert!(!config.write_description);
        assert!(config.check_certificate);
        assert_eq!(cli.log_filter(), "info");
    }

    #[test]
    fn test_flags_map_to_config() {
        let cli = parse(&[
            "-j",
            "4",
            "-a",
            "archive.txt",
            "-P",
            "out",
            "-o",
            "{id}",
            "--overwrite",
            "--write-description",
            "--no-write-json",
            "--no-write-thumbnail",
            "--no-check-certificate",
            "--sleep-interval",
            "1",
            "--max-sleep-interval",
            "2.5",
            "-v",
            "x",
        ]);
        let config = cli.to_config().unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.download_archive, Some(PathBuf::from("archive.txt")));
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert_eq!(config.output_template, "{id}");
        assert_eq!(config.overwrite, OverwritePolicy::Clobber);
        assert!(config.write_description);
        assert!(!config.write_json);
        assert!(!config.write_thumbnail);
        assert!(!config.check_certificate);
        assert_eq!(config.max_sleep_interval, Duration::from_millis(2500));
        assert_eq!(cli.log_filter(), "debug");
    }

    #[test]
    fn test_quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["tiktok-dl", "-q", "-v", "x"]).is_err());
        assert_eq!(parse(&["-q", "x"]).log_filter(), "error");
        assert!(!parse(&["-q", "x"]).suppress_warnings());
    }

    #[test]
    fn test_no_warnings_keeps_info() {
        let cli = parse(&["--no-warnings", "x"]);
        assert_eq!(cli.log_filter(), "info");
        assert!(cli.suppress_warnings());
    }

    #[test]
    fn test_negative_sleep_is_rejected() {
        assert!(Cli::try_parse_from(["tiktok-dl", "--sleep-interval", "-1", "x"]).is_err());
    }

    #[test]
    fn test_invalid_template_is_a_config_error() {
        let cli = parse(&["-o", "{nope}", "x"]);
        assert!(matches!(cli.to_config(), Err(ConfigError::Template(_))));
    }

    #[test]
    fn test_read_batch_skips_comments() {
        let input = "\
https://www.tiktok.com/@a/video/1
# comment
; another
] and another

   https://www.tiktok.com/@b/video/2
";
        let urls = read_batch(input.as_bytes()).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.tiktok.com/@a/video/1",
                "https://www.tiktok.com/@b/video/2",
            ]
        );
    }

    #[test]
    fn test_collect_urls_merges_batch_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://www.tiktok.com/@b/video/2").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = parse(&["-i", &path, "https://www.tiktok.com/@a/video/1"]);
        let urls = cli.collect_urls().unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.tiktok.com/@a/video/1",
                "https://www.tiktok.com/@b/video/2",
            ]
        );
    }

    #[test]
    fn test_missing_batch_file_is_fatal() {
        let cli = parse(&["-i", "/nonexistent/urls.txt"]);
        assert!(matches!(
            cli.collect_urls(),
            Err(ConfigError::BatchFile { .. })
        ));
    }

    #[test]
    fn test_no_urls() {
        let cli = parse(&[]);
        assert!(matches!(cli.collect_urls(), Err(ConfigError::NoUrls)));
    }
}
