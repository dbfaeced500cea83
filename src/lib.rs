//! TikTok downloader library.
//!
//! Resolves video URLs to ids, scrapes the metadata embedded in each video
//! page, normalizes it through versioned extractors, and downloads the video,
//! thumbnail and a metadata sidecar into a deduplicating archive.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod archive;
pub mod archiver;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod page;
pub mod schema;
pub mod template;
