//! Media download and the worker pool that drives each URL through the
//! pipeline.

mod media;
mod pacing;
pub mod worker;

pub use media::{Downloaded, MediaDownloader, MediaError};
pub use pacing::SleepInterval;
pub use worker::{Outcome, Pipeline, RunSummary, Stage};
