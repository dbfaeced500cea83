//! Everything up to and including the raw page metadata: URL → id, page
//! download, and `__NEXT_DATA__` scraping.

mod fetch;
mod resolve;
mod scrape;

pub use fetch::{build_http_client, FetchError, PageFetcher};
pub use resolve::{IdResolver, PatternError, ResolveError};
pub use scrape::{scrape, ScrapeError};
