//! Shared constants used across the application.

/// User agent string sent with every page and media request.
///
/// TikTok serves the `__NEXT_DATA__` payload only to clients that look like a
/// desktop browser.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/83.0.4103.44 Safari/537.36";

/// Default pattern for extracting a video id from a TikTok URL.
pub const DEFAULT_URL_PATTERN: &str =
    r"^https?://www\.tiktokv?\.com/(?:@[\w._]+|share)/video/(?P<id>\d+)";

/// Selector for the embedded Next.js page data.
pub const NEXT_DATA_SELECTOR: &str = r#"script#__NEXT_DATA__[type="application/json"]"#;

/// Default output template, `{Y}-{d}-{m}_{H}-{M}-{S} {id}_{user_id}`.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "{Y}-{d}-{m}_{H}-{M}-{S} {id}_{user_id}";

/// Timeout for a single page fetch, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Timeout for a single media download, in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 160;
