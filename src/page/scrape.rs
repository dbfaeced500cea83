//! Extraction of the embedded `__NEXT_DATA__` payload from a video page.

use scraper::{Html, Selector};
use serde_json::Value;
use thiserror::Error;

use crate::constants::NEXT_DATA_SELECTOR;
use crate::models::{RawMetadata, VideoId};

static NEXT_DATA: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse(NEXT_DATA_SELECTOR).unwrap());

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{0}: embedded page data not found, the page layout may have changed")]
    MarkerNotFound(VideoId),
    #[error("{id}: failed to parse embedded page data: {source}")]
    MalformedJson {
        id: VideoId,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}: embedded page data has no props.pageProps object")]
    UnexpectedShape(VideoId),
    #[error("video not available {0}")]
    VideoUnavailable(VideoId),
}

/// Pull the `props.pageProps` object out of a video page.
///
/// # Errors
///
/// Each failure point has its own variant: missing marker, unparsable JSON,
/// missing `props.pageProps`, or a platform status code saying the video is
/// gone or private.
pub fn scrape(page: &str, id: &VideoId) -> Result<RawMetadata, ScrapeError> {
    let payload = {
        let document = Html::parse_document(page);
        document
            .select(&NEXT_DATA)
            .next()
            .map(|element| element.text().collect::<String>())
            .ok_or_else(|| ScrapeError::MarkerNotFound(id.clone()))?
    };

    let data: Value =
        serde_json::from_str(payload.trim()).map_err(|source| ScrapeError::MalformedJson {
            id: id.clone(),
            source,
        })?;

    let page_props = match data.pointer("/props/pageProps") {
        Some(Value::Object(map)) => map.clone(),
        _ => return Err(ScrapeError::UnexpectedShape(id.clone())),
    };

    if !status_is_ok(page_props.get("statusCode")) {
        return Err(ScrapeError::VideoUnavailable(id.clone()));
    }

    Ok(page_props)
}

/// `statusCode` is `0` for a viewable video; a missing field is accepted.
fn status_is_ok(status: Option<&Value>) -> bool {
    match status {
        None | Some(Value::Null) => true,
        Some(Value::Number(n)) => n.as_i64() == Some(0),
        Some(Value::String(s)) => s == "0" || s.eq_ignore_ascii_case("ok"),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(json: &str) -> String {
        format!(
            r#"<html><head></head><body>
<script id="__NEXT_DATA__" type="application/json" crossorigin="anonymous">{json}</script>
</body></html>"#
        )
    }

    fn id() -> VideoId {
        VideoId::new("123")
    }

    #[test]
    fn test_scrape_page_props() {
        let html = page(r#"{"props":{"pageProps":{"statusCode":0,"itemInfo":{}}}}"#);
        let meta = scrape(&html, &id()).unwrap();
        assert!(meta.contains_key("itemInfo"));
    }

    #[test]
    fn test_missing_marker() {
        let html = "<html><body><script>var x = 1;</script></body></html>";
        assert!(matches!(
            scrape(html, &id()),
            Err(ScrapeError::MarkerNotFound(_))
        ));

        // Right id, wrong type attribute.
        let html = r#"<script id="__NEXT_DATA__" type="text/javascript">{}</script>"#;
        assert!(matches!(
            scrape(html, &id()),
            Err(ScrapeError::MarkerNotFound(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        let html = page(r#"{"props": {"pageProps": "#);
        assert!(matches!(
            scrape(&html, &id()),
            Err(ScrapeError::MalformedJson { .. })
        ));
    }

    #[test]
    fn test_unexpected_shape() {
        for json in [
            r#"{"props":{}}"#,
            r#"{"props":{"pageProps":[]}}"#,
            r#"{"page":"/video"}"#,
        ] {
            assert!(matches!(
                scrape(&page(json), &id()),
                Err(ScrapeError::UnexpectedShape(_))
            ));
        }
    }

    #[test]
    fn test_video_unavailable() {
        let html = page(r#"{"props":{"pageProps":{"statusCode":10216}}}"#);
        match scrape(&html, &id()) {
            Err(ScrapeError::VideoUnavailable(vid)) => assert_eq!(vid.as_str(), "123"),
            other => panic!("expected VideoUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_status_codes() {
        assert!(status_is_ok(None));
        assert!(status_is_ok(Some(&serde_json::json!(0))));
        assert!(status_is_ok(Some(&serde_json::json!("ok"))));
        assert!(!status_is_ok(Some(&serde_json::json!(404))));
        assert!(!status_is_ok(Some(&serde_json::json!("private"))));
        assert!(!status_is_ok(Some(&serde_json::json!(true))));
    }
}
