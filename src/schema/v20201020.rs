//! Late-2020 layout: `pageProps.itemInfo.itemStruct`.

use serde_json::{Map, Value};

use super::json::{copy_extra, first_strings, int_at, string_at};
use super::validate::{FieldRule, Kind, Schema};
use super::{ShapeMismatch, COMMON_FIELDS};
use crate::models::{RawMetadata, Video};

pub const VERSION: &str = "20201020";

pub const SCHEMA: Schema = Schema {
    fields: &[
        COMMON_FIELDS[0],
        COMMON_FIELDS[1],
        COMMON_FIELDS[2],
        COMMON_FIELDS[3],
        COMMON_FIELDS[4],
        COMMON_FIELDS[5],
        FieldRule::required("duration", Kind::Integer),
        FieldRule::required("author_unique_id", Kind::String),
        FieldRule::optional("width", Kind::Integer),
        FieldRule::optional("height", Kind::Integer),
        FieldRule::optional("music_id", Kind::String),
        FieldRule::optional("stats", Kind::Object),
    ],
};

pub fn extract(meta: &RawMetadata) -> Result<Video, ShapeMismatch> {
    let item = meta
        .get("itemInfo")
        .and_then(|info| info.get("itemStruct"))
        .filter(|v| v.is_object())
        .ok_or(ShapeMismatch("itemInfo.itemStruct object"))?;

    let id = string_at(item, "/id").ok_or(ShapeMismatch("itemStruct.id"))?;
    let create_time = int_at(item, "/createTime").ok_or(ShapeMismatch("itemStruct.createTime"))?;
    let user_id = string_at(item, "/author/id")
        .or_else(|| string_at(item, "/authorId"))
        .ok_or(ShapeMismatch("itemStruct.author.id"))?;

    let mut extra = Map::new();
    copy_extra(&mut extra, "duration", item.pointer("/video/duration"));
    copy_extra(&mut extra, "width", item.pointer("/video/width"));
    copy_extra(&mut extra, "height", item.pointer("/video/height"));
    copy_extra(&mut extra, "author_unique_id", item.pointer("/author/uniqueId"));
    copy_extra(&mut extra, "stats", item.get("stats"));
    if let Some(music_id) = string_at(item, "/music/id") {
        extra.insert("music_id".to_string(), Value::String(music_id));
    }

    Ok(Video {
        id,
        user_id,
        create_time,
        description: string_at(item, "/desc").unwrap_or_default(),
        play_urls: first_strings(item, &["/video/playAddr", "/video/downloadAddr"]),
        thumbnail_urls: first_strings(
            item,
            &["/video/originCover", "/video/cover", "/video/dynamicCover"],
        ),
        extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> RawMetadata {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_extract_item_struct() {
        let meta = meta(json!({
            "statusCode": 0,
            "itemInfo": {
                "itemStruct": {
                    "id": "6885000000000000000",
                    "desc": "new layout",
                    "createTime": 1_603_152_000,
                    "author": {"id": "42", "uniqueId": "creator"},
                    "music": {"id": "7"},
                    "stats": {"diggCount": 10, "playCount": 100},
                    "video": {
                        "playAddr": "https://v16.example.com/play.mp4",
                        "downloadAddr": "https://v16.example.com/download.mp4",
                        "cover": "https://p16.example.com/cover.jpeg",
                        "originCover": "https://p16.example.com/origin.jpeg",
                        "dynamicCover": "",
                        "duration": 12,
                        "width": 720,
                        "height": 1280
                    }
                }
            }
        }));

        let video = extract(&meta).unwrap();
        assert_eq!(video.id, "6885000000000000000");
        assert_eq!(video.user_id, "42");
        assert_eq!(video.create_time, 1_603_152_000);
        assert_eq!(
            video.play_urls,
            vec![
                "https://v16.example.com/play.mp4",
                "https://v16.example.com/download.mp4"
            ]
        );
        assert_eq!(
            video.thumbnail_urls,
            vec![
                "https://p16.example.com/origin.jpeg",
                "https://p16.example.com/cover.jpeg"
            ]
        );
        assert_eq!(video.extra["stats"]["playCount"], json!(100));
        assert_eq!(video.extra["music_id"], json!("7"));

        let record = serde_json::to_value(&video).unwrap();
        assert_eq!(SCHEMA.validate(&record), Ok(()));
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(extract(&meta(json!({"videoData": {"itemInfos": {}}}))).is_err());
        assert!(extract(&meta(json!({"itemInfo": {"itemStruct": {"id": "1"}}}))).is_err());
    }

    #[test]
    fn test_missing_duration_fails_schema() {
        let meta = meta(json!({
            "itemInfo": {"itemStruct": {
                "id": "1",
                "createTime": "10",
                "author": {"id": "2", "uniqueId": "u"},
                "video": {}
            }}
        }));
        let video = extract(&meta).unwrap();
        let record = serde_json::to_value(&video).unwrap();
        assert!(SCHEMA.validate(&record).is_err());
    }
}
