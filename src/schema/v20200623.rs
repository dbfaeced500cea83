//! Mid-2020 layout: `pageProps.videoData.itemInfos` plus `authorInfos`.

use serde_json::{Map, Value};

use super::json::{copy_extra, int_at, string_at, string_list_at};
use super::validate::{FieldRule, Kind, Schema};
use super::{ShapeMismatch, COMMON_FIELDS};
use crate::models::{RawMetadata, Video};

pub const VERSION: &str = "20200623";

pub const SCHEMA: Schema = Schema {
    fields: &[
        COMMON_FIELDS[0],
        COMMON_FIELDS[1],
        COMMON_FIELDS[2],
        COMMON_FIELDS[3],
        COMMON_FIELDS[4],
        COMMON_FIELDS[5],
        FieldRule::optional("duration", Kind::Integer),
        FieldRule::optional("width", Kind::Integer),
        FieldRule::optional("height", Kind::Integer),
        FieldRule::optional("author_unique_id", Kind::String),
        FieldRule::optional("music_id", Kind::String),
    ],
};

pub fn extract(meta: &RawMetadata) -> Result<Video, ShapeMismatch> {
    let data = meta
        .get("videoData")
        .filter(|v| v.is_object())
        .ok_or(ShapeMismatch("videoData object"))?;
    let item = data
        .get("itemInfos")
        .filter(|v| v.is_object())
        .ok_or(ShapeMismatch("videoData.itemInfos object"))?;

    let id = string_at(item, "/id").ok_or(ShapeMismatch("itemInfos.id"))?;
    let create_time = int_at(item, "/createTime").ok_or(ShapeMismatch("itemInfos.createTime"))?;
    let user_id = string_at(item, "/authorId")
        .or_else(|| string_at(data, "/authorInfos/userId"))
        .ok_or(ShapeMismatch("itemInfos.authorId"))?;

    let mut thumbnail_urls = string_list_at(item, "/coversOrigin");
    for cover in string_list_at(item, "/covers") {
        if !thumbnail_urls.contains(&cover) {
            thumbnail_urls.push(cover);
        }
    }

    let mut extra = Map::new();
    copy_extra(&mut extra, "duration", item.pointer("/video/videoMeta/duration"));
    copy_extra(&mut extra, "width", item.pointer("/video/videoMeta/width"));
    copy_extra(&mut extra, "height", item.pointer("/video/videoMeta/height"));
    copy_extra(
        &mut extra,
        "author_unique_id",
        data.pointer("/authorInfos/uniqueId"),
    );
    if let Some(music_id) = string_at(item, "/musicId") {
        extra.insert("music_id".to_string(), Value::String(music_id));
    }

    Ok(Video {
        id,
        user_id,
        create_time,
        description: string_at(item, "/text").unwrap_or_default(),
        play_urls: string_list_at(item, "/video/urls"),
        thumbnail_urls,
        extra,
    })
}
