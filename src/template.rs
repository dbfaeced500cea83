//! Output filename templates such as `{Y}-{m}-{d} {id}`.

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Timelike, Utc};
use thiserror::Error;

use crate::models::Video;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown field `{0}` in output template")]
    UnknownField(String),
    #[error("unmatched `{brace}` at byte {position} in output template")]
    UnbalancedBrace { brace: char, position: usize },
    #[error("output template renders an empty path")]
    Empty,
    #[error("create_time {0} is out of range")]
    InvalidTimestamp(i64),
}

/// A placeholder a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    UserId,
    CreateTime,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "id" => Self::Id,
            "user_id" => Self::UserId,
            "create_time" => Self::CreateTime,
            "Y" => Self::Year,
            "m" => Self::Month,
            "d" => Self::Day,
            "H" => Self::Hour,
            "M" => Self::Minute,
            "S" => Self::Second,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed output template.
///
/// Parsing happens once at startup so unknown fields are reported before any
/// network activity. Rendering yields a relative path fragment without an
/// extension or output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    segments: Vec<Segment>,
}

impl OutputTemplate {
    /// Parse a template. `{{` and `}}` produce literal braces.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown fields, unbalanced braces, or an empty
    /// template.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace {
                            brace: '{',
                            position,
                        });
                    }
                    let field =
                        Field::parse(&name).ok_or_else(|| TemplateError::UnknownField(name))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    return Err(TemplateError::UnbalancedBrace {
                        brace: '}',
                        position,
                    });
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        if segments.is_empty() {
            return Err(TemplateError::Empty);
        }

        Ok(Self { segments })
    }

    /// Render the template for a video. Time fields are in UTC.
    ///
    /// # Errors
    ///
    /// Returns an error if `create_time` cannot be represented as a date or
    /// the result is empty.
    pub fn render(&self, video: &Video) -> Result<String, TemplateError> {
        let created: DateTime<Utc> = DateTime::from_timestamp(video.create_time, 0)
            .ok_or(TemplateError::InvalidTimestamp(video.create_time))?;

        let mut out = String::new();
        for segment in &self.segments {
            // Writing to a String cannot fail.
            let _ = match segment {
                Segment::Literal(text) => write!(out, "{text}"),
                Segment::Field(Field::Id) => write!(out, "{}", sanitize_component(&video.id)),
                Segment::Field(Field::UserId) => {
                    write!(out, "{}", sanitize_component(&video.user_id))
                }
                Segment::Field(Field::CreateTime) => write!(out, "{}", video.create_time),
                Segment::Field(Field::Year) => write!(out, "{:04}", created.year()),
                Segment::Field(Field::Month) => write!(out, "{:02}", created.month()),
                Segment::Field(Field::Day) => write!(out, "{:02}", created.day()),
                Segment::Field(Field::Hour) => write!(out, "{:02}", created.hour()),
                Segment::Field(Field::Minute) => write!(out, "{:02}", created.minute()),
                Segment::Field(Field::Second) => write!(out, "{:02}", created.second()),
            };
        }

        if out.trim().is_empty() {
            return Err(TemplateError::Empty);
        }
        Ok(out)
    }
}

/// Make a page-supplied value safe to use inside one path component.
///
/// Separators, drive colons and control characters become `_`, and a value
/// made only of dots cannot name a parent or current directory.
fn sanitize_component(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if !sanitized.is_empty() && sanitized.chars().all(|c| c == '.') {
        return "_".repeat(sanitized.len());
    }
    sanitized
}

/// Parse and render in one step.
///
/// # Errors
///
/// See [`OutputTemplate::parse`] and [`OutputTemplate::render`].
pub fn format_path(template: &str, video: &Video) -> Result<String, TemplateError> {
    OutputTemplate::parse(template)?.render(video)
}
