//! Declarative structural schemas for normalized video records.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Expected JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    /// Non-empty string of ASCII digits.
    NumericString,
    /// Integer `>= 0`.
    Timestamp,
    Integer,
    StringArray,
    Object,
}

impl Kind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::NumericString => value
                .as_str()
                .is_some_and(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())),
            Self::Timestamp => value.as_i64().is_some_and(|n| n >= 0),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Self::Object => value.is_object(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::NumericString => "numeric string",
            Self::Timestamp => "non-negative integer",
            Self::Integer => "integer",
            Self::StringArray => "array of strings",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// One field constraint.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
}

impl FieldRule {
    #[must_use]
    pub const fn required(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    #[must_use]
    pub const fn optional(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Violation {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    Missing(&'static str),
    #[error("field `{field}` must be a {expected}")]
    WrongType { field: &'static str, expected: Kind },
}

/// A set of field rules; unknown fields are allowed.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub fields: &'static [FieldRule],
}

impl Schema {
    /// Check a record against every rule, stopping at the first violation.
    ///
    /// # Errors
    ///
    /// Returns the first rule the record breaks.
    pub fn validate(&self, record: &Value) -> Result<(), Violation> {
        let object = record.as_object().ok_or(Violation::NotAnObject)?;
        for rule in self.fields {
            match object.get(rule.name) {
                None | Some(Value::Null) if rule.required => {
                    return Err(Violation::Missing(rule.name));
                }
                None | Some(Value::Null) => {}
                Some(value) if !rule.kind.accepts(value) => {
                    return Err(Violation::WrongType {
                        field: rule.name,
                        expected: rule.kind,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
