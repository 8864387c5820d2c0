//! Wire-level coercions. Admin clients send some fields in more than one
//! shape; these map every accepted shape to one canonical value.

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Boolean sent as JSON `true`/`false` or as the strings `"true"`/`"false"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FlexBool {
    Bool(bool),
    Text(String),
    Other(serde_json::Value),
}

impl FlexBool {
    /// Anything unrecognised is `false`.
    pub fn value(&self) -> bool {
        match self {
            FlexBool::Bool(b) => *b,
            FlexBool::Text(s) => s.trim().eq_ignore_ascii_case("true"),
            FlexBool::Other(_) => false,
        }
    }
}

/// Tags as a list or as one comma-joined string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Text(String),
}

impl TagsInput {
    pub fn normalize(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => normalize_tags(tags.iter().map(String::as_str)),
            TagsInput::Text(joined) => split_tags(&joined),
        }
    }
}

pub fn split_tags(joined: &str) -> Vec<String> {
    normalize_tags(joined.split(','))
}

fn normalize_tags<'a>(tags: impl Iterator<Item = &'a str>) -> Vec<String> {
    tags.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Integer sent as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FlexInt {
    Int(i64),
    Text(String),
}

impl FlexInt {
    pub fn value(&self, field: &'static str) -> AppResult<i32> {
        let parsed = match self {
            FlexInt::Int(n) => i32::try_from(*n).ok(),
            FlexInt::Text(s) if s.trim().is_empty() => Some(0),
            FlexInt::Text(s) => s.trim().parse::<i32>().ok(),
        };
        parsed.ok_or_else(|| AppError::invalid(field, format!("{field} must be a whole number")))
    }
}
