//! Post records and the derivation rules the catalog applies while loading
//! them from disk.

use serde::{Deserialize, Serialize};
use time::{Date, format_description::FormatItem, macros::format_description};

pub const UNTITLED_TITLE: &str = "Untitled";
pub const DEFAULT_LAYOUT: &str = "post";

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
const DATE_ONLY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Provenance of a post that first appeared on another site.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExternalOrigin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// The `queued` front matter key takes either a bare flag or a free-form
/// label, conventionally the date the post is expected to go live.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum QueuedFlag {
    Flag(bool),
    Label(String),
}

impl QueuedFlag {
    /// `false` and the empty string both count as "not queued".
    pub fn is_set(&self) -> bool {
        match self {
            QueuedFlag::Flag(flag) => *flag,
            QueuedFlag::Label(label) => !label.is_empty(),
        }
    }
}

/// Listing-level view of a post. Every field is populated during catalog
/// load; the derivation fallbacks live in the content store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostMeta {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub tags: Vec<String>,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    pub layout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalOrigin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued: Option<QueuedFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preface: Option<String>,
}

impl PostMeta {
    pub fn is_queued(&self) -> bool {
        self.queued.as_ref().is_some_and(QueuedFlag::is_set)
    }
}

/// A post together with its Markdown body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    #[serde(flatten)]
    pub meta: PostMeta,
    pub content: String,
}

/// Maps a content file name to its slug. Returns `None` for files the
/// catalog does not treat as posts.
pub fn slug_from_file_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(".md")
        .or_else(|| file_name.strip_suffix(".mdx"))
}

/// Extracts a leading `YYYY-MM-DD` token from a slug. Only the shape is
/// checked; the token is not validated as a calendar date.
pub fn date_prefix(slug: &str) -> Option<&str> {
    let token = slug.get(..10)?;
    let bytes = token.as_bytes();
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    (digits(0..4) && bytes[4] == b'-' && digits(5..7) && bytes[7] == b'-' && digits(8..10))
        .then_some(token)
}

/// Formats an ISO-8601 timestamp or bare date as "Month D, YYYY". Values
/// without a parseable date come back untouched.
pub fn format_human_date(value: &str) -> String {
    let date_part = value.get(..10).unwrap_or(value);
    match Date::parse(date_part, DATE_ONLY_FORMAT) {
        Ok(date) => date
            .format(HUMAN_DATE_FORMAT)
            .unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}
