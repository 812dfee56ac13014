//! folio is a file-backed blog engine. It scans a directory of Markdown
//! posts with YAML front matter, derives the fields authors left out, and
//! serves the result as a paginated front page with search and per-post
//! navigation.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
