//! Filesystem content store: directory scan, front matter parsing, and the
//! field derivation applied to every post on its way into the catalog.

use std::{fs, io, path::PathBuf, sync::Arc};

use serde::Deserialize;
use thiserror::Error;
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use tracing::warn;

use crate::domain::{
    posts::{self, ExternalOrigin, Post, PostMeta, QueuedFlag},
    text,
};

const FRONT_MATTER_DELIMITER: &str = "---";
const ISO_INSTANT_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

/// Supplies "now" for posts with no other date source. Injectable so the
/// load pass stays reproducible under test.
pub trait Clock: Send + Sync {
    fn now_iso(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_iso(&self) -> String {
        let now = OffsetDateTime::now_utc();
        now.format(ISO_INSTANT_FORMAT)
            .unwrap_or_else(|_| now.to_string())
    }
}

/// Why a content file was left out of the catalog.
#[derive(Debug, Error)]
pub enum PostParseError {
    #[error("failed to read file: {0}")]
    Read(#[from] io::Error),
    #[error("front matter is not valid YAML: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
}

/// Read access to the catalog's backing files. Every call re-reads disk;
/// the catalog is small enough that a cache would buy nothing.
pub trait ContentStore: Send + Sync {
    /// Parses every Markdown file in the content root, in enumeration
    /// order, with no filtering. Unparseable files are skipped.
    fn load_all(&self) -> Vec<Post>;

    /// Resolves `{slug}.md`. Missing and unparseable files both come back
    /// as `None`; `.mdx` posts are listed but have no detail view.
    fn load_by_slug(&self, slug: &str) -> Option<Post>;

    /// File-name slugs only, no parsing or filtering applied.
    fn list_slugs(&self) -> Vec<String>;
}

/// One file the scan could not turn into a post.
#[derive(Debug)]
pub struct SkippedFile {
    pub file_name: String,
    pub error: PostParseError,
}

/// Result of a full content directory scan, queued posts included.
#[derive(Debug, Default)]
pub struct ContentScan {
    pub posts: Vec<Post>,
    pub skipped: Vec<SkippedFile>,
}

pub struct FsContentStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FsContentStore {
    pub fn new(root: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self { root, clock }
    }

    /// Scans the content root, keeping both the parsed posts and the files
    /// that failed. An absent or unreadable root degrades to an empty scan.
    pub fn scan(&self) -> ContentScan {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) => {
                if error.kind() != io::ErrorKind::NotFound {
                    warn!(root = %self.root.display(), error = %error, "content root is unreadable");
                }
                return ContentScan::default();
            }
        };

        let mut scan = ContentScan::default();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(slug) = posts::slug_from_file_name(file_name) else {
                continue;
            };

            match read_and_parse(&entry.path(), slug, self.clock.as_ref()) {
                Ok(post) => scan.posts.push(post),
                Err(error) => scan.skipped.push(SkippedFile {
                    file_name: file_name.to_string(),
                    error,
                }),
            }
        }
        scan
    }
}

impl ContentStore for FsContentStore {
    fn load_all(&self) -> Vec<Post> {
        let scan = self.scan();
        for skipped in &scan.skipped {
            warn!(
                file = %skipped.file_name,
                error = %skipped.error,
                "skipping unparseable post"
            );
        }
        scan.posts
    }

    fn load_by_slug(&self, slug: &str) -> Option<Post> {
        // Slugs are file stems; a path separator would escape the root.
        if slug.contains(['/', '\\']) {
            return None;
        }

        let path = self.root.join(format!("{slug}.md"));
        let raw = fs::read_to_string(&path).ok()?;
        match parse_post(slug, &raw, self.clock.as_ref()) {
            Ok(post) => Some(post),
            Err(error) => {
                warn!(slug = %slug, error = %error, "failed to parse post");
                None
            }
        }
    }

    fn list_slugs(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        entries
            .flatten()
            .filter_map(|entry| {
                let file_name = entry.file_name();
                let file_name = file_name.to_str()?;
                posts::slug_from_file_name(file_name).map(str::to_string)
            })
            .collect()
    }
}

fn read_and_parse(
    path: &std::path::Path,
    slug: &str,
    clock: &dyn Clock,
) -> Result<Post, PostParseError> {
    let raw = fs::read_to_string(path)?;
    parse_post(slug, &raw, clock)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    title: Option<String>,
    date: Option<String>,
    tags: Vec<String>,
    excerpt: Option<String>,
    series: Option<String>,
    layout: Option<String>,
    external: Option<ExternalOrigin>,
    audio: Option<String>,
    queued: Option<QueuedFlag>,
    preface: Option<String>,
}

/// Parses one raw content file into a post, applying the derivation
/// fallbacks: title, then date (front matter, slug prefix, clock), then
/// excerpt (front matter, else cut from the body and tag-stripped).
pub fn parse_post(slug: &str, raw: &str, clock: &dyn Clock) -> Result<Post, PostParseError> {
    let (front, body) = split_front_matter(raw);
    let matter: FrontMatter = match front {
        Some(block) if !block.trim().is_empty() => serde_yaml::from_str(block)?,
        _ => FrontMatter::default(),
    };

    let title = matter
        .title
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| posts::UNTITLED_TITLE.to_string());

    let date = resolve_date(matter.date, slug, clock);

    let excerpt = match matter.excerpt.filter(|excerpt| !excerpt.is_empty()) {
        Some(explicit) => explicit,
        None => {
            let cut = text::create_excerpt(body, text::EXCERPT_LENGTH).replace('\n', "");
            text::strip_tags(&cut, text::EXCERPT_ALLOWED_TAGS)
        }
    };

    let layout = matter
        .layout
        .filter(|layout| !layout.is_empty())
        .unwrap_or_else(|| posts::DEFAULT_LAYOUT.to_string());

    Ok(Post {
        meta: PostMeta {
            slug: slug.to_string(),
            title,
            date,
            tags: matter.tags,
            excerpt,
            series: matter.series,
            layout,
            external: matter.external,
            audio: matter.audio,
            queued: matter.queued,
            preface: matter.preface,
        },
        content: body.to_string(),
    })
}

fn resolve_date(explicit: Option<String>, slug: &str, clock: &dyn Clock) -> String {
    if let Some(date) = explicit.filter(|date| !date.is_empty()) {
        return date;
    }
    match posts::date_prefix(slug) {
        Some(prefix) => format!("{prefix}T00:00:00.000Z"),
        None => clock.now_iso(),
    }
}

/// Splits a leading `---` delimited YAML block from the body. Files
/// without one, or with an unterminated one, are all body.
fn split_front_matter(raw: &str) -> (Option<&str>, &str) {
    let Some(after_open) = raw.strip_prefix(FRONT_MATTER_DELIMITER) else {
        return (None, raw);
    };
    let block = if let Some(rest) = after_open.strip_prefix("\r\n") {
        rest
    } else if let Some(rest) = after_open.strip_prefix('\n') {
        rest
    } else {
        return (None, raw);
    };

    // A close on the very next line is an empty block, not a missing one.
    if let Some(after_close) = block.strip_prefix(FRONT_MATTER_DELIMITER) {
        if let Some(body) = body_after_close(after_close) {
            return (Some(""), body);
        }
    }

    let mut search_from = 0;
    while let Some(found) = block[search_from..].find("\n---") {
        let close = search_from + found;
        if let Some(body) = body_after_close(&block[close + 4..]) {
            return (Some(&block[..close]), body);
        }
        search_from = close + 4;
    }

    (None, raw)
}

/// A `---` only closes the block when it ends its line; returns the body
/// that follows it.
fn body_after_close(after_close: &str) -> Option<&str> {
    let after_close = after_close.strip_prefix('\r').unwrap_or(after_close);
    if after_close.is_empty() {
        return Some("");
    }
    after_close.strip_prefix('\n')
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    struct FixedClock(&'static str);

    impl Clock for FixedClock {
        fn now_iso(&self) -> String {
            self.0.to_string()
        }
    }

    fn fixed_clock() -> FixedClock {
        FixedClock("2026-03-01T12:00:00.000Z")
    }

    #[test]
    fn parses_front_matter_and_body() {
        let raw = "---\ntitle: Hello\ndate: 2024-05-01\ntags:\n  - rust\n  - web\n---\nBody text.\n";
        let post = parse_post("hello", raw, &fixed_clock()).expect("parse");

        assert_eq!(post.meta.title, "Hello");
        assert_eq!(post.meta.date, "2024-05-01");
        assert_eq!(post.meta.tags, vec!["rust", "web"]);
        assert_eq!(post.meta.layout, "post");
        assert_eq!(post.content, "Body text.\n");
    }

    #[test]
    fn title_falls_back_to_untitled() {
        let post = parse_post("x", "---\ndate: 2024-01-01\n---\nBody", &fixed_clock())
            .expect("parse");
        assert_eq!(post.meta.title, "Untitled");
    }

    #[test]
    fn date_falls_back_to_slug_prefix_then_clock() {
        let from_slug = parse_post("2024-01-15-hello", "Body only", &fixed_clock()).expect("parse");
        assert_eq!(from_slug.meta.date, "2024-01-15T00:00:00.000Z");

        let from_clock = parse_post("hello", "Body only", &fixed_clock()).expect("parse");
        assert_eq!(from_clock.meta.date, "2026-03-01T12:00:00.000Z");
    }

    #[test]
    fn front_matter_date_beats_slug_prefix() {
        let raw = "---\ndate: 2020-09-09T08:00:00.000Z\n---\nBody";
        let post = parse_post("2024-01-15-hello", raw, &fixed_clock()).expect("parse");
        assert_eq!(post.meta.date, "2020-09-09T08:00:00.000Z");
    }

    #[test]
    fn explicit_excerpt_bypasses_derivation() {
        let raw = "---\nexcerpt: \"Hand <em>written</em>\"\n---\n<div>deriving would strip this</div>";
        let post = parse_post("x", raw, &fixed_clock()).expect("parse");
        assert_eq!(post.meta.excerpt, "Hand <em>written</em>");
    }

    #[test]
    fn derived_excerpt_is_cut_unwrapped_and_stripped() {
        let raw = "First <b>line</b>\nsecond <em>line</em><!--more-->The rest is never read.";
        let post = parse_post("x", raw, &fixed_clock()).expect("parse");
        assert_eq!(post.meta.excerpt, "First linesecond <em>line</em>");
    }

    #[test]
    fn queued_accepts_flags_and_labels() {
        let flagged = parse_post("x", "---\nqueued: true\n---\nBody", &fixed_clock()).expect("parse");
        assert!(flagged.meta.is_queued());

        let labeled =
            parse_post("x", "---\nqueued: 2025-01-01\n---\nBody", &fixed_clock()).expect("parse");
        assert!(labeled.meta.is_queued());
        assert_eq!(
            labeled.meta.queued,
            Some(QueuedFlag::Label("2025-01-01".to_string()))
        );

        let unset = parse_post("x", "---\nqueued: false\n---\nBody", &fixed_clock()).expect("parse");
        assert!(!unset.meta.is_queued());
    }

    #[test]
    fn file_without_front_matter_is_all_body() {
        let post = parse_post("plain", "Just text, no header.", &fixed_clock()).expect("parse");
        assert_eq!(post.meta.title, "Untitled");
        assert_eq!(post.content, "Just text, no header.");
    }

    #[test]
    fn unterminated_front_matter_is_treated_as_body() {
        let raw = "---\ntitle: Broken\nNo closing delimiter";
        let post = parse_post("x", raw, &fixed_clock()).expect("parse");
        assert_eq!(post.meta.title, "Untitled");
        assert_eq!(post.content, raw);
    }

    #[test]
    fn empty_front_matter_block_keeps_delimiters_out_of_the_body() {
        let post = parse_post("x", "---\n---\nJust the body.\n", &fixed_clock()).expect("parse");
        assert_eq!(post.meta.title, "Untitled");
        assert_eq!(post.content, "Just the body.\n");
        assert_eq!(post.meta.excerpt, "Just the body.");

        let bare = parse_post("x", "---\n---", &fixed_clock()).expect("parse");
        assert_eq!(bare.content, "");
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let raw = "---\ntitle: [unclosed\n---\nBody";
        let error = parse_post("x", raw, &fixed_clock()).expect_err("invalid yaml");
        assert!(matches!(error, PostParseError::FrontMatter(_)));
    }

    #[test]
    fn store_scans_markdown_files_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("first.md"), "---\ntitle: First\ndate: 2024-01-01\n---\nA").unwrap();
        fs::write(dir.path().join("second.mdx"), "---\ntitle: Second\ndate: 2024-01-02\n---\nB").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a post").unwrap();
        fs::write(dir.path().join("broken.md"), "---\ntitle: [oops\n---\nC").unwrap();

        let store = FsContentStore::new(dir.path().to_path_buf(), Arc::new(fixed_clock()));

        let scan = store.scan();
        assert_eq!(scan.posts.len(), 2);
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].file_name, "broken.md");

        let mut slugs = store.list_slugs();
        slugs.sort();
        assert_eq!(slugs, vec!["broken", "first", "second"]);
    }

    #[test]
    fn store_resolves_detail_lookups_from_md_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("listed.mdx"), "---\ntitle: Listed\n---\nA").unwrap();
        fs::write(dir.path().join("readable.md"), "---\ntitle: Readable\n---\nB").unwrap();

        let store = FsContentStore::new(dir.path().to_path_buf(), Arc::new(fixed_clock()));

        assert!(store.load_by_slug("readable").is_some());
        assert!(store.load_by_slug("listed").is_none());
        assert!(store.load_by_slug("missing").is_none());
        assert!(store.load_by_slug("../readable").is_none());
    }

    #[test]
    fn absent_root_degrades_to_empty() {
        let store = FsContentStore::new(
            PathBuf::from("/nonexistent/folio-posts"),
            Arc::new(fixed_clock()),
        );
        assert!(store.load_all().is_empty());
        assert!(store.list_slugs().is_empty());
        assert!(store.load_by_slug("anything").is_none());
    }
}
