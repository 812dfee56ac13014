//! Markdown rendering for post bodies and prefaces.

use comrak::options::Options;
use once_cell::sync::Lazy;

/// Authors close a post with this marker; it renders as an end-of-proof
/// sign rather than a comment.
pub const TOMB_MARKER: &str = "<!--tomb-->";
const TOMB_REPLACEMENT: &str = " &#8718;";

static OPTIONS: Lazy<Options<'static>> = Lazy::new(default_options);

/// Renders author-owned Markdown to HTML. Raw HTML passes through
/// untouched; the content directory is trusted.
pub fn markdown_to_html(markdown: &str) -> String {
    comrak::markdown_to_html(markdown, &OPTIONS)
}

/// Renders a post body, swapping the first tomb marker for the
/// end-of-proof sign before the Markdown pass.
pub fn post_body_to_html(content: &str) -> String {
    let content = content.replacen(TOMB_MARKER, TOMB_REPLACEMENT, 1);
    markdown_to_html(&content)
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.header_ids = Some(String::new());

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = true;
    render.gfm_quirks = true;

    options
}
