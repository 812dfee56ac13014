use crate::application::error::{ErrorReport, HttpError};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::domain::{
    posts::{ExternalOrigin, Post, PostMeta, format_human_date},
    text,
};

/// Column layout: every fifth card widens into a featured slot.
pub const FEATURED_OFFSET: usize = 0;
pub const FEATURED_INTERVAL: usize = 5;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub words: Vec<String>,
}

impl BrandView {
    /// Splits the site title into the stacked masthead words.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let words = title
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>();
        Self { title, words }
    }
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub tagline: Option<String>,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn with_canonical(self, canonical: Option<String>) -> Self {
        Self {
            meta: self.meta.with_canonical(canonical),
            ..self
        }
    }

    pub fn with_meta(self, meta: PageMetaView) -> Self {
        Self { meta, ..self }
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub canonical: Option<String>,
}

impl PageMetaView {
    pub fn with_canonical(self, canonical: Option<String>) -> Self {
        Self { canonical, ..self }
    }

    pub fn with_content(self, title: String, description: String) -> Self {
        Self {
            title,
            description,
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub tagline: Option<String>,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            tagline: chrome.tagline,
            meta: chrome.meta,
            content,
        }
    }
}

/// "Originally published on" attribution, linked when a URL is known.
#[derive(Clone, Debug, PartialEq)]
pub struct OriginView {
    pub name: String,
    pub url: Option<String>,
}

fn origin_view(origin: &ExternalOrigin) -> Option<OriginView> {
    origin.name.as_ref().map(|name| OriginView {
        name: name.clone(),
        url: origin.url.clone(),
    })
}

#[derive(Clone)]
pub struct PostCard {
    pub url: String,
    pub title: String,
    pub title_lines: Vec<String>,
    pub excerpt_html: String,
    pub variation: usize,
    pub is_headline: bool,
    pub is_featured: bool,
    pub is_pivot: bool,
    pub origin: Option<OriginView>,
}

/// Builds listing cards. The first card is the full-width headline with
/// its title broken into display lines; the second anchors the masonry
/// column width; every fifth after that is featured.
pub fn build_post_cards(posts: &[Post]) -> Vec<PostCard> {
    posts
        .iter()
        .enumerate()
        .map(|(index, post)| post_card(&post.meta, index))
        .collect()
}

fn post_card(meta: &PostMeta, index: usize) -> PostCard {
    let is_headline = index == 0;
    PostCard {
        url: format!("/blog/{}", meta.slug),
        title: meta.title.clone(),
        title_lines: if is_headline {
            text::generate_feature_title(&meta.title)
        } else {
            Vec::new()
        },
        excerpt_html: meta.excerpt.clone(),
        variation: text::title_variation(index),
        is_headline,
        is_featured: !is_headline && (index + FEATURED_OFFSET) % FEATURED_INTERVAL == 0,
        is_pivot: index == 1,
        origin: meta.external.as_ref().and_then(origin_view),
    }
}

/// The post grid plus what the pager needs: the page to fetch next and
/// the page size to fetch it with.
pub struct PostGridContext {
    pub cards: Vec<PostCard>,
    pub next_page: Option<u32>,
    pub page_size: u32,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<PostGridContext>,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub title: String,
    pub url: String,
}

#[derive(Clone)]
pub struct SeriesItemView {
    pub title: String,
    pub url: String,
    pub is_current: bool,
}

#[derive(Clone)]
pub struct SeriesBoxView {
    pub name: String,
    pub items: Vec<SeriesItemView>,
}

pub struct PostDetailContext {
    pub title: String,
    pub excerpt: String,
    pub published: String,
    pub origin: Option<OriginView>,
    pub audio: Option<String>,
    pub series: Option<SeriesBoxView>,
    pub preface_html: Option<String>,
    pub content_html: String,
    pub previous: Option<NavigationLinkView>,
    pub next: Option<NavigationLinkView>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Head back to the front page to keep reading.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

/// The detail header byline: the external publication date when there is
/// one, with the origin note when the source is also named; otherwise the
/// post's local date.
pub fn byline(meta: &PostMeta) -> (String, Option<OriginView>) {
    if let Some(external) = &meta.external {
        if let Some(date) = external.date.as_deref() {
            return (format_human_date(date), origin_view(external));
        }
    }
    (format_human_date(&meta.date), None)
}
