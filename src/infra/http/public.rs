use std::{num::NonZeroU32, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    application::{
        catalog::{CatalogService, SearchEntry},
        error::HttpError,
    },
    config::SiteSettings,
    domain::posts::PostMeta,
    infra::assets,
    presentation::views::{
        BrandView, IndexTemplate, LayoutChrome, LayoutContext, PageMetaView, PostDetailContext,
        PostTemplate, render_not_found_response, render_template_response,
    },
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub catalog: Arc<CatalogService>,
    pub chrome: LayoutChrome,
    pub page_size: NonZeroU32,
    pub base_url: Option<String>,
}

impl HttpState {
    pub fn new(catalog: Arc<CatalogService>, site: &SiteSettings, page_size: NonZeroU32) -> Self {
        Self {
            catalog,
            chrome: site_chrome(site),
            page_size,
            base_url: site.base_url.clone(),
        }
    }
}

fn site_chrome(site: &SiteSettings) -> LayoutChrome {
    LayoutChrome {
        brand: BrandView::new(site.title.clone()),
        tagline: site.tagline.clone(),
        meta: PageMetaView {
            title: site.title.clone(),
            description: site.tagline.clone().unwrap_or_default(),
            canonical: None,
        },
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/page/{number}", get(archive))
        .route("/blog/{slug}", get(post_detail))
        .route("/api/posts", get(api_posts))
        .route("/api/search", get(api_search))
        .route("/static/{*path}", get(assets::serve_static))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(State(state): State<HttpState>) -> Response {
    let content = state.catalog.front_page(state.page_size);
    let canonical = canonical_url(state.base_url.as_deref(), "/");
    let view = LayoutContext::new(state.chrome.clone().with_canonical(canonical), content);
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

async fn archive(State(state): State<HttpState>, Path(number): Path<String>) -> Response {
    // Only `/page/2` and beyond exist; page one lives at the root.
    let page = match number.parse::<u32>() {
        Ok(page) if page >= 2 => page,
        _ => return render_not_found_response(state.chrome.clone()),
    };

    match state.catalog.archive_page(page, state.page_size) {
        Some(content) => {
            let canonical = canonical_url(state.base_url.as_deref(), &format!("/page/{page}"));
            let meta = archive_meta(&state.chrome, page, canonical);
            let view = LayoutContext::new(state.chrome.clone().with_meta(meta), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        None => render_not_found_response(state.chrome.clone()),
    }
}

async fn post_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    match state.catalog.post_detail(&slug) {
        Some(content) => {
            let canonical = canonical_url(state.base_url.as_deref(), &format!("/blog/{slug}"));
            let meta = post_meta(&state.chrome, &content, canonical);
            let view = LayoutContext::new(state.chrome.clone().with_meta(meta), content);
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        None => render_not_found_response(state.chrome.clone()),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostsQuery {
    page: Option<u32>,
    #[serde(rename = "pageSize")]
    page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostsEnvelope {
    posts: Vec<PostMeta>,
    total_pages: u32,
    current_page: u32,
    has_next: bool,
    has_previous: bool,
}

async fn api_posts(
    State(state): State<HttpState>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<PostsEnvelope>, HttpError> {
    const SOURCE: &str = "infra::http::public::api_posts";

    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Err(HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid page number",
            "page must be at least 1",
        ));
    }

    let page_size = match query.page_size {
        None => state.page_size,
        Some(value) => NonZeroU32::new(value).ok_or_else(|| {
            HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid page size",
                "pageSize must be at least 1",
            )
        })?,
    };

    let page = state.catalog.paginated(page, page_size);
    Ok(Json(PostsEnvelope {
        posts: page.items.into_iter().map(|post| post.meta).collect(),
        total_pages: page.total_pages,
        current_page: page.current_page,
        has_next: page.has_next,
        has_previous: page.has_previous,
    }))
}

async fn api_search(State(state): State<HttpState>) -> Json<Vec<SearchEntry>> {
    Json(state.catalog.search_entries())
}

async fn fallback(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.chrome.clone())
}

fn post_meta(
    chrome: &LayoutChrome,
    content: &PostDetailContext,
    canonical: Option<String>,
) -> PageMetaView {
    let description = if content.excerpt.is_empty() {
        content.title.clone()
    } else {
        content.excerpt.clone()
    };

    chrome.meta.clone().with_canonical(canonical).with_content(
        format!("{} | {}", content.title, chrome.brand.title),
        description,
    )
}

fn archive_meta(chrome: &LayoutChrome, page: u32, canonical: Option<String>) -> PageMetaView {
    chrome.meta.clone().with_canonical(canonical).with_content(
        format!("Page {page} | {}", chrome.brand.title),
        chrome.meta.description.clone(),
    )
}

fn canonical_url(base: Option<&str>, path: &str) -> Option<String> {
    base.map(|base| format!("{base}{path}"))
}
