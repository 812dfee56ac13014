//! Catalog queries: the filtered, ordered view of the content store that
//! every public surface reads from.

use std::{num::NonZeroU32, sync::Arc};

use serde::Serialize;

use crate::{
    application::{
        pagination::{self, Page},
        render,
    },
    domain::posts::{DEFAULT_LAYOUT, Post},
    infra::content::ContentStore,
    presentation::views::{
        self, NavigationLinkView, PostDetailContext, PostGridContext, SeriesBoxView,
        SeriesItemView,
    },
};

/// A neighbouring post link on the detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationLink {
    pub title: String,
    pub url: String,
}

/// A post and its neighbours in the reverse chronological article list.
#[derive(Debug)]
pub struct PostWithNavigation {
    pub post: Post,
    pub previous: Option<NavigationLink>,
    pub next: Option<NavigationLink>,
}

/// One row of the search index served to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEntry {
    pub title: String,
    pub tags: String,
    pub url: String,
    pub date: String,
    pub excerpt: String,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ContentStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Every published post, newest first. Queued posts are filtered out
    /// here and nowhere else; ties keep the store's enumeration order.
    pub fn all_posts(&self) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .store
            .load_all()
            .into_iter()
            .filter(|post| !post.meta.is_queued())
            .collect();
        posts.sort_by(|a, b| b.meta.date.cmp(&a.meta.date));
        posts
    }

    /// Direct detail lookup. Queued posts resolve here even though they
    /// never appear in a listing.
    pub fn post_by_slug(&self, slug: &str) -> Option<Post> {
        self.store.load_by_slug(slug)
    }

    /// Detail lookup plus previous/next links over the article list
    /// (layout "post", queued excluded). A post outside that list gets no
    /// next link and the newest article as previous.
    pub fn post_with_navigation(&self, slug: &str) -> Option<PostWithNavigation> {
        let post = self.store.load_by_slug(slug)?;
        let articles: Vec<Post> = self
            .all_posts()
            .into_iter()
            .filter(|candidate| candidate.meta.layout == DEFAULT_LAYOUT)
            .collect();

        let index = articles
            .iter()
            .position(|candidate| candidate.meta.slug == slug)
            .map_or(-1, |found| found as isize);

        // The list runs newest first, so "next" is the newer neighbour.
        let next = (index > 0).then(|| navigation_link(&articles[(index - 1) as usize]));
        let previous = (index < articles.len() as isize - 1)
            .then(|| navigation_link(&articles[(index + 1) as usize]));

        Some(PostWithNavigation {
            post,
            previous,
            next,
        })
    }

    /// Posts in the named series, catalog order.
    pub fn series_posts(&self, name: &str) -> Vec<Post> {
        self.all_posts()
            .into_iter()
            .filter(|post| post.meta.series.as_deref() == Some(name))
            .collect()
    }

    /// Series names in the order the catalog first mentions them.
    pub fn all_series(&self) -> Vec<String> {
        let mut series = Vec::new();
        for post in self.all_posts() {
            if let Some(name) = post.meta.series {
                if !series.contains(&name) {
                    series.push(name);
                }
            }
        }
        series
    }

    /// Slugs straight off the file names; unparseable files included.
    pub fn all_slugs(&self) -> Vec<String> {
        self.store.list_slugs()
    }

    /// The flat index rows the search client filters on.
    pub fn search_entries(&self) -> Vec<SearchEntry> {
        self.all_posts()
            .into_iter()
            .map(|post| {
                let meta = post.meta;
                SearchEntry {
                    tags: meta.tags.join(", "),
                    url: format!("/blog/{}", meta.slug),
                    title: meta.title,
                    date: meta.date,
                    excerpt: meta.excerpt,
                }
            })
            .collect()
    }

    pub fn paginated(&self, page: u32, page_size: NonZeroU32) -> Page<Post> {
        pagination::paginate(&self.all_posts(), page, page_size)
    }

    /// Pages 1 through `page` concatenated, for the archive route that
    /// mirrors what load-more leaves on screen. Pager flags describe the
    /// last page fetched.
    pub fn accumulated(&self, page: u32, page_size: NonZeroU32) -> Page<Post> {
        let posts = self.all_posts();
        let mut tail = pagination::paginate(&posts, page, page_size);
        let mut items = Vec::new();
        for number in 1..page {
            items.extend(pagination::paginate(&posts, number, page_size).items);
        }
        items.append(&mut tail.items);
        tail.items = items;
        tail
    }

    /// The landing grid: page one of the catalog.
    pub fn front_page(&self, page_size: NonZeroU32) -> PostGridContext {
        grid_context(self.paginated(1, page_size), page_size)
    }

    /// The grid for `/page/{number}`: everything load-more would have
    /// put on screen by that page. `None` past the end of the catalog.
    pub fn archive_page(&self, page: u32, page_size: NonZeroU32) -> Option<PostGridContext> {
        let accumulated = self.accumulated(page, page_size);
        if page > accumulated.total_pages {
            return None;
        }
        Some(grid_context(accumulated, page_size))
    }

    /// The full detail context for a post page, or `None` when no file
    /// with that slug exists.
    pub fn post_detail(&self, slug: &str) -> Option<PostDetailContext> {
        self.post_with_navigation(slug)
            .map(|found| self.detail_context(found))
    }

    fn detail_context(&self, found: PostWithNavigation) -> PostDetailContext {
        let PostWithNavigation {
            post,
            previous,
            next,
        } = found;
        let Post { meta, content } = post;

        let (published, origin) = views::byline(&meta);
        let series = meta
            .series
            .as_deref()
            .and_then(|name| self.series_box(name, &meta.slug));
        let preface_html = meta.preface.as_deref().map(render::markdown_to_html);

        PostDetailContext {
            title: meta.title,
            excerpt: meta.excerpt,
            published,
            origin,
            audio: meta.audio,
            series,
            preface_html,
            content_html: render::post_body_to_html(&content),
            previous: previous.map(navigation_link_view),
            next: next.map(navigation_link_view),
        }
    }

    fn series_box(&self, name: &str, current_slug: &str) -> Option<SeriesBoxView> {
        let posts = self.series_posts(name);
        if posts.is_empty() {
            return None;
        }
        let items = posts
            .into_iter()
            .map(|post| {
                let meta = post.meta;
                SeriesItemView {
                    is_current: meta.slug == current_slug,
                    url: format!("/blog/{}", meta.slug),
                    title: meta.title,
                }
            })
            .collect();
        Some(SeriesBoxView {
            name: name.to_string(),
            items,
        })
    }
}

fn grid_context(page: Page<Post>, page_size: NonZeroU32) -> PostGridContext {
    PostGridContext {
        cards: views::build_post_cards(&page.items),
        next_page: page.has_next.then(|| page.current_page + 1),
        page_size: page_size.get(),
    }
}

fn navigation_link_view(link: NavigationLink) -> NavigationLinkView {
    NavigationLinkView {
        title: link.title,
        url: link.url,
    }
}

fn navigation_link(post: &Post) -> NavigationLink {
    NavigationLink {
        title: post.meta.title.clone(),
        url: format!("/blog/{}", post.meta.slug),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::posts::{PostMeta, QueuedFlag};

    struct StaticStore {
        posts: Vec<Post>,
    }

    impl ContentStore for StaticStore {
        fn load_all(&self) -> Vec<Post> {
            self.posts.clone()
        }

        fn load_by_slug(&self, slug: &str) -> Option<Post> {
            self.posts
                .iter()
                .find(|post| post.meta.slug == slug)
                .cloned()
        }

        fn list_slugs(&self) -> Vec<String> {
            self.posts
                .iter()
                .map(|post| post.meta.slug.clone())
                .collect()
        }
    }

    fn post(slug: &str, date: &str) -> Post {
        Post {
            meta: PostMeta {
                slug: slug.to_string(),
                title: format!("Title {slug}"),
                date: date.to_string(),
                tags: Vec::new(),
                excerpt: String::new(),
                series: None,
                layout: DEFAULT_LAYOUT.to_string(),
                external: None,
                audio: None,
                queued: None,
                preface: None,
            },
            content: String::new(),
        }
    }

    fn service(posts: Vec<Post>) -> CatalogService {
        CatalogService::new(Arc::new(StaticStore { posts }))
    }

    fn page_size(size: u32) -> NonZeroU32 {
        NonZeroU32::new(size).expect("non-zero page size")
    }

    #[test]
    fn all_posts_drops_queued_and_sorts_newest_first() {
        let mut queued = post("queued", "2024-02-01");
        queued.meta.queued = Some(QueuedFlag::Flag(true));
        let catalog = service(vec![post("old", "2024-01-01"), queued, post("new", "2024-03-01")]);

        let slugs: Vec<_> = catalog
            .all_posts()
            .into_iter()
            .map(|post| post.meta.slug)
            .collect();
        assert_eq!(slugs, vec!["new", "old"]);
    }

    #[test]
    fn all_slugs_keep_queued_posts_and_store_order() {
        let mut queued = post("someday", "2024-02-01");
        queued.meta.queued = Some(QueuedFlag::Flag(true));
        let catalog = service(vec![post("old", "2024-01-01"), queued, post("new", "2024-03-01")]);

        assert_eq!(catalog.all_slugs(), vec!["old", "someday", "new"]);
    }

    #[test]
    fn equal_dates_keep_store_order() {
        let catalog = service(vec![
            post("first", "2024-01-01"),
            post("second", "2024-01-01"),
            post("third", "2024-01-01"),
        ]);

        let slugs: Vec<_> = catalog
            .all_posts()
            .into_iter()
            .map(|post| post.meta.slug)
            .collect();
        assert_eq!(slugs, vec!["first", "second", "third"]);
    }

    #[test]
    fn navigation_links_neighbouring_articles() {
        let catalog = service(vec![
            post("oldest", "2024-01-01"),
            post("middle", "2024-02-01"),
            post("newest", "2024-03-01"),
        ]);

        let nav = catalog.post_with_navigation("middle").expect("post");
        assert_eq!(nav.next.as_ref().map(|link| link.url.as_str()), Some("/blog/newest"));
        assert_eq!(
            nav.previous.as_ref().map(|link| link.url.as_str()),
            Some("/blog/oldest")
        );

        let newest = catalog.post_with_navigation("newest").expect("post");
        assert!(newest.next.is_none());
        assert_eq!(
            newest.previous.as_ref().map(|link| link.url.as_str()),
            Some("/blog/middle")
        );

        let oldest = catalog.post_with_navigation("oldest").expect("post");
        assert!(oldest.previous.is_none());
        assert_eq!(
            oldest.next.as_ref().map(|link| link.url.as_str()),
            Some("/blog/middle")
        );
    }

    #[test]
    fn navigation_ignores_non_article_layouts() {
        let mut page = post("about", "2024-02-15");
        page.meta.layout = "page".to_string();
        let catalog = service(vec![
            post("oldest", "2024-01-01"),
            page,
            post("newest", "2024-03-01"),
        ]);

        let nav = catalog.post_with_navigation("newest").expect("post");
        assert_eq!(
            nav.previous.as_ref().map(|link| link.url.as_str()),
            Some("/blog/oldest")
        );
    }

    #[test]
    fn post_outside_the_article_list_points_back_to_the_newest() {
        let mut queued = post("someday", "2024-02-01");
        queued.meta.queued = Some(QueuedFlag::Flag(true));
        let catalog = service(vec![post("published", "2024-01-01"), queued]);

        let nav = catalog.post_with_navigation("someday").expect("post");
        assert!(nav.next.is_none());
        assert_eq!(
            nav.previous.as_ref().map(|link| link.url.as_str()),
            Some("/blog/published")
        );
    }

    #[test]
    fn series_queries_follow_catalog_order() {
        let mut a = post("intro", "2024-01-01");
        a.meta.series = Some("Building Folio".to_string());
        let mut b = post("part-two", "2024-02-01");
        b.meta.series = Some("Building Folio".to_string());
        let mut c = post("aside", "2024-01-15");
        c.meta.series = Some("Asides".to_string());
        let catalog = service(vec![a, b, c]);

        let slugs: Vec<_> = catalog
            .series_posts("Building Folio")
            .into_iter()
            .map(|post| post.meta.slug)
            .collect();
        assert_eq!(slugs, vec!["part-two", "intro"]);

        assert_eq!(
            catalog.all_series(),
            vec!["Building Folio".to_string(), "Asides".to_string()]
        );
    }

    #[test]
    fn search_entries_flatten_tags() {
        let mut tagged = post("tagged", "2024-01-01");
        tagged.meta.tags = vec!["rust".to_string(), "web".to_string()];
        tagged.meta.excerpt = "An excerpt".to_string();
        let catalog = service(vec![tagged]);

        let entries = catalog.search_entries();
        assert_eq!(
            entries,
            vec![SearchEntry {
                title: "Title tagged".to_string(),
                tags: "rust, web".to_string(),
                url: "/blog/tagged".to_string(),
                date: "2024-01-01".to_string(),
                excerpt: "An excerpt".to_string(),
            }]
        );
    }

    #[test]
    fn accumulated_spans_every_page_up_to_the_requested_one() {
        let posts: Vec<Post> = (0..32)
            .map(|index| post(&format!("post-{index:02}"), &format!("2024-01-{:02}", 1 + index % 28)))
            .collect();
        let catalog = service(posts);

        let through_two = catalog.accumulated(2, page_size(15));
        assert_eq!(through_two.items.len(), 30);
        assert_eq!(through_two.current_page, 2);
        assert!(through_two.has_next);

        let through_three = catalog.accumulated(3, page_size(15));
        assert_eq!(through_three.items.len(), 32);
        assert!(!through_three.has_next);
    }

    #[test]
    fn front_page_reports_the_next_page_to_fetch() {
        let posts: Vec<Post> = (0..16)
            .map(|index| post(&format!("post-{index:02}"), &format!("2024-01-{:02}", 1 + index % 28)))
            .collect();
        let catalog = service(posts);

        let grid = catalog.front_page(page_size(15));
        assert_eq!(grid.cards.len(), 15);
        assert_eq!(grid.next_page, Some(2));
        assert_eq!(grid.page_size, 15);
    }

    #[test]
    fn archive_page_runs_out_past_the_last_page() {
        let posts: Vec<Post> = (0..16)
            .map(|index| post(&format!("post-{index:02}"), &format!("2024-01-{:02}", 1 + index % 28)))
            .collect();
        let catalog = service(posts);

        let grid = catalog.archive_page(2, page_size(15)).expect("page in range");
        assert_eq!(grid.cards.len(), 16);
        assert_eq!(grid.next_page, None);

        assert!(catalog.archive_page(3, page_size(15)).is_none());
    }

    #[test]
    fn post_detail_renders_content_and_series_box() {
        let mut intro = post("intro", "2024-01-01");
        intro.meta.series = Some("Build Log".to_string());
        intro.meta.preface = Some("A **warning**.".to_string());
        intro.content = "Hello *world*.".to_string();
        let mut sequel = post("sequel", "2024-02-01");
        sequel.meta.series = Some("Build Log".to_string());
        let catalog = service(vec![intro, sequel]);

        let detail = catalog.post_detail("intro").expect("post");
        assert!(detail.content_html.contains("<em>world</em>"));
        assert!(
            detail
                .preface_html
                .as_deref()
                .is_some_and(|html| html.contains("<strong>warning</strong>"))
        );
        assert_eq!(
            detail.next.as_ref().map(|link| link.url.as_str()),
            Some("/blog/sequel")
        );
        assert!(detail.previous.is_none());

        let series = detail.series.expect("series box");
        assert_eq!(series.name, "Build Log");
        let current: Vec<bool> = series.items.iter().map(|item| item.is_current).collect();
        assert_eq!(current, vec![false, true]);
    }
}
