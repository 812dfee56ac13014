//! Page-number pagination over an already ordered catalog.

use std::num::NonZeroU32;

/// One page cut from a larger list, with enough context to render
/// pager controls.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
    pub current_page: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Cuts page `page` (1-based) out of `items`. Page zero yields an empty
/// page that still reports the catalog's total; pages past the end come
/// back empty rather than failing.
pub fn paginate<T: Clone>(items: &[T], page: u32, page_size: NonZeroU32) -> Page<T> {
    let size = page_size.get() as usize;
    let total_pages = items.len().div_ceil(size) as u32;

    let slice: &[T] = if page == 0 {
        &[]
    } else {
        let start = (page as usize - 1).saturating_mul(size);
        let end = start.saturating_add(size).min(items.len());
        items.get(start..end).unwrap_or(&[])
    };

    Page {
        items: slice.to_vec(),
        total_pages,
        current_page: page,
        has_next: page < total_pages,
        has_previous: page > 1,
    }
}
