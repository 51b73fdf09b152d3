use crate::models::Reel;
use serde::Serialize;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("page must be >= 1")]
    InvalidPage,

    #[error("limit must be between 1 and 100, got {0}")]
    InvalidLimit(usize),

    #[error("Page {page} not found, total pages: {total_pages}")]
    PageOutOfRange { page: usize, total_pages: usize },
}

/// One page of reels, serialized as the `/reels` response body.
#[derive(Debug, Serialize)]
pub struct Page<'a> {
    pub page: usize,
    pub limit: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
    #[serde(rename = "reels")]
    pub items: &'a [Reel],
}

/// Slice `items` into the requested page.
///
/// An empty collection yields an empty page for any valid `page`; otherwise a
/// page past the end is [`PaginationError::PageOutOfRange`].
pub fn paginate(items: &[Reel], page: usize, limit: usize) -> Result<Page<'_>, PaginationError> {
    if page < 1 {
        return Err(PaginationError::InvalidPage);
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(PaginationError::InvalidLimit(limit));
    }

    let total_items = items.len();
    let total_pages = total_items.div_ceil(limit);

    if total_items > 0 && page > total_pages {
        return Err(PaginationError::PageOutOfRange { page, total_pages });
    }

    let start = (page - 1).saturating_mul(limit).min(total_items);
    let end = start.saturating_add(limit).min(total_items);

    Ok(Page {
        page,
        limit,
        total_items,
        total_pages,
        has_next: page < total_pages,
        has_previous: page > 1,
        items: &items[start..end],
    })
}
