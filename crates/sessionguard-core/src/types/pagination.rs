//! Pagination types for session listings.

use serde::{Deserialize, Serialize};

/// Sentinel page number/size meaning "return everything".
pub const UNPAGED: i64 = -1;

/// Default page size.
const DEFAULT_PAGE_SIZE: i64 = 10;

/// Request parameters for paginated listings.
///
/// `(-1, -1)` is the unpaged sentinel. Any other values are clamped to
/// `>= 1` when the page is cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-based).
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl PageRequest {
    /// Create a new page request. Values are kept as given.
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    /// Request the entire filtered set.
    pub fn unpaged() -> Self {
        Self::new(UNPAGED, UNPAGED)
    }

    /// Whether this is the unpaged sentinel.
    pub fn is_unpaged(&self) -> bool {
        self.page == UNPAGED && self.page_size == UNPAGED
    }

    /// Page number clamped to `>= 1`.
    pub fn effective_page(&self) -> i64 {
        self.page.max(1)
    }

    /// Page size clamped to `>= 1`.
    pub fn effective_page_size(&self) -> i64 {
        self.page_size.max(1)
    }

    /// Half-open index range `[start, end)` of this page within `total` items.
    pub fn bounds(&self, total: usize) -> (usize, usize) {
        if self.is_unpaged() {
            return (0, total);
        }
        let size = self.effective_page_size() as u64;
        let start = (self.effective_page() as u64 - 1).saturating_mul(size);
        let end = start.saturating_add(size);
        let clamp = |v: u64| usize::try_from(v).unwrap_or(usize::MAX).min(total);
        (clamp(start), clamp(end))
    }

    /// Cut one page out of an already filtered and sorted list.
    pub fn paginate<T: Serialize>(&self, mut items: Vec<T>) -> PageResponse<T> {
        let total = items.len();
        let (start, end) = self.bounds(total);
        let page_items: Vec<T> = items.drain(start..end).collect();

        if self.is_unpaged() {
            return PageResponse::new(page_items, 1, total.max(1) as u64, total as u64);
        }

        PageResponse::new(
            page_items,
            self.effective_page() as u64,
            self.effective_page_size() as u64,
            total as u64,
        )
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T: Serialize> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Current page number (1-based).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Size of the filtered set before slicing.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u64,
    /// Whether there is a next page.
    pub has_next: bool,
    /// Whether there is a previous page.
    pub has_previous: bool,
}

impl<T: Serialize> PageResponse<T> {
    /// Create a new paginated response.
    pub fn new(items: Vec<T>, page: u64, page_size: u64, total: u64) -> Self {
        let total_pages = if total == 0 {
            1
        } else {
            total.div_ceil(page_size.max(1))
        };
        Self {
            items,
            page,
            page_size,
            total,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}
