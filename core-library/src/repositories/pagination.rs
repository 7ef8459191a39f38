//! Page requests and results for catalog listings

use serde::{Deserialize, Serialize};

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u32 = 500;

const DEFAULT_PAGE_SIZE: u32 = 50;

/// Zero-indexed page of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    ///
    /// ```
    /// use core_library::repositories::PageRequest;
    ///
    /// assert_eq!(PageRequest::new(3, 10_000).page_size, 500);
    /// assert_eq!(PageRequest::new(0, 0).page_size, 1);
    /// ```
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// The request for the following page
    pub fn next(self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self
        }
    }

    /// SQL `OFFSET`
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.page_size)
    }

    /// SQL `LIMIT`
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of rows plus the total row count of the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    /// Number of pages in the listing
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size.max(1)))
    }

    /// Whether rows remain past this page
    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_walk_forward() {
        let first = PageRequest::new(0, 20);
        assert_eq!(first.offset(), 0);
        assert_eq!(first.limit(), 20);

        let third = first.next().next();
        assert_eq!(third.page, 2);
        assert_eq!(third.offset(), 40);
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(PageRequest::new(0, 0).page_size, 1);
        assert_eq!(PageRequest::new(0, MAX_PAGE_SIZE + 1).page_size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::default().page_size, 50);
    }

    #[test]
    fn test_has_next_on_last_partial_page() {
        let page = Page::new(vec!['a'; 10], 25, PageRequest::new(0, 10));
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let last = Page::new(vec!['a'; 5], 25, PageRequest::new(2, 10));
        assert!(!last.has_next());
    }

    #[test]
    fn test_empty_listing() {
        let page: Page<u8> = Page::new(Vec::new(), 0, PageRequest::default());
        assert!(page.is_empty());
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next());
    }
}
