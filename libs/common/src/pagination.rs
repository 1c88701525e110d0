//! Page-number pagination for list endpoints

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// `?page=&page_size=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Number of items per page
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) as i64 * self.page_size() as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size() as i64
    }
}

/// One page of results with links to its neighbours
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page; `base_url` is the list endpoint without a query string
    pub fn new(results: Vec<T>, count: i64, params: &PageParams, base_url: &str) -> Self {
        let page = params.page();
        let size = params.page_size();
        let link = |n: u32| format!("{}?page={}&page_size={}", base_url, n, size);

        let next = (params.offset() + (results.len() as i64) < count).then(|| link(page + 1));
        let previous = (page > 1).then(|| link(page - 1));

        Self {
            count,
            next,
            previous,
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_are_clamped() {
        let params = PageParams {
            page: Some(0),
            page_size: Some(500),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), MAX_PAGE_SIZE);
        assert_eq!(params.offset(), 0);

        let defaults = PageParams::default();
        assert_eq!(defaults.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_links() {
        let params = PageParams {
            page: Some(2),
            page_size: Some(2),
        };
        let page = Page::new(vec![3, 4], 5, &params, "http://localhost/items/");
        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost/items/?page=3&page_size=2")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://localhost/items/?page=1&page_size=2")
        );

        let last = Page::new(vec![5], 5, &PageParams { page: Some(3), page_size: Some(2) }, "/x");
        assert!(last.next.is_none());
    }
}
