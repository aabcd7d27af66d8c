//! Offset pagination shared by list endpoints

use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 20;

/// Query string as sent by clients (`?page=2&perPage=50`)
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    /// Clamp to `1..=max_per_page` items, page numbers start at 1
    pub fn resolve(&self, max_per_page: u32) -> Page {
        let max = max_per_page.max(1);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, max);
        let page = self.page.unwrap_or(1).max(1);
        Page {
            limit: i64::from(per_page),
            offset: i64::from(page - 1) * i64::from(per_page),
        }
    }
}

/// Resolved LIMIT / OFFSET pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Slice an in-memory collection the way `LIMIT/OFFSET` would
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(usize::try_from(self.offset).unwrap_or(0))
            .take(usize::try_from(self.limit).unwrap_or(0))
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(i64::from(DEFAULT_PER_PAGE), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(PageQuery::default().resolve(100), Page::new(20, 0));
    }

    #[test]
    fn test_clamps_per_page_and_page() {
        let q = PageQuery { page: Some(0), per_page: Some(1000) };
        assert_eq!(q.resolve(50), Page::new(50, 0));

        let q = PageQuery { page: Some(3), per_page: Some(0) };
        assert_eq!(q.resolve(50), Page::new(1, 2));
    }

    #[test]
    fn test_apply_slices() {
        let page = PageQuery { page: Some(2), per_page: Some(2) }.resolve(10);
        assert_eq!(page.apply(1..=5), vec![3, 4]);
        assert!(Page::new(2, 10).apply(1..=5).is_empty());
    }
}
