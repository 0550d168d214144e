//! In-memory pagination.

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, Result};
use crate::value::Row;

/// One page of a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T = Row> {
    /// Items on this page.
    pub results: Vec<T>,
    /// Number of pages, `ceil(total_items / limit)`.
    pub total_pages: usize,
    /// One-based page number.
    pub page: usize,
    /// Page size.
    pub limit: usize,
    /// Size of the whole result set.
    pub total_items: usize,
}

/// Slices `items` into the requested page.
///
/// Page numbers start at 1; 0 is treated as 1. A page past the end is empty.
/// An empty result set has zero pages and reports page 1.
///
/// # Errors
///
/// Returns [`OrmError::Validation`] when `limit` is 0.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> Result<Page<T>> {
    if limit == 0 {
        return Err(OrmError::Validation("page limit must be at least 1".to_string()));
    }

    let total_items = items.len();
    let total_pages = total_items.div_ceil(limit);
    let page = if total_items == 0 { 1 } else { page.max(1) };
    let offset = (page - 1).saturating_mul(limit);

    let results = items.into_iter().skip(offset).take(limit).collect();

    Ok(Page {
        results,
        total_pages,
        page,
        limit,
        total_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_page() {
        let page = paginate((1..=45).collect::<Vec<_>>(), 2, 20).unwrap();
        assert_eq!(page.results.len(), 20);
        assert_eq!(page.results[0], 21);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 45);
        assert_eq!(page.page, 2);
    }

    #[test]
    fn test_last_and_out_of_range_pages() {
        let items: Vec<i32> = (1..=45).collect();
        let last = paginate(items.clone(), 3, 20).unwrap();
        assert_eq!(last.results, vec![41, 42, 43, 44, 45]);

        let past = paginate(items, 9, 20).unwrap();
        assert!(past.results.is_empty());
        assert_eq!(past.page, 9);
        assert_eq!(past.total_pages, 3);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let page = paginate(vec!["a", "b", "c"], 0, 2).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.results, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_set() {
        let page = paginate(Vec::<Row>::new(), 4, 10).unwrap();
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
        assert!(page.results.is_empty());
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(matches!(
            paginate(vec![1], 1, 0),
            Err(OrmError::Validation(_))
        ));
    }
}
