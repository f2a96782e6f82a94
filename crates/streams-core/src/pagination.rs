//! Page offsets and pagination metadata for listing pages.

use serde::{Deserialize, Serialize};

/// Pagination is on only when `limit` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pagination {
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Base URI of the paginated listing, e.g. `admin/blog/index`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub limit: u64,
    pub pages: u64,
    pub current: u64,
    pub offset: u64,
}

impl Pagination {
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            uri: None,
        }
    }

    fn active_limit(&self) -> Option<u64> {
        self.limit.filter(|l| *l > 0)
    }

    /// Offset for a 1-based page. Pages at or below 1 start at zero; with no
    /// page size configured the offset is always zero.
    pub fn offset(&self, page: i64) -> u64 {
        match self.active_limit() {
            Some(limit) if page > 1 => (page as u64 - 1).saturating_mul(limit),
            _ => 0,
        }
    }

    /// URI segment index holding the page number.
    pub fn offset_segment(&self) -> Option<usize> {
        self.active_limit()?;
        let segments = self
            .uri
            .as_deref()
            .map(|u| u.split('/').filter(|s| !s.is_empty()).count())
            .unwrap_or(0);
        Some(segments + 1)
    }

    /// Metadata for the listing, or `None` when there is nothing to page.
    pub fn meta(&self, total: u64, page: i64) -> Option<PageMeta> {
        let limit = self.active_limit()?;
        if total == 0 {
            return None;
        }
        let pages = total.div_ceil(limit);
        let current = if page > 1 { page as u64 } else { 1 };
        Some(PageMeta {
            total,
            limit,
            pages,
            current,
            offset: self.offset(page),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_one_and_below_start_at_zero() {
        let p = Pagination::with_limit(25);
        for page in [-3, 0, 1] {
            assert_eq!(p.offset(page), 0, "page {page}");
        }
    }

    #[test]
    fn later_pages_offset_by_limit() {
        let p = Pagination::with_limit(25);
        assert_eq!(p.offset(2), 25);
        assert_eq!(p.offset(5), 100);
    }

    #[test]
    fn no_limit_means_no_offset() {
        let p = Pagination::default();
        assert_eq!(p.offset(7), 0);
        assert_eq!(p.offset_segment(), None);
        assert_eq!(p.meta(100, 2), None);
        assert_eq!(Pagination::with_limit(0).offset(3), 0);
    }

    #[test]
    fn offset_segment_counts_uri_parts() {
        let p = Pagination {
            limit: Some(10),
            uri: Some("admin/blog/index".to_string()),
        };
        assert_eq!(p.offset_segment(), Some(4));
        assert_eq!(Pagination::with_limit(10).offset_segment(), Some(1));
    }

    #[test]
    fn meta_reports_pages() {
        let p = Pagination::with_limit(10);
        let meta = p.meta(31, 3).unwrap();
        assert_eq!(
            meta,
            PageMeta {
                total: 31,
                limit: 10,
                pages: 4,
                current: 3,
                offset: 20
            }
        );
        assert_eq!(p.meta(0, 1), None);
        assert_eq!(p.meta(5, 0).unwrap().current, 1);
    }
}
