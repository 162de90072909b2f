//! Pagination parameters shared by listing endpoints.

use serde::Deserialize;

/// Maximum page size for listings.
pub const MAX_PER_PAGE: i64 = 100;

/// Query parameters for paginated listings.
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageQuery {
    /// Returns `(limit, offset)` with page bounds enforced.
    pub fn limit_offset(&self) -> (i64, i64) {
        page_bounds(self.page, self.per_page)
    }
}

pub(crate) fn page_bounds(page: i64, per_page: i64) -> (i64, i64) {
    let per_page = per_page.clamp(1, MAX_PER_PAGE);
    let page = page.max(1);
    (per_page, (page - 1) * per_page)
}

pub(crate) fn default_page() -> i64 {
    1
}

pub(crate) fn default_per_page() -> i64 {
    20
}
