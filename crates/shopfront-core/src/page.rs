//! Pagination over already-filtered in-memory result sets.
//!
//! Both adapters filter and sort by non-indexed predicates *after* retrieval,
//! so `total` and `pages` are always computed from the filtered set, never
//! from the raw scan size.

use serde::{Deserialize, Serialize};

/// A page request. `limit = 0` means "return everything" (no slicing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// The whole result set in one page.
    pub fn all() -> Self {
        Self { page: 1, limit: 0 }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::all()
    }
}

/// One page of a filtered result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Size of the filtered set, not of the raw scan.
    pub total: usize,
    pub page: u32,
    pub pages: u32,
}

/// Slice an already-filtered, already-sorted set according to `request`.
///
/// With `limit > 0` the skip offset is `(page - 1) * limit`; a page past the
/// end yields an empty `items` with `total`/`pages` intact.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len();
    if request.limit == 0 {
        return Page {
            items,
            total,
            page: 1,
            pages: 1,
        };
    }
    let limit = request.limit as usize;
    let page = request.page.max(1);
    let pages = total.div_ceil(limit) as u32;
    let skip = (page as usize - 1) * limit;
    let items = items.into_iter().skip(skip).take(limit).collect();
    Page {
        items,
        total,
        page,
        pages,
    }
}
