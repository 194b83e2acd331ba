//! Page selection over the fully ordered result.

use crate::error::{CatalogError, Result};
use crate::models::{AnnotatedListing, ListingPage};
use crate::request::RawQuery;

/// Requested page, 1-indexed, with a page size of at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub res_per_page: usize,
    pub page: usize,
}

impl PageRequest {
    pub fn new(res_per_page: usize, page: usize) -> Result<Self> {
        if res_per_page == 0 {
            return Err(CatalogError::InvalidArgument(
                "resPerPage must be at least 1".into(),
            ));
        }
        if page == 0 {
            return Err(CatalogError::InvalidArgument("page must be at least 1".into()));
        }
        Ok(Self { res_per_page, page })
    }

    /// Read `resPerPage` (or its alias `limit`) and `page` from a request.
    ///
    /// Non-numeric values fall back to the defaults; numbers below one are
    /// rejected.
    pub fn from_raw(raw: &RawQuery, default_res_per_page: usize) -> Result<Self> {
        let size_text = raw.text("resPerPage").or_else(|| raw.text("limit"));
        let res_per_page = match size_text.and_then(parse_count) {
            Some(n) if n < 1 => {
                return Err(CatalogError::InvalidArgument(format!(
                    "resPerPage must be at least 1, got {}",
                    n
                )))
            }
            Some(n) => n as usize,
            None => default_res_per_page,
        };
        let page = match raw.text("page").and_then(parse_count) {
            Some(n) if n < 1 => {
                return Err(CatalogError::InvalidArgument(format!(
                    "page must be at least 1, got {}",
                    n
                )))
            }
            Some(n) => n as usize,
            None => 1,
        };
        Self::new(res_per_page, page)
    }

    fn offset(&self) -> usize {
        self.res_per_page.saturating_mul(self.page - 1)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            res_per_page: crate::config::DEFAULT_RES_PER_PAGE,
            page: 1,
        }
    }
}

fn parse_count(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

/// Slice the ordered listings into the requested page.
///
/// Out-of-range pages yield empty `data` with otherwise correct counts.
pub fn paginate(listings: Vec<AnnotatedListing>, request: PageRequest) -> ListingPage {
    let total = listings.len();
    let data: Vec<AnnotatedListing> = listings
        .into_iter()
        .skip(request.offset())
        .take(request.res_per_page)
        .collect();

    ListingPage {
        data,
        filtered_count: total,
        res_per_page: request.res_per_page,
        current_page: request.page,
        total_pages: total.div_ceil(request.res_per_page),
    }
}
