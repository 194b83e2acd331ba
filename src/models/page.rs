use serde::Serialize;

use super::listing::AnnotatedListing;

// ---------------------------------------------------------------------------
// ListingPage — Paginated query response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub data: Vec<AnnotatedListing>,
    /// Size of the full filtered, ordered set before slicing.
    pub filtered_count: usize,
    pub res_per_page: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

impl ListingPage {
    pub fn ids(&self) -> Vec<&str> {
        self.data.iter().map(|l| l.id()).collect()
    }
}
