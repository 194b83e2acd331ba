//! Page request parsing and slicing.

use marketplace_catalog::paginate::{paginate, PageRequest};
use marketplace_catalog::{AnnotatedListing, CatalogError, Listing, RawQuery};

fn listings(n: usize) -> Vec<AnnotatedListing> {
    (1..=n)
        .map(|i| {
            let listing: Listing =
                serde_json::from_value(serde_json::json!({ "id": format!("l{i:02}") })).unwrap();
            AnnotatedListing::new(listing)
        })
        .collect()
}

#[test]
fn defaults_apply_when_absent() {
    let request = PageRequest::from_raw(&RawQuery::new(), 100).unwrap();
    assert_eq!(request, PageRequest { res_per_page: 100, page: 1 });
    assert_eq!(PageRequest::default(), request);
}

#[test]
fn res_per_page_wins_over_limit() {
    let raw = RawQuery::from_pairs([("limit", "5"), ("resPerPage", "7")]);
    assert_eq!(PageRequest::from_raw(&raw, 100).unwrap().res_per_page, 7);

    let raw = RawQuery::from_pairs([("limit", "5")]);
    assert_eq!(PageRequest::from_raw(&raw, 100).unwrap().res_per_page, 5);
}

#[test]
fn non_numeric_values_fall_back_to_defaults() {
    let raw = RawQuery::from_pairs([("resPerPage", "lots"), ("page", "first")]);
    let request = PageRequest::from_raw(&raw, 25).unwrap();
    assert_eq!(request, PageRequest { res_per_page: 25, page: 1 });
}

#[test]
fn non_positive_values_are_rejected() {
    for (key, value) in [("resPerPage", "0"), ("resPerPage", "-3"), ("limit", "0"), ("page", "0"), ("page", "-1")] {
        let raw = RawQuery::from_pairs([(key, value)]);
        assert!(
            matches!(PageRequest::from_raw(&raw, 100), Err(CatalogError::InvalidArgument(_))),
            "{key}={value} should be rejected"
        );
    }
    assert!(PageRequest::new(0, 1).is_err());
    assert!(PageRequest::new(1, 0).is_err());
}

#[test]
fn slices_the_requested_page() {
    let page = paginate(listings(7), PageRequest::new(3, 2).unwrap());
    assert_eq!(page.ids(), vec!["l04", "l05", "l06"]);
    assert_eq!(page.filtered_count, 7);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.current_page, 2);
    assert_eq!(page.res_per_page, 3);

    let last = paginate(listings(7), PageRequest::new(3, 3).unwrap());
    assert_eq!(last.ids(), vec!["l07"]);
}

#[test]
fn out_of_range_page_is_empty_not_an_error() {
    let page = paginate(listings(4), PageRequest::new(2, 9).unwrap());
    assert!(page.data.is_empty());
    assert_eq!(page.filtered_count, 4);
    assert_eq!(page.total_pages, 2);
}

#[test]
fn empty_result_has_zero_pages() {
    let page = paginate(Vec::new(), PageRequest::default());
    assert_eq!(page.total_pages, 0);
    assert_eq!(page.filtered_count, 0);
}

#[test]
fn huge_page_number_does_not_overflow() {
    let page = paginate(listings(3), PageRequest::new(usize::MAX, usize::MAX).unwrap());
    assert!(page.data.is_empty());
    assert_eq!(page.total_pages, 1);
}
