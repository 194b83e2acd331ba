//! Query interfaces for the marketplace catalog.
//!
//! Each module provides a query struct that borrows from the catalog's
//! engine and exposes methods returning `Result<T>` with typed payloads.

pub mod listings;

pub use listings::ListingQuery;
