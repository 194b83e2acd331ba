//! Request surface and its normalization into a typed listing predicate.

pub mod filter;
pub mod normalizer;
pub mod raw;

pub use filter::{Condition, DateRange, FilterOp, FilterValue, KeywordFilter, ListingFilter};
pub use normalizer::{QueryNormalizer, RESERVED_KEYS};
pub use raw::{RawQuery, RawValue};
