pub mod listing;
pub mod order;
pub mod overlay;
pub mod page;

pub use listing::*;
pub use order::*;
pub use overlay::*;
pub use page::*;
