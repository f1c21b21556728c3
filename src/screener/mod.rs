//! Query-side screening of aggregated funding spreads.

pub mod params;
pub mod query;

pub use params::{PageResult, QueryParams, SortDir, SortKey, DEFAULT_PAGE_SIZE};
pub use query::query;
