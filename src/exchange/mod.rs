//! Exchange module: the seam between the scanner and each venue.
//!
//! This module handles:
//! - Platform identities and their unit/period conventions
//! - Raw snapshot record types
//! - The `FundingSource` adapter trait real clients implement
//! - Mock source and bundled fixtures for testing and demos

pub mod mock;
pub mod source;
pub mod types;

pub use mock::{MockExchange, MockSourceConfig};
pub use source::FundingSource;
pub use types::{Platform, RateConvention, RawFundingRecord};
