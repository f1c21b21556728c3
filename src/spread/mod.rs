//! Spread computation: per-asset cross-platform merge.
//!
//! This module handles:
//! - Per-platform entry and asset-group types with their invariants
//! - The pure aggregation pass that merges normalized records

pub mod aggregator;
pub mod types;

pub use aggregator::aggregate;
pub use types::{AssetGroup, PlatformEntry, HOURS_PER_YEAR};
