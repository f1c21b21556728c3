//! Interval resolver: bounded-concurrency funding-period enrichment.
//!
//! This module handles:
//! - The two-tier (in-process + durable) per-symbol interval cache
//! - The epoch-cancelled worker pool that fills it

pub mod cache;
pub mod pool;

pub use cache::{IntervalCache, IntervalSnapshot};
pub use pool::IntervalResolver;
