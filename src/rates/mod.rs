//! Rate normalization: canonical units and canonical asset identity.
//!
//! This module handles:
//! - Folding exchange-native symbols into canonical asset names
//! - Converting raw funding figures into rate-per-hour / USD units

pub mod normalizer;
pub mod symbols;

pub use normalizer::{normalize, NormalizedRecord};
pub use symbols::canonicalize;
