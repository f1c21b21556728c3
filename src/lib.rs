//! Cross-exchange perpetual funding-rate scanner.
//!
//! Perpetual futures charge funding on different schedules: Binance settles
//! every 8 hours, Hyperliquid every hour, Bybit per contract-specific
//! interval. Raw rates are incomparable until they share a unit, so every
//! source normalizes to rate per hour. The spread between the highest- and
//! lowest-paying venue then prices a delta-neutral carry: short the perp
//! where funding is highest, long it where funding is lowest, collect the
//! difference.
//!
//! ```text
//! BTC funding:  Binance      +0.0100% / 8h  =  +0.001250% / h   (short)
//!               Hyperliquid  +0.0005% / 1h  =  +0.000500% / h   (long)
//! ────────────────────────────────────────────────────────────
//! Spread:       0.000750% / h  ×  24 × 365  ≈  6.57% APR
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`exchange`]: Platform definitions and the funding-source trait
//! - [`rates`]: Symbol canonicalization and rate normalization
//! - [`resolver`]: Background funding-interval resolution
//! - [`spread`]: Cross-platform aggregation and spread math
//! - [`screener`]: Filtering, ranking, and pagination
//! - [`scanner`]: Refresh orchestration over all sources
//! - [`store`]: Durable persistence for intervals and favorites
//! - [`metrics`]: Prometheus metric definitions
//! - [`api`]: HTTP API for rates, status, and health
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod exchange;
pub mod metrics;
pub mod rates;
pub mod resolver;
pub mod scanner;
pub mod screener;
pub mod spread;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{Result, ScannerError};
