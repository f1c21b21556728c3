//! Refresh orchestration: per-source timers, the state reducer, and the
//! query surface the API serves from.

pub mod controller;
pub mod state;

pub use controller::{Scanner, ScannerStatus, SourceStatus};
pub use state::{apply, ScannerEvent, ScannerState, SourceState};
