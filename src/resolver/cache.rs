//! Two-tier per-symbol funding-interval cache.
//!
//! The hot tier is an in-process map, checked first and authoritative for
//! the lifetime of the process. The durable tier only seeds the hot tier at
//! startup and absorbs write-throughs so a restart does not refetch every
//! interval.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::exchange::Platform;
use crate::store::DurableStore;

/// Durable-tier payload: flat map keyed by `platform:symbol`.
pub type IntervalSnapshot = HashMap<String, f64>;

/// Process-scoped funding-interval cache.
///
/// Constructed once at startup and shared by reference. Entries have
/// unbounded lifetime; a later resolution that disagrees overwrites the old
/// value in both tiers.
pub struct IntervalCache {
    hot: DashMap<(Platform, String), f64>,
    durable: Arc<dyn DurableStore<IntervalSnapshot>>,
    persist: Mutex<()>,
}

impl IntervalCache {
    /// Create a cache seeded from the durable tier.
    ///
    /// A missing durable file starts the cache empty; a corrupt or unreadable
    /// one is logged and ignored rather than refusing to start.
    pub fn new(durable: Arc<dyn DurableStore<IntervalSnapshot>>) -> Self {
        let hot = DashMap::new();

        match durable.load() {
            Ok(Some(snapshot)) => {
                for (key, hours) in &snapshot {
                    match parse_durable_key(key) {
                        Some((platform, symbol)) if hours.is_finite() && *hours > 0.0 => {
                            hot.insert((platform, symbol), *hours);
                        }
                        _ => {
                            warn!(key = %key, hours, "Skipping unusable interval cache entry");
                        }
                    }
                }
                info!(entries = hot.len(), "Seeded interval cache from durable store");
            }
            Ok(None) => {
                debug!("No durable interval cache found, starting empty");
            }
            Err(error) => {
                warn!(error = %error, "Failed to load durable interval cache, starting empty");
            }
        }

        Self {
            hot,
            durable,
            persist: Mutex::new(()),
        }
    }

    /// Look up a symbol's funding interval.
    pub fn get(&self, platform: Platform, symbol: &str) -> Option<f64> {
        self.hot
            .get(&(platform, symbol.to_string()))
            .map(|entry| *entry.value())
    }

    /// Whether a symbol is already resolved.
    pub fn contains(&self, platform: Platform, symbol: &str) -> bool {
        self.hot.contains_key(&(platform, symbol.to_string()))
    }

    /// Write a resolution into both tiers.
    ///
    /// A disagreement with the existing entry overwrites it; exchanges do
    /// occasionally change a symbol's funding period.
    pub fn put(&self, platform: Platform, symbol: &str, hours: f64) {
        let previous = self.hot.insert((platform, symbol.to_string()), hours);
        if let Some(previous) = previous {
            if previous != hours {
                debug!(
                    platform = %platform,
                    symbol = %symbol,
                    previous,
                    hours,
                    "Interval changed, overwriting cached value"
                );
            }
        }

        // Snapshot and save happen under one lock: whichever put persists
        // last has every earlier insert in its snapshot, so pool workers
        // writing concurrently cannot regress the durable tier.
        let _guard = self.persist.lock().unwrap();
        if let Err(error) = self.durable.save(&self.snapshot()) {
            warn!(error = %error, "Failed to persist interval cache");
        }
    }

    /// Number of cached symbols.
    pub fn len(&self) -> usize {
        self.hot.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.hot.is_empty()
    }

    fn snapshot(&self) -> IntervalSnapshot {
        self.hot
            .iter()
            .map(|entry| {
                let (platform, symbol) = entry.key();
                (durable_key(*platform, symbol), *entry.value())
            })
            .collect()
    }
}

fn durable_key(platform: Platform, symbol: &str) -> String {
    format!("{platform}:{symbol}")
}

fn parse_durable_key(key: &str) -> Option<(Platform, String)> {
    let (platform, symbol) = key.split_once(':')?;
    let platform = Platform::from_str(platform).ok()?;
    if symbol.is_empty() {
        return None;
    }
    Some((platform, symbol.to_string()))
}
