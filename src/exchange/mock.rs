//! Mock exchange source for unit testing and the bundled demo feeds.
//!
//! This module provides a mock source that can be used in tests
//! without making real network requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::exchange::source::FundingSource;
use crate::exchange::types::{Platform, RawFundingRecord};

/// Configuration for mock source behavior.
#[derive(Debug, Clone, Default)]
pub struct MockSourceConfig {
    /// Whether snapshot fetches fail.
    pub fail_snapshot: bool,
    /// Whether interval lookups fail.
    pub fail_intervals: bool,
    /// Simulated latency in milliseconds.
    pub latency_ms: u64,
}

/// Mock exchange source for testing.
///
/// Clones share their underlying state, so a test can hold one handle while
/// the scanner owns another and flip failure modes mid-run.
#[derive(Debug, Clone)]
pub struct MockExchange {
    /// Platform this mock impersonates.
    platform: Platform,
    /// Simulated latency in milliseconds.
    latency_ms: u64,
    /// Preferred refresh cadence override.
    cadence: Option<Duration>,
    /// Snapshot records returned by `fetch_snapshot`.
    records: Arc<Mutex<Vec<RawFundingRecord>>>,
    /// Per-symbol funding intervals returned by `fetch_funding_interval`.
    intervals: Arc<Mutex<HashMap<String, f64>>>,
    /// Whether snapshot fetches fail.
    fail_snapshot: Arc<AtomicBool>,
    /// Whether interval lookups fail.
    fail_intervals: Arc<AtomicBool>,
    /// Number of snapshot fetches served or failed.
    snapshot_calls: Arc<AtomicUsize>,
    /// Per-symbol interval lookup counts.
    interval_calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockExchange {
    /// Create an empty mock for a platform with default configuration.
    pub fn new(platform: Platform) -> Self {
        Self::with_config(platform, MockSourceConfig::default())
    }

    /// Create a mock with custom configuration.
    pub fn with_config(platform: Platform, config: MockSourceConfig) -> Self {
        Self {
            platform,
            latency_ms: config.latency_ms,
            cadence: None,
            records: Arc::new(Mutex::new(Vec::new())),
            intervals: Arc::new(Mutex::new(HashMap::new())),
            fail_snapshot: Arc::new(AtomicBool::new(config.fail_snapshot)),
            fail_intervals: Arc::new(AtomicBool::new(config.fail_intervals)),
            snapshot_calls: Arc::new(AtomicUsize::new(0)),
            interval_calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a mock pre-loaded with the bundled fixture snapshot for a
    /// platform. Used by the demo binary and the integration tests.
    pub fn with_fixtures(platform: Platform) -> Self {
        let mock = Self::new(platform);
        mock.set_records(fixture_records(platform));
        if platform.has_variable_interval() {
            for (symbol, hours) in fixture_intervals() {
                mock.set_interval(symbol, hours);
            }
        }
        mock
    }

    /// Replace the snapshot records.
    pub fn set_records(&self, records: Vec<RawFundingRecord>) {
        *self.records.lock().unwrap() = records;
    }

    /// Set one symbol's funding interval.
    pub fn set_interval(&self, symbol: impl Into<String>, hours: f64) {
        self.intervals.lock().unwrap().insert(symbol.into(), hours);
    }

    /// Toggle snapshot failure at runtime.
    pub fn set_fail_snapshot(&self, fail: bool) {
        self.fail_snapshot.store(fail, Ordering::SeqCst);
    }

    /// Toggle interval-lookup failure at runtime.
    pub fn set_fail_intervals(&self, fail: bool) {
        self.fail_intervals.store(fail, Ordering::SeqCst);
    }

    /// Override the preferred refresh cadence.
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = Some(cadence);
        self
    }

    /// Number of snapshot fetches attempted so far.
    pub fn snapshot_call_count(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    /// Number of interval lookups attempted for a symbol.
    pub fn interval_call_count(&self, symbol: &str) -> usize {
        self.interval_calls
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .unwrap_or(0)
    }

    /// Total interval lookups attempted across all symbols.
    pub fn total_interval_calls(&self) -> usize {
        self.interval_calls.lock().unwrap().values().sum()
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
    }
}

#[async_trait]
impl FundingSource for MockExchange {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_snapshot(&self) -> Result<Vec<RawFundingRecord>, SourceError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.fail_snapshot.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable {
                platform: self.platform,
                reason: "mock snapshot failure".to_string(),
            });
        }

        Ok(self.records.lock().unwrap().clone())
    }

    async fn fetch_funding_interval(&self, symbol: &str) -> Result<f64, SourceError> {
        {
            let mut calls = self.interval_calls.lock().unwrap();
            *calls.entry(symbol.to_string()).or_insert(0) += 1;
        }
        self.simulate_latency().await;

        if self.fail_intervals.load(Ordering::SeqCst) {
            return Err(SourceError::IntervalLookupFailed {
                platform: self.platform,
                symbol: symbol.to_string(),
                reason: "mock interval failure".to_string(),
            });
        }

        match self.intervals.lock().unwrap().get(symbol) {
            Some(hours) => Ok(*hours),
            None => Err(SourceError::IntervalLookupFailed {
                platform: self.platform,
                symbol: symbol.to_string(),
                reason: "symbol not listed".to_string(),
            }),
        }
    }

    fn refresh_interval(&self) -> Option<Duration> {
        self.cadence
    }
}

/// Bundled fixture snapshot for one platform.
///
/// Rates follow each platform's own convention (per-8h on Binance, per-1h on
/// Hyperliquid and Lighter, per-interval on Bybit, self-scoped on Aster), so
/// the fixtures exercise the full normalization matrix.
pub fn fixture_records(platform: Platform) -> Vec<RawFundingRecord> {
    match platform {
        Platform::Binance => vec![
            RawFundingRecord::new(platform, "BTCUSDT")
                .with_rate(0.0001)
                .with_open_interest(78_000.0)
                .with_volume_24h(12_400_000_000.0)
                .with_mark_price(65_400.0),
            RawFundingRecord::new(platform, "ETHUSDT")
                .with_rate(0.000082)
                .with_open_interest(1_250_000.0)
                .with_volume_24h(6_100_000_000.0)
                .with_mark_price(3_480.0),
            RawFundingRecord::new(platform, "SOLUSDT")
                .with_rate(-0.00012)
                .with_open_interest(9_800_000.0)
                .with_volume_24h(2_350_000_000.0)
                .with_mark_price(152.0),
            RawFundingRecord::new(platform, "XRPUSDT")
                .with_rate(0.00005)
                .with_open_interest(310_000_000.0)
                .with_volume_24h(890_000_000.0)
                .with_mark_price(0.52),
            RawFundingRecord::new(platform, "1000PEPEUSDT")
                .with_rate(0.00032)
                .with_open_interest(42_000_000_000.0)
                .with_volume_24h(410_000_000.0)
                .with_mark_price(0.0074),
            // Freshly listed contract with no funding epoch yet.
            RawFundingRecord::new(platform, "NEWCOINUSDT")
                .with_open_interest(1_800_000.0)
                .with_volume_24h(45_000_000.0)
                .with_mark_price(1.34),
        ],
        Platform::Hyperliquid => vec![
            RawFundingRecord::new(platform, "BTC")
                .with_rate(0.0000125)
                .with_open_interest(12_400.0)
                .with_volume_24h(3_900_000_000.0)
                .with_mark_price(65_390.0),
            RawFundingRecord::new(platform, "ETH")
                .with_rate(0.0000117)
                .with_open_interest(286_000.0)
                .with_volume_24h(1_850_000_000.0)
                .with_mark_price(3_479.0),
            RawFundingRecord::new(platform, "SOL")
                .with_rate(-0.00002)
                .with_open_interest(2_600_000.0)
                .with_volume_24h(720_000_000.0)
                .with_mark_price(152.1),
            RawFundingRecord::new(platform, "kPEPE")
                .with_rate(0.00006)
                .with_open_interest(5_100_000_000.0)
                .with_volume_24h(98_000_000.0)
                .with_mark_price(0.0074),
            RawFundingRecord::new(platform, "DOGE")
                .with_rate(0.0000105)
                .with_open_interest(310_000_000.0)
                .with_volume_24h(240_000_000.0)
                .with_mark_price(0.128),
        ],
        Platform::Bybit => vec![
            RawFundingRecord::new(platform, "BTCUSDT")
                .with_rate(0.00009)
                .with_open_interest(5_600_000_000.0)
                .with_volume_24h(8_800_000_000.0)
                .with_mark_price(65_410.0),
            RawFundingRecord::new(platform, "ETHUSDT")
                .with_rate(0.00014)
                .with_open_interest(2_400_000_000.0)
                .with_volume_24h(4_200_000_000.0)
                .with_mark_price(3_481.0),
            RawFundingRecord::new(platform, "SOLUSDT")
                .with_rate(-0.00033)
                .with_open_interest(780_000_000.0)
                .with_volume_24h(1_400_000_000.0)
                .with_mark_price(151.9),
            RawFundingRecord::new(platform, "TIAUSDT")
                .with_rate(0.00012)
                .with_open_interest(96_000_000.0)
                .with_volume_24h(120_000_000.0)
                .with_mark_price(5.8),
            RawFundingRecord::new(platform, "XRPUSDT")
                .with_rate(0.00005)
                .with_open_interest(410_000_000.0)
                .with_volume_24h(380_000_000.0)
                .with_mark_price(0.521),
        ],
        Platform::Lighter => vec![
            RawFundingRecord::new(platform, "BTC")
                .with_rate(0.0000108)
                .with_open_interest(420_000_000.0)
                .with_volume_24h(310_000_000.0)
                .with_mark_price(65_380.0),
            RawFundingRecord::new(platform, "ETH")
                .with_rate(0.0000095)
                .with_open_interest(180_000_000.0)
                .with_volume_24h(165_000_000.0)
                .with_mark_price(3_478.0),
            RawFundingRecord::new(platform, "SOL")
                .with_rate(-0.000041)
                .with_open_interest(52_000_000.0)
                .with_volume_24h(48_000_000.0)
                .with_mark_price(152.2),
            RawFundingRecord::new(platform, "DOGE")
                .with_rate(0.0000088)
                .with_open_interest(21_000_000.0)
                .with_volume_24h(16_000_000.0)
                .with_mark_price(0.1279),
        ],
        Platform::Aster => vec![
            RawFundingRecord::new(platform, "BTCUSDT")
                .with_rate(0.00004)
                .with_period_hours(4.0)
                .with_open_interest(2_100.0)
                .with_volume_24h(5_900.0)
                .with_mark_price(65_405.0),
            RawFundingRecord::new(platform, "ETHUSDT")
                .with_rate(0.000031)
                .with_period_hours(4.0)
                .with_open_interest(44_000.0)
                .with_volume_24h(120_000.0)
                .with_mark_price(3_480.5),
            // No period field on this one; the 8h default applies.
            RawFundingRecord::new(platform, "SOLUSDT")
                .with_rate(-0.00019)
                .with_open_interest(520_000.0)
                .with_volume_24h(2_900_000.0)
                .with_mark_price(152.05),
            RawFundingRecord::new(platform, "DOGEUSDT")
                .with_rate(0.000012)
                .with_period_hours(4.0)
                .with_open_interest(85_000_000.0)
                .with_volume_24h(420_000_000.0)
                .with_mark_price(0.1281),
        ],
    }
}

/// Bundled per-symbol funding intervals for the variable-interval fixture
/// platform.
pub fn fixture_intervals() -> Vec<(String, f64)> {
    vec![
        ("BTCUSDT".to_string(), 8.0),
        ("ETHUSDT".to_string(), 8.0),
        ("SOLUSDT".to_string(), 4.0),
        ("TIAUSDT".to_string(), 4.0),
        ("XRPUSDT".to_string(), 8.0),
    ]
}
