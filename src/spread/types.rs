//! Cross-platform spread types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::exchange::Platform;

/// Hours in a year, for annualizing per-hour spreads.
pub const HOURS_PER_YEAR: f64 = 24.0 * 365.0;

/// One platform's contribution to an asset group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlatformEntry {
    /// Funding rate per hour, `None` when the platform reported none.
    pub funding_rate: Option<f64>,
    /// Open interest in USD.
    pub open_interest: Option<f64>,
    /// 24h volume in USD.
    pub volume_24h: Option<f64>,
    /// Whether `open_interest` is finite and non-negative.
    pub valid_oi: bool,
    /// Whether `volume_24h` is finite and non-negative.
    pub valid_volume: bool,
}

impl PlatformEntry {
    /// Build an entry, fixing the validity flags once.
    ///
    /// Downstream code trusts the flags and never re-checks the numbers.
    pub fn new(
        funding_rate: Option<f64>,
        open_interest: Option<f64>,
        volume_24h: Option<f64>,
    ) -> Self {
        Self {
            funding_rate: funding_rate.filter(|rate| rate.is_finite()),
            open_interest,
            volume_24h,
            valid_oi: is_valid_figure(open_interest),
            valid_volume: is_valid_figure(volume_24h),
        }
    }

    /// Whether this entry satisfies the active liquidity thresholds.
    /// An absent threshold always passes; an invalid figure fails an active
    /// one.
    pub fn passes(&self, min_open_interest: Option<f64>, min_volume_24h: Option<f64>) -> bool {
        let oi_ok = match min_open_interest {
            Some(min) => self.valid_oi && self.open_interest.is_some_and(|oi| oi >= min),
            None => true,
        };
        let volume_ok = match min_volume_24h {
            Some(min) => self.valid_volume && self.volume_24h.is_some_and(|vol| vol >= min),
            None => true,
        };
        oi_ok && volume_ok
    }
}

fn is_valid_figure(value: Option<f64>) -> bool {
    value.is_some_and(|v| v.is_finite() && v >= 0.0)
}

/// One canonical asset's cross-platform funding picture.
///
/// Only constructible when at least two platforms report a rate, so the
/// spread fields always hold real values rather than zero placeholders.
/// Rebuilt wholesale every refresh cycle, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetGroup {
    /// Canonical asset identity.
    pub asset: String,
    /// Per-platform figures, keyed in canonical platform order.
    pub platforms: BTreeMap<Platform, PlatformEntry>,
    /// Highest valid open interest across platforms, USD.
    pub open_interest: Option<f64>,
    /// Highest valid 24h volume across platforms, USD.
    pub volume_24h: Option<f64>,
    /// Highest per-hour funding rate.
    pub max_rate: f64,
    /// Lowest per-hour funding rate.
    pub min_rate: f64,
    /// `max_rate - min_rate`.
    pub spread_per_hour: f64,
    /// Spread annualized over hours-per-year.
    pub apr: f64,
    /// Platform paying the most to shorts (open the short here).
    pub short_platform: Platform,
    /// Platform with the lowest rate (open the long here).
    pub long_platform: Platform,
    /// Entries passing the active liquidity thresholds.
    pub pass_count: usize,
    /// Entries the thresholds were checked against.
    pub checked_count: usize,
    /// Whether a two-sided position clears the thresholds.
    pub meets_arb_threshold: bool,
}

impl AssetGroup {
    /// Build a group from per-platform entries.
    ///
    /// Returns `None` when fewer than two platforms report a rate; a spread
    /// needs two sides. Rate ties resolve to the platform earliest in
    /// canonical order. The threshold fields start at their no-threshold
    /// values and are recomputed per query.
    pub fn from_entries(
        asset: String,
        platforms: BTreeMap<Platform, PlatformEntry>,
    ) -> Option<Self> {
        let mut highest: Option<(Platform, f64)> = None;
        let mut lowest: Option<(Platform, f64)> = None;
        let mut rated = 0usize;

        for (platform, entry) in &platforms {
            let Some(rate) = entry.funding_rate else {
                continue;
            };
            rated += 1;
            if highest.map_or(true, |(_, max)| rate > max) {
                highest = Some((*platform, rate));
            }
            if lowest.map_or(true, |(_, min)| rate < min) {
                lowest = Some((*platform, rate));
            }
        }

        if rated < 2 {
            return None;
        }
        let (short_platform, max_rate) = highest?;
        let (long_platform, min_rate) = lowest?;

        let open_interest = platforms
            .values()
            .filter(|entry| entry.valid_oi)
            .filter_map(|entry| entry.open_interest)
            .reduce(f64::max);
        let volume_24h = platforms
            .values()
            .filter(|entry| entry.valid_volume)
            .filter_map(|entry| entry.volume_24h)
            .reduce(f64::max);

        let spread_per_hour = max_rate - min_rate;
        let checked_count = platforms.len();

        Some(Self {
            asset,
            platforms,
            open_interest,
            volume_24h,
            max_rate,
            min_rate,
            spread_per_hour,
            apr: spread_per_hour * HOURS_PER_YEAR,
            short_platform,
            long_platform,
            pass_count: checked_count,
            checked_count,
            meets_arb_threshold: true,
        })
    }

    /// Platforms reporting a non-null rate.
    pub fn rate_count(&self) -> usize {
        self.platforms
            .values()
            .filter(|entry| entry.funding_rate.is_some())
            .count()
    }

    /// APR as a percentage, the way thresholds and displays use it.
    pub fn apr_percent(&self) -> f64 {
        self.apr * 100.0
    }
}
