//! Raw snapshot records to canonical per-hour, per-USD units.
//!
//! Every downstream component depends on rate-per-hour being the single
//! funding unit; no other module applies period math.

use serde::{Deserialize, Serialize};

use crate::exchange::{Platform, RateConvention, RawFundingRecord};
use crate::rates::symbols::canonicalize;

/// One symbol's funding snapshot in canonical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Platform the record came from.
    pub platform: Platform,
    /// Canonical asset identity.
    pub asset: String,
    /// Funding rate per hour. `None` when the raw rate was absent or
    /// non-finite; such records still contribute open interest and volume.
    pub rate_per_hour: Option<f64>,
    /// Open interest in USD.
    pub open_interest_usd: Option<f64>,
    /// 24h traded volume in USD.
    pub volume_24h_usd: Option<f64>,
    /// Mark price, when the exchange reported a usable one.
    pub mark_price: Option<f64>,
}

/// Convert one raw record into canonical units.
///
/// `resolved_interval_hours` is the per-symbol funding interval for
/// variable-period platforms; when `None` (or unusable) the conservative
/// `fallback_hours` applies, so the same inputs always produce the same
/// output.
pub fn normalize(
    raw: &RawFundingRecord,
    resolved_interval_hours: Option<f64>,
    fallback_hours: f64,
) -> NormalizedRecord {
    let period_hours = match raw.platform.rate_convention() {
        RateConvention::FixedPeriod { hours } => hours,
        RateConvention::PerSymbol => resolved_interval_hours
            .filter(usable_period)
            .unwrap_or(fallback_hours),
        RateConvention::SelfReported { default_hours } => raw
            .period_hours
            .filter(usable_period)
            .unwrap_or(default_hours),
    };

    let rate_per_hour = raw
        .rate
        .filter(|rate| rate.is_finite())
        .map(|rate| rate / period_hours);

    let mark_price = raw.mark_price.filter(|price| price.is_finite() && *price > 0.0);

    NormalizedRecord {
        platform: raw.platform,
        asset: canonicalize(&raw.symbol),
        rate_per_hour,
        open_interest_usd: to_usd(raw.open_interest, mark_price, raw.platform.oi_in_base_units()),
        volume_24h_usd: to_usd(raw.volume_24h, mark_price, raw.platform.volume_in_base_units()),
        mark_price,
    }
}

fn usable_period(hours: &f64) -> bool {
    hours.is_finite() && *hours > 0.0
}

/// Convert a native-unit figure to USD. Figures already in USD pass through;
/// base-unit figures need a usable mark price or the field becomes `None`.
fn to_usd(value: Option<f64>, mark_price: Option<f64>, in_base_units: bool) -> Option<f64> {
    let value = value.filter(|v| v.is_finite())?;
    if in_base_units {
        Some(value * mark_price?)
    } else {
        Some(value)
    }
}
