//! Exchange-related types: platforms, conversion profiles, raw records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A supported perpetual-futures exchange.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Platform {
    /// Binance USD-M perpetuals. Funding settles every 8 hours.
    Binance,
    /// Hyperliquid perpetuals. Funding settles every hour.
    Hyperliquid,
    /// Bybit linear perpetuals. Funding interval varies per symbol.
    Bybit,
    /// Lighter perpetuals. Funding settles every hour.
    Lighter,
    /// Aster perpetuals. Each record carries its own funding period.
    Aster,
}

/// How a platform scopes the raw funding rate it reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateConvention {
    /// The raw rate covers a fixed period of this many hours.
    FixedPeriod {
        /// Implicit period length in hours.
        hours: f64,
    },
    /// The period varies per symbol and must be resolved separately.
    PerSymbol,
    /// The record's own `period_hours` field scopes the rate.
    SelfReported {
        /// Period assumed when the field is absent.
        default_hours: f64,
    },
}

impl Platform {
    /// Every supported platform, in canonical order.
    pub const ALL: [Platform; 5] = [
        Platform::Binance,
        Platform::Hyperliquid,
        Platform::Bybit,
        Platform::Lighter,
        Platform::Aster,
    ];

    /// The rate convention this platform's raw records follow.
    pub fn rate_convention(&self) -> RateConvention {
        match self {
            Platform::Binance => RateConvention::FixedPeriod { hours: 8.0 },
            Platform::Hyperliquid => RateConvention::FixedPeriod { hours: 1.0 },
            Platform::Bybit => RateConvention::PerSymbol,
            Platform::Lighter => RateConvention::FixedPeriod { hours: 1.0 },
            Platform::Aster => RateConvention::SelfReported { default_hours: 8.0 },
        }
    }

    /// Whether this platform's funding period must be looked up per symbol.
    pub fn has_variable_interval(&self) -> bool {
        matches!(self.rate_convention(), RateConvention::PerSymbol)
    }

    /// Whether open interest is reported in base units (needs mark price to
    /// become USD) rather than already in USD.
    pub fn oi_in_base_units(&self) -> bool {
        matches!(
            self,
            Platform::Binance | Platform::Hyperliquid | Platform::Aster
        )
    }

    /// Whether 24h volume is reported in base units rather than USD.
    pub fn volume_in_base_units(&self) -> bool {
        matches!(self, Platform::Aster)
    }
}

/// One symbol's raw funding snapshot entry, as an adapter returned it.
///
/// Produced fresh on every refresh and discarded once normalized. Numeric
/// fields keep whatever units the exchange uses; unit reconciliation happens
/// in the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFundingRecord {
    /// Platform the record came from.
    pub platform: Platform,
    /// Exchange-native symbol (e.g. "BTCUSDT", "kPEPE", "1000SHIBUSDT").
    pub symbol: String,
    /// Raw funding rate, scoped per the platform's rate convention.
    pub rate: Option<f64>,
    /// Open interest in the platform's native units.
    pub open_interest: Option<f64>,
    /// 24h traded volume in the platform's native units.
    pub volume_24h: Option<f64>,
    /// Current mark price.
    pub mark_price: Option<f64>,
    /// Funding period in hours, for platforms that self-report it.
    pub period_hours: Option<f64>,
}

impl RawFundingRecord {
    /// Create an empty record for a platform/symbol pair.
    pub fn new(platform: Platform, symbol: impl Into<String>) -> Self {
        Self {
            platform,
            symbol: symbol.into(),
            rate: None,
            open_interest: None,
            volume_24h: None,
            mark_price: None,
            period_hours: None,
        }
    }

    /// Set the raw funding rate.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set open interest (native units).
    pub fn with_open_interest(mut self, open_interest: f64) -> Self {
        self.open_interest = Some(open_interest);
        self
    }

    /// Set 24h volume (native units).
    pub fn with_volume_24h(mut self, volume_24h: f64) -> Self {
        self.volume_24h = Some(volume_24h);
        self
    }

    /// Set the mark price.
    pub fn with_mark_price(mut self, mark_price: f64) -> Self {
        self.mark_price = Some(mark_price);
        self
    }

    /// Set the self-reported funding period.
    pub fn with_period_hours(mut self, period_hours: f64) -> Self {
        self.period_hours = Some(period_hours);
        self
    }
}
