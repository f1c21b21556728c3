//! The source-adapter seam: one implementation per exchange.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::exchange::types::{Platform, RawFundingRecord};

/// A funding-data source for one exchange.
///
/// Implementations wrap whatever transport the exchange needs (REST,
/// websocket snapshots, fixtures). The scanner only ever sees this trait.
#[async_trait]
pub trait FundingSource: Send + Sync {
    /// The platform this source feeds.
    fn platform(&self) -> Platform;

    /// Fetch the current funding snapshot for every listed symbol.
    ///
    /// A partial or failed fetch must return an error; an empty `Ok` means
    /// the exchange genuinely lists nothing.
    async fn fetch_snapshot(&self) -> Result<Vec<RawFundingRecord>, SourceError>;

    /// Look up one symbol's funding interval in hours.
    ///
    /// Only meaningful for platforms with per-symbol funding periods; the
    /// default implementation refuses.
    async fn fetch_funding_interval(&self, symbol: &str) -> Result<f64, SourceError> {
        let _ = symbol;
        Err(SourceError::IntervalUnsupported {
            platform: self.platform(),
        })
    }

    /// Preferred refresh cadence, when the source wants one different from
    /// the configured default.
    fn refresh_interval(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource;

    #[async_trait]
    impl FundingSource for FixedSource {
        fn platform(&self) -> Platform {
            Platform::Binance
        }

        async fn fetch_snapshot(&self) -> Result<Vec<RawFundingRecord>, SourceError> {
            Ok(vec![])
        }
    }

    #[test]
    fn interval_lookup_defaults_to_unsupported() {
        let result = tokio_test::block_on(FixedSource.fetch_funding_interval("BTCUSDT"));
        assert!(matches!(
            result,
            Err(SourceError::IntervalUnsupported {
                platform: Platform::Binance,
            })
        ));
    }

    #[test]
    fn cadence_defaults_to_none() {
        assert_eq!(FixedSource.refresh_interval(), None);
    }
}
