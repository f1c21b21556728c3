//! Merging normalized records into per-asset spread groups.

use std::collections::BTreeMap;

use crate::exchange::Platform;
use crate::rates::NormalizedRecord;
use crate::spread::types::{AssetGroup, PlatformEntry};

/// Merge normalized records into one group per canonical asset.
///
/// Pure and synchronous. Output is ordered by asset; groups where fewer
/// than two platforms report a rate are dropped. When one platform lists
/// several contracts folding to the same asset, the first listing wins.
pub fn aggregate(records: &[NormalizedRecord]) -> Vec<AssetGroup> {
    let mut by_asset: BTreeMap<&str, BTreeMap<Platform, PlatformEntry>> = BTreeMap::new();

    for record in records {
        if record.asset.is_empty() {
            continue;
        }
        by_asset
            .entry(record.asset.as_str())
            .or_default()
            .entry(record.platform)
            .or_insert_with(|| {
                PlatformEntry::new(
                    record.rate_per_hour,
                    record.open_interest_usd,
                    record.volume_24h_usd,
                )
            });
    }

    by_asset
        .into_iter()
        .filter_map(|(asset, platforms)| AssetGroup::from_entries(asset.to_string(), platforms))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::RawFundingRecord;
    use crate::rates::normalize;
    use crate::spread::types::HOURS_PER_YEAR;
    use pretty_assertions::assert_eq;

    fn record(
        platform: Platform,
        asset: &str,
        rate: Option<f64>,
        oi: Option<f64>,
    ) -> NormalizedRecord {
        NormalizedRecord {
            platform,
            asset: asset.to_string(),
            rate_per_hour: rate,
            open_interest_usd: oi,
            volume_24h_usd: Some(1_000_000.0),
            mark_price: Some(100.0),
        }
    }

    #[test]
    fn two_fixed_period_platforms_produce_the_expected_spread() {
        // Raw 0.0001 per 8h vs 0.00005 per 1h.
        let raws = [
            RawFundingRecord::new(Platform::Binance, "BTCUSDT").with_rate(0.0001),
            RawFundingRecord::new(Platform::Hyperliquid, "BTC").with_rate(0.00005),
        ];
        let normalized: Vec<NormalizedRecord> =
            raws.iter().map(|raw| normalize(raw, None, 4.0)).collect();

        let groups = aggregate(&normalized);
        assert_eq!(groups.len(), 1);

        let btc = &groups[0];
        assert_eq!(btc.asset, "BTC");
        assert_eq!(btc.max_rate, 0.00005);
        assert_eq!(btc.min_rate, 0.0000125);
        assert!((btc.spread_per_hour - 0.0000375).abs() < 1e-15);
        assert!((btc.apr_percent() - 32.85).abs() < 0.01);
        assert_eq!(btc.short_platform, Platform::Hyperliquid);
        assert_eq!(btc.long_platform, Platform::Binance);
    }

    #[test]
    fn single_sided_assets_are_excluded() {
        let records = vec![
            record(Platform::Binance, "BTC", Some(0.00001), Some(1.0)),
            record(Platform::Hyperliquid, "BTC", Some(0.00002), Some(1.0)),
            record(Platform::Binance, "LONELY", Some(0.00001), Some(1.0)),
            record(Platform::Bybit, "HALF", Some(0.00001), Some(1.0)),
            record(Platform::Lighter, "HALF", None, Some(1.0)),
        ];

        let groups = aggregate(&records);
        let assets: Vec<&str> = groups.iter().map(|g| g.asset.as_str()).collect();
        assert_eq!(assets, vec!["BTC"]);
    }

    #[test]
    fn null_rate_records_still_contribute_liquidity() {
        let records = vec![
            record(Platform::Binance, "ETH", Some(0.00001), Some(100.0)),
            record(Platform::Bybit, "ETH", Some(0.00003), Some(200.0)),
            record(Platform::Lighter, "ETH", None, Some(9_999.0)),
        ];

        let groups = aggregate(&records);
        let eth = &groups[0];
        assert_eq!(eth.checked_count, 3);
        assert_eq!(eth.rate_count(), 2);
        assert_eq!(eth.open_interest, Some(9_999.0));
        // The null-rate platform never sets the spread extremes.
        assert_eq!(eth.short_platform, Platform::Bybit);
        assert_eq!(eth.long_platform, Platform::Binance);
    }

    #[test]
    fn output_is_ordered_by_asset() {
        let records = vec![
            record(Platform::Binance, "SOL", Some(0.00001), None),
            record(Platform::Bybit, "SOL", Some(0.00002), None),
            record(Platform::Binance, "BTC", Some(0.00001), None),
            record(Platform::Bybit, "BTC", Some(0.00002), None),
            record(Platform::Binance, "ETH", Some(0.00001), None),
            record(Platform::Bybit, "ETH", Some(0.00002), None),
        ];

        let groups = aggregate(&records);
        let assets: Vec<&str> = groups.iter().map(|g| g.asset.as_str()).collect();
        assert_eq!(assets, vec!["BTC", "ETH", "SOL"]);
    }

    #[test]
    fn apr_matches_the_spread_for_every_group() {
        let records = vec![
            record(Platform::Binance, "BTC", Some(0.0000125), None),
            record(Platform::Hyperliquid, "BTC", Some(0.00005), None),
            record(Platform::Binance, "SOL", Some(-0.000015), None),
            record(Platform::Lighter, "SOL", Some(-0.000041), None),
        ];

        for group in aggregate(&records) {
            assert!(group.max_rate >= group.min_rate);
            let expected = (group.max_rate - group.min_rate) * HOURS_PER_YEAR;
            assert!((group.apr - expected).abs() < 1e-15, "asset {}", group.asset);
        }
    }

    #[test]
    fn duplicate_listings_on_one_platform_keep_the_first() {
        let mut first = record(Platform::Binance, "BTC", Some(0.00001), Some(111.0));
        first.volume_24h_usd = Some(1.0);
        let second = record(Platform::Binance, "BTC", Some(0.00009), Some(999.0));
        let other = record(Platform::Bybit, "BTC", Some(0.00002), Some(50.0));

        let groups = aggregate(&[first, second, other]);
        let btc = &groups[0];
        assert_eq!(btc.platforms[&Platform::Binance].open_interest, Some(111.0));
        assert_eq!(btc.max_rate, 0.00002);
    }

    #[test]
    fn empty_input_produces_an_empty_valid_result() {
        assert_eq!(aggregate(&[]), Vec::<AssetGroup>::new());
    }
}
