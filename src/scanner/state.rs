//! Scanner state and the event reducer that evolves it.
//!
//! All mutation flows through [`apply`], a pure function from an owned
//! state plus one event to the next state. Readers always observe a
//! complete snapshot: a source's records are replaced wholesale on
//! success and left untouched on failure, never partially written.

use std::collections::{BTreeMap, BTreeSet};

use time::OffsetDateTime;

use crate::exchange::Platform;
use crate::rates::NormalizedRecord;
use crate::spread::{aggregate, AssetGroup};

/// Fetch state for a single platform.
#[derive(Debug, Clone, Default)]
pub struct SourceState {
    /// Last successfully fetched snapshot, normalized.
    pub records: Vec<NormalizedRecord>,
    /// When the last successful fetch completed.
    pub last_success: Option<OffsetDateTime>,
    /// Fetches currently running. Manual and timed refreshes of the same
    /// platform can overlap, so this is a count rather than a flag.
    pub in_flight: usize,
    /// Error from the most recent failed fetch, cleared on success.
    pub error: Option<String>,
}

/// The scanner's full state: per-platform sources, the user's selection
/// and favorites, and the aggregate derived from the selected sources.
#[derive(Debug, Clone, Default)]
pub struct ScannerState {
    pub sources: BTreeMap<Platform, SourceState>,
    pub selected: BTreeSet<Platform>,
    pub favorites: BTreeSet<String>,
    /// Derived from the selected sources' records; rebuilt by the reducer
    /// whenever those inputs change.
    pub groups: Vec<AssetGroup>,
}

impl ScannerState {
    /// Fresh state with every given platform present and selected.
    pub fn new(platforms: impl IntoIterator<Item = Platform>) -> Self {
        let sources: BTreeMap<Platform, SourceState> = platforms
            .into_iter()
            .map(|platform| (platform, SourceState::default()))
            .collect();
        let selected = sources.keys().copied().collect();
        Self {
            sources,
            selected,
            favorites: BTreeSet::new(),
            groups: Vec::new(),
        }
    }

    /// Most recent successful fetch across the selected platforms.
    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        self.selected
            .iter()
            .filter_map(|platform| self.sources.get(platform))
            .filter_map(|source| source.last_success)
            .max()
    }

    /// True while any selected platform has a fetch in flight.
    pub fn is_loading(&self) -> bool {
        self.selected
            .iter()
            .filter_map(|platform| self.sources.get(platform))
            .any(|source| source.in_flight > 0)
    }

    /// Current fetch errors, selected platforms only.
    pub fn errors(&self) -> BTreeMap<Platform, String> {
        self.selected
            .iter()
            .filter_map(|platform| {
                let source = self.sources.get(platform)?;
                let error = source.error.clone()?;
                Some((*platform, error))
            })
            .collect()
    }

    fn rebuild_groups(&mut self) {
        let records: Vec<NormalizedRecord> = self
            .selected
            .iter()
            .filter_map(|platform| self.sources.get(platform))
            .flat_map(|source| source.records.iter().cloned())
            .collect();
        self.groups = aggregate(&records);
    }
}

/// Everything that can happen to the scanner.
#[derive(Debug, Clone)]
pub enum ScannerEvent {
    FetchStarted {
        platform: Platform,
    },
    FetchSucceeded {
        platform: Platform,
        records: Vec<NormalizedRecord>,
        at: OffsetDateTime,
    },
    FetchFailed {
        platform: Platform,
        error: String,
    },
    PlatformToggled {
        platform: Platform,
    },
    FavoriteToggled {
        asset: String,
    },
}

/// Advance the state by one event.
///
/// A failed fetch records the error and keeps the previous snapshot. An
/// event for a platform the state does not track is ignored.
pub fn apply(mut state: ScannerState, event: ScannerEvent) -> ScannerState {
    match event {
        ScannerEvent::FetchStarted { platform } => {
            if let Some(source) = state.sources.get_mut(&platform) {
                source.in_flight += 1;
            }
        }
        ScannerEvent::FetchSucceeded {
            platform,
            records,
            at,
        } => {
            if let Some(source) = state.sources.get_mut(&platform) {
                source.records = records;
                source.last_success = Some(at);
                source.in_flight = source.in_flight.saturating_sub(1);
                source.error = None;
                state.rebuild_groups();
            }
        }
        ScannerEvent::FetchFailed { platform, error } => {
            if let Some(source) = state.sources.get_mut(&platform) {
                source.in_flight = source.in_flight.saturating_sub(1);
                source.error = Some(error);
            }
        }
        ScannerEvent::PlatformToggled { platform } => {
            if state.sources.contains_key(&platform) {
                if !state.selected.remove(&platform) {
                    state.selected.insert(platform);
                }
                state.rebuild_groups();
            }
        }
        ScannerEvent::FavoriteToggled { asset } => {
            if !state.favorites.remove(&asset) {
                state.favorites.insert(asset);
            }
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(platform: Platform, asset: &str, rate: f64) -> NormalizedRecord {
        NormalizedRecord {
            platform,
            asset: asset.to_string(),
            rate_per_hour: Some(rate),
            open_interest_usd: Some(1_000_000.0),
            volume_24h_usd: Some(1_000_000.0),
            mark_price: None,
        }
    }

    fn two_platform_state() -> ScannerState {
        ScannerState::new([Platform::Binance, Platform::Hyperliquid])
    }

    #[test]
    fn fetch_lifecycle_updates_one_source() {
        let state = two_platform_state();
        assert!(!state.is_loading());
        assert!(state.last_updated().is_none());

        let state = apply(
            state,
            ScannerEvent::FetchStarted {
                platform: Platform::Binance,
            },
        );
        assert!(state.is_loading());

        let at = datetime!(2026-08-22 12:00:00 UTC);
        let state = apply(
            state,
            ScannerEvent::FetchSucceeded {
                platform: Platform::Binance,
                records: vec![record(Platform::Binance, "BTC", 0.0001)],
                at,
            },
        );
        assert!(!state.is_loading());
        assert_eq!(state.last_updated(), Some(at));
        assert_eq!(state.sources[&Platform::Binance].records.len(), 1);
        assert!(state.sources[&Platform::Binance].error.is_none());
    }

    #[test]
    fn overlapping_fetches_keep_loading_until_both_finish() {
        let state = apply(
            two_platform_state(),
            ScannerEvent::FetchStarted {
                platform: Platform::Binance,
            },
        );
        let state = apply(
            state,
            ScannerEvent::FetchStarted {
                platform: Platform::Binance,
            },
        );
        assert!(state.is_loading());

        let state = apply(
            state,
            ScannerEvent::FetchSucceeded {
                platform: Platform::Binance,
                records: vec![],
                at: datetime!(2026-08-22 12:00:00 UTC),
            },
        );
        assert!(state.is_loading(), "second fetch still running");

        let state = apply(
            state,
            ScannerEvent::FetchFailed {
                platform: Platform::Binance,
                error: "timeout".to_string(),
            },
        );
        assert!(!state.is_loading());
    }

    #[test]
    fn failure_keeps_the_previous_snapshot() {
        let at = datetime!(2026-08-22 12:00:00 UTC);
        let state = apply(
            two_platform_state(),
            ScannerEvent::FetchSucceeded {
                platform: Platform::Binance,
                records: vec![
                    record(Platform::Binance, "BTC", 0.0001),
                    record(Platform::Binance, "ETH", 0.0002),
                ],
                at,
            },
        );

        let state = apply(
            state,
            ScannerEvent::FetchFailed {
                platform: Platform::Binance,
                error: "connection refused".to_string(),
            },
        );

        let binance = &state.sources[&Platform::Binance];
        assert_eq!(binance.records.len(), 2);
        assert_eq!(binance.last_success, Some(at));
        assert_eq!(binance.error.as_deref(), Some("connection refused"));
        assert_eq!(
            state.errors()[&Platform::Binance],
            "connection refused".to_string()
        );
    }

    #[test]
    fn success_clears_a_previous_error() {
        let state = apply(
            two_platform_state(),
            ScannerEvent::FetchFailed {
                platform: Platform::Binance,
                error: "timeout".to_string(),
            },
        );
        assert_eq!(state.errors().len(), 1);

        let state = apply(
            state,
            ScannerEvent::FetchSucceeded {
                platform: Platform::Binance,
                records: vec![],
                at: datetime!(2026-08-22 12:00:00 UTC),
            },
        );
        assert!(state.errors().is_empty());
        assert!(state.sources[&Platform::Binance].last_success.is_some());
    }

    #[test]
    fn success_replaces_records_wholesale() {
        let state = apply(
            two_platform_state(),
            ScannerEvent::FetchSucceeded {
                platform: Platform::Binance,
                records: vec![
                    record(Platform::Binance, "BTC", 0.0001),
                    record(Platform::Binance, "ETH", 0.0002),
                ],
                at: datetime!(2026-08-22 12:00:00 UTC),
            },
        );

        let state = apply(
            state,
            ScannerEvent::FetchSucceeded {
                platform: Platform::Binance,
                records: vec![record(Platform::Binance, "SOL", 0.0003)],
                at: datetime!(2026-08-22 12:01:00 UTC),
            },
        );

        let binance = &state.sources[&Platform::Binance];
        assert_eq!(binance.records.len(), 1);
        assert_eq!(binance.records[0].asset, "SOL");
    }

    #[test]
    fn empty_snapshot_is_a_success() {
        let state = apply(
            two_platform_state(),
            ScannerEvent::FetchSucceeded {
                platform: Platform::Binance,
                records: vec![],
                at: datetime!(2026-08-22 12:00:00 UTC),
            },
        );

        let binance = &state.sources[&Platform::Binance];
        assert!(binance.records.is_empty());
        assert!(binance.last_success.is_some());
        assert!(binance.error.is_none());
    }

    #[test]
    fn last_updated_is_the_max_over_selected_sources() {
        let earlier = datetime!(2026-08-22 12:00:00 UTC);
        let later = datetime!(2026-08-22 12:05:00 UTC);

        let state = apply(
            two_platform_state(),
            ScannerEvent::FetchSucceeded {
                platform: Platform::Binance,
                records: vec![],
                at: later,
            },
        );
        let state = apply(
            state,
            ScannerEvent::FetchSucceeded {
                platform: Platform::Hyperliquid,
                records: vec![],
                at: earlier,
            },
        );
        assert_eq!(state.last_updated(), Some(later));

        // Deselecting the freshest source changes the answer.
        let state = apply(
            state,
            ScannerEvent::PlatformToggled {
                platform: Platform::Binance,
            },
        );
        assert_eq!(state.last_updated(), Some(earlier));
    }

    #[test]
    fn loading_and_errors_ignore_deselected_sources() {
        let state = apply(
            two_platform_state(),
            ScannerEvent::FetchStarted {
                platform: Platform::Binance,
            },
        );
        let state = apply(
            state,
            ScannerEvent::FetchFailed {
                platform: Platform::Hyperliquid,
                error: "boom".to_string(),
            },
        );
        assert!(state.is_loading());
        assert_eq!(state.errors().len(), 1);

        let state = apply(
            state,
            ScannerEvent::PlatformToggled {
                platform: Platform::Binance,
            },
        );
        let state = apply(
            state,
            ScannerEvent::PlatformToggled {
                platform: Platform::Hyperliquid,
            },
        );
        assert!(!state.is_loading());
        assert!(state.errors().is_empty());
    }

    #[test]
    fn toggling_a_platform_rebuilds_the_aggregate() {
        let at = datetime!(2026-08-22 12:00:00 UTC);
        let state = apply(
            two_platform_state(),
            ScannerEvent::FetchSucceeded {
                platform: Platform::Binance,
                records: vec![record(Platform::Binance, "BTC", 0.0001)],
                at,
            },
        );
        let state = apply(
            state,
            ScannerEvent::FetchSucceeded {
                platform: Platform::Hyperliquid,
                records: vec![record(Platform::Hyperliquid, "BTC", 0.00005)],
                at,
            },
        );
        assert_eq!(state.groups.len(), 1);

        // One platform left: BTC no longer has two rates to compare.
        let state = apply(
            state,
            ScannerEvent::PlatformToggled {
                platform: Platform::Hyperliquid,
            },
        );
        assert!(state.groups.is_empty());

        let state = apply(
            state,
            ScannerEvent::PlatformToggled {
                platform: Platform::Hyperliquid,
            },
        );
        assert_eq!(state.groups.len(), 1);
    }

    #[test]
    fn favorites_toggle_on_and_off() {
        let state = apply(
            two_platform_state(),
            ScannerEvent::FavoriteToggled {
                asset: "BTC".to_string(),
            },
        );
        assert!(state.favorites.contains("BTC"));

        let state = apply(
            state,
            ScannerEvent::FavoriteToggled {
                asset: "BTC".to_string(),
            },
        );
        assert!(!state.favorites.contains("BTC"));
    }

    #[test]
    fn events_for_unknown_platforms_are_ignored() {
        let state = apply(
            two_platform_state(),
            ScannerEvent::FetchSucceeded {
                platform: Platform::Aster,
                records: vec![record(Platform::Aster, "BTC", 0.0001)],
                at: datetime!(2026-08-22 12:00:00 UTC),
            },
        );
        assert!(!state.sources.contains_key(&Platform::Aster));
        assert!(state.groups.is_empty());
    }
}
