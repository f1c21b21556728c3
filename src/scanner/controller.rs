//! The refresh controller: owns the sources, drives their timers, and
//! funnels every outcome through the state reducer.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::exchange::{FundingSource, Platform, RawFundingRecord};
use crate::metrics;
use crate::rates::{canonicalize, normalize, NormalizedRecord};
use crate::resolver::{IntervalCache, IntervalResolver};
use crate::scanner::state::{apply, ScannerEvent, ScannerState};
use crate::screener::{self, PageResult, QueryParams};
use crate::store::{DurableStore, JsonFileStore};

/// Per-platform entry in a status report.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub platform: Platform,
    pub selected: bool,
    pub loading: bool,
    pub record_count: usize,
    pub last_success: Option<String>,
    pub error: Option<String>,
}

/// Point-in-time status of the whole scanner.
#[derive(Debug, Clone, Serialize)]
pub struct ScannerStatus {
    pub loading: bool,
    pub last_updated: Option<String>,
    pub asset_count: usize,
    pub favorites: Vec<String>,
    pub sources: Vec<SourceStatus>,
}

/// Orchestrates periodic snapshot fetches across all configured sources
/// and serves screened pages from the resulting state.
pub struct Scanner {
    sources: BTreeMap<Platform, Arc<dyn FundingSource>>,
    state: RwLock<ScannerState>,
    resolver: Arc<IntervalResolver>,
    favorites_store: Arc<dyn DurableStore<BTreeSet<String>>>,
    fallback_hours: f64,
    default_page_size: usize,
    refresh_interval: Duration,
    enrichment: Mutex<Vec<JoinHandle<usize>>>,
}

impl Scanner {
    /// Build a scanner over explicit sources, resolver, and favorites store.
    pub fn new(
        sources: Vec<Arc<dyn FundingSource>>,
        resolver: Arc<IntervalResolver>,
        favorites_store: Arc<dyn DurableStore<BTreeSet<String>>>,
        config: &Config,
    ) -> Self {
        let sources: BTreeMap<Platform, Arc<dyn FundingSource>> = sources
            .into_iter()
            .map(|source| (source.platform(), source))
            .collect();

        let mut state = ScannerState::new(sources.keys().copied());
        match favorites_store.load() {
            Ok(Some(favorites)) => {
                debug!(count = favorites.len(), "Loaded favorites");
                state.favorites = favorites;
            }
            Ok(None) => {}
            Err(error) => {
                warn!(error = %error, "Failed to load favorites, starting empty");
            }
        }

        Self {
            sources,
            state: RwLock::new(state),
            resolver,
            favorites_store,
            fallback_hours: config.fallback_interval_hours,
            default_page_size: config.default_page_size,
            refresh_interval: config.refresh_interval(),
            enrichment: Mutex::new(Vec::new()),
        }
    }

    /// Build a scanner with file-backed stores at the configured paths.
    pub fn from_config(config: &Config, sources: Vec<Arc<dyn FundingSource>>) -> Self {
        let interval_store = Arc::new(JsonFileStore::new(&config.interval_cache_path));
        let cache = Arc::new(IntervalCache::new(interval_store));
        let resolver = Arc::new(IntervalResolver::new(
            cache,
            config.resolver_workers,
            config.fallback_interval_hours,
        ));
        let favorites_store = Arc::new(JsonFileStore::new(&config.favorites_path));
        Self::new(sources, resolver, favorites_store, config)
    }

    /// Platforms this scanner fetches from.
    pub fn platforms(&self) -> Vec<Platform> {
        self.sources.keys().copied().collect()
    }

    /// The shared interval cache.
    pub fn interval_cache(&self) -> &Arc<IntervalCache> {
        self.resolver.cache()
    }

    /// True once at least one selected source has delivered a snapshot.
    pub async fn ready(&self) -> bool {
        self.state.read().await.last_updated().is_some()
    }

    /// Clone of the current state, mainly for inspection in tests.
    pub async fn snapshot(&self) -> ScannerState {
        self.state.read().await.clone()
    }

    /// Fetch one platform's snapshot and fold the outcome into the state.
    ///
    /// Failures are absorbed: the previous snapshot stays visible and the
    /// error is recorded against the platform.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn refresh_platform(&self, platform: Platform) {
        let Some(source) = self.sources.get(&platform) else {
            warn!("Refresh requested for an unconfigured platform");
            return;
        };

        self.dispatch(ScannerEvent::FetchStarted { platform }).await;
        metrics::inc_snapshot_fetch(platform);
        let start = Instant::now();

        match source.fetch_snapshot().await {
            Ok(raw) => {
                metrics::record_snapshot_fetch_latency(start, platform);
                let records = self.normalize_snapshot(platform, &raw);

                if platform.has_variable_interval() {
                    let unresolved: Vec<String> = raw
                        .iter()
                        .map(|record| record.symbol.clone())
                        .filter(|symbol| !self.interval_cache().contains(platform, symbol))
                        .collect();
                    if !unresolved.is_empty() {
                        self.spawn_enrichment(platform, unresolved, Arc::clone(source));
                    }
                }

                debug!(records = records.len(), "Snapshot refreshed");
                self.dispatch(ScannerEvent::FetchSucceeded {
                    platform,
                    records,
                    at: OffsetDateTime::now_utc(),
                })
                .await;
            }
            Err(error) => {
                metrics::inc_snapshot_failure(platform);
                warn!(error = %error, "Snapshot fetch failed, keeping previous data");
                self.dispatch(ScannerEvent::FetchFailed {
                    platform,
                    error: error.to_string(),
                })
                .await;
            }
        }
    }

    /// Refresh every selected platform concurrently, best effort.
    pub async fn refresh_all(&self) {
        metrics::inc_refresh_all();
        let selected: Vec<Platform> = {
            let state = self.state.read().await;
            state.selected.iter().copied().collect()
        };
        info!(platforms = selected.len(), "Refreshing all selected sources");
        join_all(
            selected
                .into_iter()
                .map(|platform| self.refresh_platform(platform)),
        )
        .await;
    }

    /// Spawn one refresh loop per source. Each loop refreshes immediately,
    /// then on the source's own cadence.
    pub fn spawn_refresh_loops(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        self.sources
            .iter()
            .map(|(platform, source)| {
                let platform = *platform;
                let period = source.refresh_interval().unwrap_or(self.refresh_interval);
                let scanner = Arc::clone(&self);
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                    loop {
                        ticker.tick().await;
                        scanner.refresh_platform(platform).await;
                    }
                })
            })
            .collect()
    }

    /// Wait for any background interval resolution spawned so far.
    ///
    /// The refresh path never blocks on this; one-shot consumers call it
    /// before a follow-up refresh so resolved intervals take effect.
    pub async fn settle_enrichment(&self) {
        let handles: Vec<JoinHandle<usize>> = {
            let mut enrichment = self.enrichment.lock().unwrap();
            enrichment.drain(..).collect()
        };
        for result in join_all(handles).await {
            match result {
                Ok(committed) => debug!(committed, "Interval enrichment settled"),
                Err(error) => warn!(error = %error, "Interval enrichment task failed"),
            }
        }
    }

    /// Evaluate a page query against the current aggregate.
    #[instrument(skip(self, params), fields(page = params.page, search = %params.search))]
    pub async fn page(&self, params: &QueryParams) -> PageResult {
        let _timer = metrics::timer_query();
        let mut params = params.clone();
        params.page_size = Some(params.page_size.unwrap_or(self.default_page_size));

        let state = self.state.read().await;
        screener::query(&state.groups, &params, &state.favorites)
    }

    /// Current status across all sources.
    pub async fn status(&self) -> ScannerStatus {
        let state = self.state.read().await;
        let sources = state
            .sources
            .iter()
            .map(|(platform, source)| SourceStatus {
                platform: *platform,
                selected: state.selected.contains(platform),
                loading: source.in_flight > 0,
                record_count: source.records.len(),
                last_success: source
                    .last_success
                    .and_then(|at| at.format(&Rfc3339).ok()),
                error: source.error.clone(),
            })
            .collect();

        ScannerStatus {
            loading: state.is_loading(),
            last_updated: state
                .last_updated()
                .and_then(|at| at.format(&Rfc3339).ok()),
            asset_count: state.groups.len(),
            favorites: state.favorites.iter().cloned().collect(),
            sources,
        }
    }

    /// Toggle an asset in the favorites set and persist the result.
    /// Returns whether the asset is now a favorite.
    pub async fn toggle_favorite(&self, asset: &str) -> bool {
        let asset = canonicalize(asset);
        self.dispatch(ScannerEvent::FavoriteToggled {
            asset: asset.clone(),
        })
        .await;

        let favorites = {
            let state = self.state.read().await;
            state.favorites.clone()
        };
        if let Err(error) = self.favorites_store.save(&favorites) {
            warn!(error = %error, "Failed to persist favorites");
        }
        favorites.contains(&asset)
    }

    /// Toggle a platform in or out of the selection. Returns the new
    /// selected flag, or `None` for a platform this scanner does not track.
    pub async fn toggle_platform(&self, platform: Platform) -> Option<bool> {
        if !self.sources.contains_key(&platform) {
            return None;
        }
        self.dispatch(ScannerEvent::PlatformToggled { platform })
            .await;
        let state = self.state.read().await;
        Some(state.selected.contains(&platform))
    }

    fn normalize_snapshot(
        &self,
        platform: Platform,
        raw: &[RawFundingRecord],
    ) -> Vec<NormalizedRecord> {
        raw.iter()
            .map(|record| {
                let resolved = if platform.has_variable_interval() {
                    self.interval_cache().get(platform, &record.symbol)
                } else {
                    None
                };
                normalize(record, resolved, self.fallback_hours)
            })
            .collect()
    }

    fn spawn_enrichment(
        &self,
        platform: Platform,
        symbols: Vec<String>,
        source: Arc<dyn FundingSource>,
    ) {
        debug!(
            platform = %platform,
            symbols = symbols.len(),
            "Scheduling interval resolution"
        );
        let resolver = Arc::clone(&self.resolver);
        let handle =
            tokio::spawn(async move { resolver.resolve_batch(platform, symbols, source).await });
        let mut enrichment = self.enrichment.lock().unwrap();
        enrichment.retain(|handle| !handle.is_finished());
        enrichment.push(handle);
    }

    #[cfg(test)]
    fn enrichment_backlog(&self) -> usize {
        self.enrichment.lock().unwrap().len()
    }

    async fn dispatch(&self, event: ScannerEvent) {
        let mut state = self.state.write().await;
        let current = std::mem::take(&mut *state);
        *state = apply(current, event);
        metrics::set_visible_assets(state.groups.len());
    }
}
