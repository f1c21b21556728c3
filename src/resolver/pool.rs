//! Bounded-concurrency resolution of per-symbol funding intervals.
//!
//! A batch fills a shared queue and runs a fixed-size pool of workers over
//! it. Each new batch bumps a monotonically increasing epoch: workers from a
//! superseded batch stop pulling, and any lookup already in flight finishes
//! but commits nothing. The pipeline never waits on this pool; unresolved
//! symbols normalize against the fallback interval until a later cycle.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::exchange::{FundingSource, Platform};
use crate::metrics;
use crate::resolver::cache::IntervalCache;

/// Funding-interval resolver with a bounded worker pool.
pub struct IntervalResolver {
    cache: Arc<IntervalCache>,
    workers: usize,
    fallback_hours: f64,
    epoch: AtomicU64,
    queue: Mutex<VecDeque<String>>,
}

impl IntervalResolver {
    /// Create a resolver over a shared cache.
    pub fn new(cache: Arc<IntervalCache>, workers: usize, fallback_hours: f64) -> Self {
        Self {
            cache,
            workers: workers.max(1),
            fallback_hours,
            epoch: AtomicU64::new(0),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// The shared interval cache.
    pub fn cache(&self) -> &Arc<IntervalCache> {
        &self.cache
    }

    /// Epoch of the most recent batch. Monotonically increasing.
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Resolve a batch of symbols for one platform.
    ///
    /// Already-cached and duplicate symbols are skipped. Supersedes any
    /// batch still running: its queued symbols are dropped and its in-flight
    /// lookups commit nothing. Returns the number of entries committed.
    #[instrument(skip(self, source), fields(platform = %platform, submitted = symbols.len()))]
    pub async fn resolve_batch(
        &self,
        platform: Platform,
        symbols: Vec<String>,
        source: Arc<dyn FundingSource>,
    ) -> usize {
        let mut seen = HashSet::new();
        let pending: Vec<String> = symbols
            .into_iter()
            .filter(|symbol| seen.insert(symbol.clone()))
            .filter(|symbol| !self.cache.contains(platform, symbol))
            .collect();

        // The epoch bumps even when nothing is left to resolve: a new
        // cycle makes the previous batch's unstarted symbols stale.
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let queued = pending.len();
        {
            let mut queue = self.queue.lock().unwrap();
            queue.clear();
            queue.extend(pending);
        }

        if queued == 0 {
            return 0;
        }

        let workers = self.workers.min(queued);
        debug!(queued, workers, epoch, "Resolving funding intervals");

        let committed: usize = join_all(
            (0..workers).map(|_| self.run_worker(platform, Arc::clone(&source), epoch)),
        )
        .await
        .into_iter()
        .sum();

        metrics::set_interval_cache_entries(self.cache.len());
        debug!(committed, epoch, "Interval batch finished");
        committed
    }

    /// One worker: pull symbols until the queue empties or the batch is
    /// superseded.
    async fn run_worker(
        &self,
        platform: Platform,
        source: Arc<dyn FundingSource>,
        epoch: u64,
    ) -> usize {
        let mut committed = 0;

        loop {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                break;
            }

            let symbol = { self.queue.lock().unwrap().pop_front() };
            let Some(symbol) = symbol else { break };

            metrics::inc_interval_lookup();
            let hours = match source.fetch_funding_interval(&symbol).await {
                Ok(hours) if hours.is_finite() && hours > 0.0 => hours,
                Ok(hours) => {
                    warn!(
                        symbol = %symbol,
                        hours,
                        fallback = self.fallback_hours,
                        "Unusable funding interval, caching fallback"
                    );
                    metrics::inc_interval_lookup_failure();
                    self.fallback_hours
                }
                Err(error) => {
                    // Caching the fallback stops every later cycle from
                    // retrying a symbol the exchange refuses to answer for.
                    warn!(
                        symbol = %symbol,
                        error = %error,
                        fallback = self.fallback_hours,
                        "Interval lookup failed, caching fallback"
                    );
                    metrics::inc_interval_lookup_failure();
                    self.fallback_hours
                }
            };

            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!(symbol = %symbol, "Dropping superseded interval resolution");
                break;
            }

            self.cache.put(platform, &symbol, hours);
            committed += 1;
        }

        committed
    }
}
