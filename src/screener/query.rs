//! The filter & ranking engine: search, thresholds, sort, paginate.
//!
//! Pure and synchronous; identical inputs give identical pages. The
//! liquidity thresholds apply per platform, not per asset, and visibility
//! and tradeability deliberately sit at different bars: one passing entry
//! keeps a row visible, two make its spread executable.

use std::collections::BTreeSet;

use crate::screener::params::{PageResult, QueryParams, SortDir, SortKey, DEFAULT_PAGE_SIZE};
use crate::spread::AssetGroup;

/// Evaluate one page query against the current aggregate.
pub fn query(
    groups: &[AssetGroup],
    params: &QueryParams,
    favorites: &BTreeSet<String>,
) -> PageResult {
    let needle = params.search.trim().to_lowercase();

    let mut rows: Vec<AssetGroup> = groups
        .iter()
        .filter(|group| needle.is_empty() || group.asset.to_lowercase().contains(&needle))
        .filter(|group| !params.favorites_only || favorites.contains(&group.asset))
        .cloned()
        .collect();

    for row in &mut rows {
        apply_thresholds(row, params.min_open_interest, params.min_volume_24h);
    }
    rows.retain(|row| row.pass_count >= 1);

    if let Some(min_apr_pct) = params.min_apr_pct {
        rows.retain(|row| row.apr_percent() >= min_apr_pct);
    }

    sort_rows(&mut rows, params.sort_by, params.sort_dir);

    paginate(
        rows,
        params.page,
        params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    )
}

/// Recompute the per-query threshold fields on one row.
fn apply_thresholds(
    group: &mut AssetGroup,
    min_open_interest: Option<f64>,
    min_volume_24h: Option<f64>,
) {
    group.checked_count = group.platforms.len();
    group.pass_count = if min_open_interest.is_none() && min_volume_24h.is_none() {
        // Everything trivially passes, keeping the viability flag
        // comparable between filtered and unfiltered states.
        group.checked_count
    } else {
        group
            .platforms
            .values()
            .filter(|entry| entry.passes(min_open_interest, min_volume_24h))
            .count()
    };
    group.meets_arb_threshold = group.pass_count >= 2;
}

/// Stable sort; ties keep the aggregate's original order in both
/// directions, so equal values never jitter between refreshes.
fn sort_rows(rows: &mut [AssetGroup], key: SortKey, dir: SortDir) {
    rows.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Asset => a.asset.cmp(&b.asset),
            SortKey::MaxRate => a.max_rate.total_cmp(&b.max_rate),
        };
        match dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });
}

fn paginate(rows: Vec<AssetGroup>, requested_page: usize, page_size: usize) -> PageResult {
    let page_size = page_size.max(1);
    let total_count = rows.len();
    let total_pages = total_count.div_ceil(page_size).max(1);

    // An out-of-range request resets to the first page, not the last, which
    // is what a shrinking result set should feel like.
    let page = if requested_page == 0 || requested_page > total_pages {
        1
    } else {
        requested_page
    };

    let rows: Vec<AssetGroup> = rows
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    PageResult {
        rows,
        total_pages,
        total_count,
        page,
        page_size,
    }
}
