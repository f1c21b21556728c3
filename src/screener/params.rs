//! Query parameters and page results for the filter & ranking engine.

use serde::{Deserialize, Serialize};

use crate::spread::AssetGroup;

/// Page size applied when neither the query nor the caller supplies one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Sort key for ranked results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Lexicographic by canonical asset.
    Asset,
    /// Numeric by the group's highest per-hour rate.
    #[default]
    MaxRate,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    /// Ascending.
    Asc,
    /// Descending. The scanner exists to surface wide spreads, so this is
    /// the default.
    #[default]
    Desc,
}

/// Parameters for one page query.
///
/// Every field is optional on the wire; the defaults give "show everything,
/// widest spread first, first page".
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryParams {
    /// Case-insensitive substring match on the asset. Empty matches all.
    #[serde(default)]
    pub search: String,
    /// Restrict to the favorite set.
    #[serde(default)]
    pub favorites_only: bool,
    /// Keep only groups whose APR percentage reaches this value.
    #[serde(default)]
    pub min_apr_pct: Option<f64>,
    /// Per-platform open-interest threshold in USD.
    #[serde(default)]
    pub min_open_interest: Option<f64>,
    /// Per-platform 24h-volume threshold in USD.
    #[serde(default)]
    pub min_volume_24h: Option<f64>,
    /// Sort key.
    #[serde(default)]
    pub sort_by: SortKey,
    /// Sort direction.
    #[serde(default)]
    pub sort_dir: SortDir,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,
    /// Rows per page; the caller's default applies when absent.
    #[serde(default)]
    pub page_size: Option<usize>,
}

fn default_page() -> usize {
    1
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            favorites_only: false,
            min_apr_pct: None,
            min_open_interest: None,
            min_volume_24h: None,
            sort_by: SortKey::default(),
            sort_dir: SortDir::default(),
            page: 1,
            page_size: None,
        }
    }
}

/// One page of ranked results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// Rows on this page, in ranked order.
    pub rows: Vec<AssetGroup>,
    /// Total pages for the full result set, at least 1.
    pub total_pages: usize,
    /// Total rows across all pages.
    pub total_count: usize,
    /// Page actually served, after clamping.
    pub page: usize,
    /// Page size actually applied.
    pub page_size: usize,
}
