//! Canonical asset identity across differently-named listings.
//!
//! Exchanges disagree on contract naming: "BTCUSDT", "BTC", "XBTUSD" and
//! "BTC-PERP" are the same instrument. Matching them requires folding every
//! listing to one canonical asset string.

use once_cell::sync::Lazy;
use regex::Regex;

/// Multiplier prefixes some venues bake into contract names ("1000PEPE").
static MULTIPLIER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:1000)+").expect("valid regex"));

/// Quote-currency and contract-style suffixes stripped during folding.
const STRIPPED_SUFFIXES: [&str; 4] = ["USDT", "USDC", "PERP", "USD"];

/// Separator characters allowed between base and quote parts.
const SEPARATORS: [char; 3] = ['-', '_', '/'];

/// Fold an exchange-native symbol into its canonical asset identity.
///
/// Deterministic and pure: two listings of the same instrument on different
/// exchanges fold to the same string. Unrecognized symbols pass through
/// uppercased rather than failing.
pub fn canonicalize(symbol: &str) -> String {
    let trimmed = symbol.trim();

    // Hyperliquid-style thousand prefix is a lowercase 'k' glued onto an
    // uppercase base ("kPEPE"); a leading uppercase 'K' is part of the name
    // ("KAVA").
    let dekilod = match trimmed.strip_prefix('k') {
        Some(rest) if rest.chars().next().is_some_and(|c| c.is_ascii_uppercase()) => rest,
        _ => trimmed,
    };

    let mut asset = dekilod.to_ascii_uppercase();

    loop {
        let len_before = asset.len();
        while asset.ends_with(&SEPARATORS[..]) {
            asset.pop();
        }
        for suffix in STRIPPED_SUFFIXES {
            if asset.len() > suffix.len() && asset.ends_with(suffix) {
                asset.truncate(asset.len() - suffix.len());
                break;
            }
        }
        if asset.len() == len_before {
            break;
        }
    }

    let stripped = MULTIPLIER_PREFIX.replace(&asset, "");
    if !stripped.is_empty() {
        asset = stripped.into_owned();
    }

    if asset.is_empty() {
        return trimmed.to_ascii_uppercase();
    }

    alias(&asset).to_string()
}

/// Known aliases for the same underlying asset.
fn alias(base: &str) -> &str {
    match base {
        "XBT" | "WBTC" => "BTC",
        "WETH" => "ETH",
        _ => base,
    }
}
