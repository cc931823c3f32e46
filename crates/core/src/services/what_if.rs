use serde::{Deserialize, Serialize};

use crate::models::entry::PortfolioEntry;

/// Outcome of a "what if the price were X" calculation, in home currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub target_value: f64,
    pub diff: f64,
    /// Ratio of `diff` to the current market value (0.1 = 10 %).
    pub ratio: f64,
}

/// Value of `entry` at `target_price`, compared to its current market value.
///
/// Only CNY entries are converted with `cny_rate`; everything else is taken
/// as already in home currency. A missing or non-positive target yields
/// nothing.
#[must_use]
pub fn what_if(entry: &PortfolioEntry, target_price: f64, cny_rate: f64) -> Option<WhatIfResult> {
    if !target_price.is_finite() || target_price <= 0.0 {
        return None;
    }
    let rate = if entry.currency == "CNY" { cny_rate } else { 1.0 };
    let target_value = target_price * entry.shares * rate;
    let diff = target_value - entry.market_value;
    let ratio = if entry.market_value == 0.0 {
        0.0
    } else {
        diff / entry.market_value
    };
    Some(WhatIfResult {
        target_value,
        diff,
        ratio,
    })
}

/// Parse raw input text and run [`what_if`]. Blank or unparsable input
/// yields nothing.
#[must_use]
pub fn what_if_from_input(entry: &PortfolioEntry, input: &str, cny_rate: f64) -> Option<WhatIfResult> {
    let target = input.trim().parse::<f64>().ok()?;
    what_if(entry, target, cny_rate)
}
