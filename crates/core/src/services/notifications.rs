use serde::{Deserialize, Serialize};

use crate::models::entry::Totals;
use crate::models::settings::Settings;

/// Aggregate figures shown on the summary cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MarketValue,
    CostBasis,
    Pl,
    PlPercent,
    TwMarketValue,
    CnMarketValue,
    CnyRate,
    DailyDiff,
    DailyDiffPercent,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::MarketValue,
        Metric::CostBasis,
        Metric::Pl,
        Metric::PlPercent,
        Metric::TwMarketValue,
        Metric::CnMarketValue,
        Metric::CnyRate,
        Metric::DailyDiff,
        Metric::DailyDiffPercent,
    ];

    /// Metrics that can carry a threshold marker.
    pub const WATCHED: [Metric; 5] = [
        Metric::MarketValue,
        Metric::TwMarketValue,
        Metric::CnMarketValue,
        Metric::PlPercent,
        Metric::Pl,
    ];

    #[must_use]
    pub fn value(&self, totals: &Totals) -> f64 {
        match self {
            Metric::MarketValue => totals.market_value,
            Metric::CostBasis => totals.cost_basis,
            Metric::Pl => totals.pl,
            Metric::PlPercent => totals.pl_percent,
            Metric::TwMarketValue => totals.tw_value,
            Metric::CnMarketValue => totals.cn_value,
            Metric::CnyRate => totals.display_cny_rate(),
            Metric::DailyDiff => totals.daily_diff,
            Metric::DailyDiffPercent => totals.daily_diff_percent,
        }
    }
}

/// CSS class of the persistent threshold marker.
pub const EXCEEDED_CLASS: &str = "flash-threshold-exceeded";

/// Threshold configured for `metric`, or `None` when notifications are off
/// globally or for this metric.
#[must_use]
pub fn active_threshold(settings: &Settings, metric: Metric) -> Option<f64> {
    if !settings.enable_notifications {
        return None;
    }
    let (enabled, threshold) = match metric {
        Metric::MarketValue => (
            settings.enable_market_value_notification,
            settings.market_value_notification_threshold,
        ),
        Metric::TwMarketValue => (
            settings.enable_tw_market_value_notification,
            settings.tw_market_value_notification_threshold,
        ),
        Metric::CnMarketValue => (
            settings.enable_cn_market_value_notification,
            settings.cn_market_value_notification_threshold,
        ),
        Metric::PlPercent => (
            settings.enable_pl_percent_notification,
            settings.pl_percent_notification_threshold,
        ),
        Metric::Pl => (
            settings.enable_pl_notification,
            settings.pl_notification_threshold,
        ),
        _ => return None,
    };
    enabled.then_some(threshold)
}

/// Whether the marker for `metric` should be shown at `value`.
#[must_use]
pub fn exceeded(settings: &Settings, metric: Metric, value: f64) -> bool {
    active_threshold(settings, metric).is_some_and(|threshold| value.abs() >= threshold)
}

/// Either P/L threshold is exceeded.
#[must_use]
pub fn trigger(settings: &Settings, pl_percent: f64, pl_value: f64) -> bool {
    exceeded(settings, Metric::PlPercent, pl_percent) || exceeded(settings, Metric::Pl, pl_value)
}

/// Desired marker state for every watched metric. Applying the result is
/// idempotent: a marker is present exactly when its entry is `true`.
#[must_use]
pub fn markers(settings: &Settings, totals: &Totals) -> Vec<(Metric, bool)> {
    Metric::WATCHED
        .iter()
        .map(|m| (*m, exceeded(settings, *m, m.value(totals))))
        .collect()
}
