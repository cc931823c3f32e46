use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Colour theme of the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// User-configurable settings, persisted as one JSON record.
///
/// Every field carries its own default, so a stored record with missing or
/// unrecognised keys still loads: missing keys take the default, unknown keys
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Portfolio polling interval in milliseconds. Zero disables polling.
    pub update_interval: u64,

    /// Lookback window of the history chart, in days.
    pub chart_time_range: u32,

    pub show_total_series: bool,
    pub show_tw_series: bool,
    pub show_cn_series: bool,

    pub theme: Theme,

    /// Master switch for every threshold notification below.
    pub enable_notifications: bool,

    pub enable_market_value_notification: bool,
    pub market_value_notification_threshold: f64,

    pub enable_tw_market_value_notification: bool,
    pub tw_market_value_notification_threshold: f64,

    pub enable_cn_market_value_notification: bool,
    pub cn_market_value_notification_threshold: f64,

    pub enable_pl_percent_notification: bool,
    pub pl_percent_notification_threshold: f64,

    pub enable_pl_notification: bool,
    pub pl_notification_threshold: f64,

    pub debug_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            update_interval: 5000,
            chart_time_range: 90,
            show_total_series: true,
            show_tw_series: true,
            show_cn_series: true,
            theme: Theme::Light,
            enable_notifications: false,
            enable_market_value_notification: false,
            market_value_notification_threshold: 1_000_000.0,
            enable_tw_market_value_notification: false,
            tw_market_value_notification_threshold: 500_000.0,
            enable_cn_market_value_notification: false,
            cn_market_value_notification_threshold: 500_000.0,
            enable_pl_percent_notification: true,
            pl_percent_notification_threshold: 1.0,
            enable_pl_notification: false,
            pl_notification_threshold: 1000.0,
            debug_mode: false,
        }
    }
}

impl Settings {
    /// Polling period, or `None` when polling is disabled.
    #[must_use]
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.update_interval > 0).then(|| Duration::from_millis(self.update_interval))
    }
}
