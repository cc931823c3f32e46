use serde::{Deserialize, Serialize};

/// Where the live quote for an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "MIS")]
    Mis,
    #[serde(rename = "Sina")]
    Sina,
    #[serde(rename = "yfinance")]
    YFinance,
    #[serde(other)]
    Unknown,
}

impl DataSource {
    /// Short badge label shown in the source column.
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Mis => "MIS",
            DataSource::Sina => "Sina",
            DataSource::YFinance => "yfinance",
            DataSource::Unknown => "N/A",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One holding as reported by `GET /api/portfolio`.
///
/// Identity is the ticker: it is unique within a snapshot and stable across
/// refreshes. Monetary values (`market_value`, `today_pl`, `pl`) are already
/// converted to the home currency by the backend; `current_price`,
/// `previous_close` and `avg_cost` stay in the entry's own currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub ticker: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub shares: f64,

    #[serde(default)]
    pub avg_cost: f64,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub current_price: f64,

    #[serde(default)]
    pub previous_close: f64,

    /// Day change in percent units (2.5 means +2.5 %).
    #[serde(default)]
    pub change_percent: f64,

    #[serde(default)]
    pub market_value: f64,

    #[serde(default)]
    pub today_pl: f64,

    /// Total P/L.
    #[serde(default)]
    pub pl: f64,

    /// Total P/L in percent units.
    #[serde(default)]
    pub pl_percent: f64,

    #[serde(default)]
    pub data_source: Option<DataSource>,
}

pub(crate) fn default_currency() -> String {
    "TWD".to_string()
}

/// Aggregates for the whole portfolio. The backend answers `{}` for an
/// empty portfolio, so every field defaults to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Totals {
    pub market_value: f64,
    pub cost_basis: f64,
    pub pl: f64,
    pub pl_percent: f64,
    pub today_pl: f64,
    pub daily_diff: f64,
    pub daily_diff_percent: f64,
    pub last_close_value: f64,
    /// Market value of TWD-denominated holdings.
    pub tw_value: f64,
    /// Market value of CNY-denominated holdings, in home currency.
    pub cn_value: f64,
    /// CNY → TWD rate used by the backend for this snapshot.
    pub cny_rate: f64,
}

/// Rate shown in the summary when the backend omits one.
pub const DISPLAY_CNY_RATE_FALLBACK: f64 = 4.4;

impl Totals {
    /// FX rate for what-if conversions; 1.0 when the backend omits it.
    #[must_use]
    pub fn effective_cny_rate(&self) -> f64 {
        self.reported_cny_rate().unwrap_or(1.0)
    }

    /// FX rate for the summary display; [`DISPLAY_CNY_RATE_FALLBACK`] when
    /// the backend omits it.
    #[must_use]
    pub fn display_cny_rate(&self) -> f64 {
        self.reported_cny_rate().unwrap_or(DISPLAY_CNY_RATE_FALLBACK)
    }

    fn reported_cny_rate(&self) -> Option<f64> {
        (self.cny_rate > 0.0).then_some(self.cny_rate)
    }
}

/// One complete fetch of holdings and aggregates. Replaces the previous
/// snapshot wholesale; never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    #[serde(default)]
    pub totals: Totals,

    #[serde(default)]
    pub stocks: Vec<PortfolioEntry>,
}

impl PortfolioSnapshot {
    #[must_use]
    pub fn find(&self, ticker: &str) -> Option<&PortfolioEntry> {
        self.stocks.iter().find(|s| s.ticker == ticker)
    }
}

/// Request body for `POST /api/stock` and `PUT /api/stock/:ticker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub ticker: String,
    pub name: String,
    pub shares: f64,
    pub avg_cost: f64,
    pub currency: String,
}

impl NewEntry {
    pub fn new(
        ticker: impl Into<String>,
        name: impl Into<String>,
        shares: f64,
        avg_cost: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into().trim().to_string(),
            name: name.into(),
            shares,
            avg_cost,
            currency: currency.into().trim().to_uppercase(),
        }
    }
}
