use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily aggregate record stored by the backend for one trading day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDailyRecord")]
pub struct DailyRecord {
    pub total: f64,
    pub tw_value: f64,
    pub cn_value: f64,
}

impl DailyRecord {
    pub fn new(total: f64, tw_value: f64, cn_value: f64) -> Self {
        Self {
            total,
            tw_value,
            cn_value,
        }
    }
}

/// Older history files stored a bare number (the total) per day. Missing
/// and null figures read as 0.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDailyRecord {
    Record {
        #[serde(default)]
        total: Option<f64>,
        #[serde(default)]
        tw_value: Option<f64>,
        #[serde(default)]
        cn_value: Option<f64>,
    },
    Total(f64),
}

impl From<RawDailyRecord> for DailyRecord {
    fn from(raw: RawDailyRecord) -> Self {
        match raw {
            RawDailyRecord::Record {
                total,
                tw_value,
                cn_value,
            } => DailyRecord::new(
                total.unwrap_or(0.0),
                tw_value.unwrap_or(0.0),
                cn_value.unwrap_or(0.0),
            ),
            RawDailyRecord::Total(total) => DailyRecord::new(total, 0.0, 0.0),
        }
    }
}

/// Which slice of the portfolio a history figure refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceType {
    #[default]
    Total,
    Tw,
    Cn,
}

impl PerformanceType {
    #[must_use]
    pub fn value(&self, record: &DailyRecord) -> f64 {
        match self {
            PerformanceType::Total => record.total,
            PerformanceType::Tw => record.tw_value,
            PerformanceType::Cn => record.cn_value,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceType::Total => "Total",
            PerformanceType::Tw => "Taiwan",
            PerformanceType::Cn => "China",
        }
    }
}

/// Sparse date → record mapping. Trading-day gaps are normal.
///
/// Immutable once fetched; a refresh replaces the whole series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoricalSeries {
    records: BTreeMap<NaiveDate, DailyRecord>,
}

impl HistoricalSeries {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.records.get(&date)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn first(&self) -> Option<(NaiveDate, &DailyRecord)> {
        self.records.iter().next().map(|(d, r)| (*d, r))
    }

    #[must_use]
    pub fn last(&self) -> Option<(NaiveDate, &DailyRecord)> {
        self.records.iter().next_back().map(|(d, r)| (*d, r))
    }

    /// The record dated immediately before `date`, if any.
    #[must_use]
    pub fn preceding(&self, date: NaiveDate) -> Option<(NaiveDate, &DailyRecord)> {
        self.records.range(..date).next_back().map(|(d, r)| (*d, r))
    }

    /// Records in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &DailyRecord)> {
        self.records.iter().map(|(d, r)| (*d, r))
    }
}

impl FromIterator<(NaiveDate, DailyRecord)> for HistoricalSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, DailyRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Response of `GET /api/history_summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    #[serde(default)]
    pub daily: HistoricalSeries,
}

/// One closing price in a per-ticker history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Response of `GET /api/stock_history/:ticker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockHistory {
    pub status: String,

    #[serde(default)]
    pub history: Vec<ClosePoint>,

    #[serde(default)]
    pub message: Option<String>,
}
