use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::entry::PortfolioEntry;
use super::history::PerformanceType;

/// Columns of the holdings table, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    DataSource,
    Ticker,
    Name,
    Shares,
    AvgCost,
    CurrentPrice,
    PreviousClose,
    ChangePercent,
    MarketValue,
    TodayPl,
    Pl,
    PlPercent,
    WhatIf,
    Chart,
    Actions,
}

impl Column {
    pub const ALL: [Column; 15] = [
        Column::DataSource,
        Column::Ticker,
        Column::Name,
        Column::Shares,
        Column::AvgCost,
        Column::CurrentPrice,
        Column::PreviousClose,
        Column::ChangePercent,
        Column::MarketValue,
        Column::TodayPl,
        Column::Pl,
        Column::PlPercent,
        Column::WhatIf,
        Column::Chart,
        Column::Actions,
    ];

    /// Stable key used in markup and in the persisted visibility map.
    pub fn key(&self) -> &'static str {
        match self {
            Column::DataSource => "data_source",
            Column::Ticker => "ticker",
            Column::Name => "name",
            Column::Shares => "shares",
            Column::AvgCost => "avg_cost",
            Column::CurrentPrice => "current_price",
            Column::PreviousClose => "previous_close",
            Column::ChangePercent => "change_percent",
            Column::MarketValue => "market_value",
            Column::TodayPl => "today_pl",
            Column::Pl => "pl",
            Column::PlPercent => "pl_percent",
            Column::WhatIf => "what_if",
            Column::Chart => "chart",
            Column::Actions => "actions",
        }
    }

    pub fn from_key(key: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.key() == key)
    }

    /// Columns rendered from entry data (everything except the
    /// interactive what-if, chart and action cells).
    pub fn is_data(&self) -> bool {
        !matches!(self, Column::WhatIf | Column::Chart | Column::Actions)
    }

    fn sort_value<'a>(&self, entry: &'a PortfolioEntry) -> SortValue<'a> {
        match self {
            Column::DataSource => {
                SortValue::Text(entry.data_source.map(|s| s.label()).unwrap_or(""))
            }
            Column::Ticker => SortValue::Text(&entry.ticker),
            Column::Name => SortValue::Text(&entry.name),
            Column::Shares => SortValue::Number(entry.shares),
            Column::AvgCost => SortValue::Number(entry.avg_cost),
            Column::CurrentPrice => SortValue::Number(entry.current_price),
            Column::PreviousClose => SortValue::Number(entry.previous_close),
            Column::ChangePercent => SortValue::Number(entry.change_percent),
            Column::MarketValue => SortValue::Number(entry.market_value),
            Column::TodayPl => SortValue::Number(entry.today_pl),
            Column::Pl => SortValue::Number(entry.pl),
            Column::PlPercent => SortValue::Number(entry.pl_percent),
            Column::WhatIf | Column::Chart | Column::Actions => SortValue::None,
        }
    }
}

enum SortValue<'a> {
    Text(&'a str),
    Number(f64),
    None,
}

/// Case-folded comparison first, raw comparison as tie-break, so "apple"
/// sorts next to "Apple" rather than after every capitalised name.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Active sort of the holdings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: Column,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: Column::MarketValue,
            direction: SortDirection::Desc,
        }
    }
}

impl SortState {
    pub fn new(key: Column, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Header click: the active key flips direction, a new key is selected
    /// descending.
    pub fn click(&mut self, key: Column) {
        if self.key == key {
            self.direction = self.direction.flipped();
        } else {
            self.key = key;
            self.direction = SortDirection::Desc;
        }
    }

    /// Compare two entries under this sort.
    #[must_use]
    pub fn compare(&self, a: &PortfolioEntry, b: &PortfolioEntry) -> Ordering {
        let ord = match (self.key.sort_value(a), self.key.sort_value(b)) {
            (SortValue::Text(x), SortValue::Text(y)) => compare_text(x, y),
            (SortValue::Number(x), SortValue::Number(y)) => {
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            _ => Ordering::Equal,
        };
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }

    /// Stable sort: entries that compare equal keep their snapshot order.
    #[must_use]
    pub fn sorted(&self, entries: &[PortfolioEntry]) -> Vec<PortfolioEntry> {
        let mut out = entries.to_vec();
        out.sort_by(|a, b| self.compare(a, b));
        out
    }
}

/// Preset windows of the range summary card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuickRange {
    #[default]
    #[serde(rename = "MTD")]
    Mtd,
    #[serde(rename = "YTD")]
    Ytd,
    #[serde(rename = "7D")]
    Days7,
    #[serde(rename = "30D")]
    Days30,
    #[serde(rename = "1Y")]
    Year1,
}

impl QuickRange {
    pub fn label(&self) -> &'static str {
        match self {
            QuickRange::Mtd => "Month to date (MTD)",
            QuickRange::Ytd => "Year to date (YTD)",
            QuickRange::Days7 => "Last 7 days",
            QuickRange::Days30 => "Last 30 days",
            QuickRange::Year1 => "Last year",
        }
    }
}

/// Columns hidden until the user turns them on.
const DEFAULT_HIDDEN: [Column; 3] = [Column::PreviousClose, Column::Chart, Column::DataSource];

/// Per-column visibility, persisted as a `{column_key: bool}` record.
///
/// Stored with string keys so records written by other versions (with
/// columns this build does not know) still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnVisibility {
    visible: BTreeMap<String, bool>,
}

impl Default for ColumnVisibility {
    fn default() -> Self {
        let visible = Column::ALL
            .iter()
            .map(|c| (c.key().to_string(), !DEFAULT_HIDDEN.contains(c)))
            .collect();
        Self { visible }
    }
}

impl ColumnVisibility {
    /// Columns without a stored entry fall back to their default.
    #[must_use]
    pub fn is_visible(&self, column: Column) -> bool {
        self.visible
            .get(column.key())
            .copied()
            .unwrap_or(!DEFAULT_HIDDEN.contains(&column))
    }

    pub fn set(&mut self, column: Column, visible: bool) {
        self.visible.insert(column.key().to_string(), visible);
    }

    /// Columns currently hidden, in display order.
    #[must_use]
    pub fn hidden(&self) -> Vec<Column> {
        Column::ALL
            .iter()
            .copied()
            .filter(|c| !self.is_visible(*c))
            .collect()
    }
}

/// Transient view state of the single active dashboard view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub sort: SortState,
    pub quick_range: QuickRange,
    pub performance_type: PerformanceType,
    pub columns: ColumnVisibility,
}

impl ViewState {
    pub fn with_columns(columns: ColumnVisibility) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }
}
