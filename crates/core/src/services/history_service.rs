use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::DashboardError;
use crate::models::history::{HistoricalSeries, PerformanceType};
use crate::models::view::QuickRange;
use crate::services::format::{format_currency, format_ratio, format_signed_currency};

/// How many calendar days a nearest-date probe inspects, target included.
pub const PROBE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeDirection {
    /// Toward earlier dates (end points, point lookups).
    Backward,
    /// Toward later dates (range start points).
    Forward,
}

/// How a target date was mapped onto the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// The target itself has a record.
    Exact,
    /// Found within the probe window.
    Probed,
    /// Nothing within the window; taken from outside it.
    Fallback,
}

/// A target date resolved to an actual record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub resolution: Resolution,
}

/// Change against an earlier record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub date: NaiveDate,
    pub value: f64,
    pub diff: f64,
    pub ratio: f64,
}

/// Result of looking up a single date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLookup {
    pub requested: NaiveDate,
    pub point: ResolvedPoint,
    /// `None` when the resolved date is the first record of the series.
    pub previous: Option<Comparison>,
}

impl PointLookup {
    /// One-line description of the comparison with the preceding record.
    #[must_use]
    pub fn comparison_message(&self) -> String {
        match &self.previous {
            Some(prev) => format!(
                "Compared with {} ({}): {} ({})",
                prev.date,
                format_currency(prev.value),
                format_signed_currency(prev.diff),
                format_ratio(prev.ratio)
            ),
            None => "This is the first day in the data; there is no earlier record to compare with."
                .to_string(),
        }
    }
}

/// Result of a start/end range query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeResult {
    pub start: ResolvedPoint,
    pub end: ResolvedPoint,
    pub diff: f64,
    pub ratio: f64,
}

/// Result of one of the preset ranges (MTD, YTD, 7D, 30D, 1Y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuickRangeSummary {
    pub range: QuickRange,
    /// `None` when the period has no record yet (e.g. first day of a month
    /// before the close was stored).
    pub start: Option<(NaiveDate, f64)>,
    pub end: (NaiveDate, f64),
    pub diff: Option<f64>,
    pub ratio: Option<f64>,
}

fn ratio(diff: f64, base: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        diff / base
    }
}

/// Point, range and preset-range queries over a sparse daily series.
pub struct HistoryService;

impl HistoryService {
    pub fn new() -> Self {
        Self
    }

    /// Map `target` onto the series.
    ///
    /// Probes day by day in `direction` for up to [`PROBE_WINDOW_DAYS`]. If
    /// the window is empty, a target before the series resolves to its first
    /// record, a target after it to its last, and a target inside a longer
    /// gap to the nearest record in the probe direction.
    pub fn resolve(
        &self,
        series: &HistoricalSeries,
        target: NaiveDate,
        direction: ProbeDirection,
        performance: PerformanceType,
    ) -> Result<ResolvedPoint, DashboardError> {
        let (first, last) = match (series.first(), series.last()) {
            (Some((f, _)), Some((l, _))) => (f, l),
            _ => return Err(DashboardError::NoHistory),
        };

        let step = match direction {
            ProbeDirection::Backward => -1,
            ProbeDirection::Forward => 1,
        };
        for offset in 0..PROBE_WINDOW_DAYS {
            let Some(date) = target.checked_add_signed(Duration::days(offset * step)) else {
                break;
            };
            if let Some(record) = series.get(date) {
                return Ok(ResolvedPoint {
                    date,
                    value: performance.value(record),
                    resolution: if offset == 0 {
                        Resolution::Exact
                    } else {
                        Resolution::Probed
                    },
                });
            }
        }

        let fallback = if target <= first {
            first
        } else if target >= last {
            last
        } else {
            match direction {
                ProbeDirection::Backward => series.preceding(target).map(|(d, _)| d),
                ProbeDirection::Forward => series
                    .iter()
                    .map(|(d, _)| d)
                    .find(|d| *d > target),
            }
            .unwrap_or(first)
        };
        let record = series.get(fallback).ok_or(DashboardError::NoHistory)?;
        Ok(ResolvedPoint {
            date: fallback,
            value: performance.value(record),
            resolution: Resolution::Fallback,
        })
    }

    /// Value on (or nearest before) `date`, with the change versus the
    /// chronologically preceding record.
    pub fn lookup_point(
        &self,
        series: &HistoricalSeries,
        date: NaiveDate,
        performance: PerformanceType,
    ) -> Result<PointLookup, DashboardError> {
        let point = self.resolve(series, date, ProbeDirection::Backward, performance)?;
        let previous = series.preceding(point.date).map(|(prev_date, record)| {
            let value = performance.value(record);
            let diff = point.value - value;
            Comparison {
                date: prev_date,
                value,
                diff,
                ratio: ratio(diff, value),
            }
        });
        Ok(PointLookup {
            requested: date,
            point,
            previous,
        })
    }

    /// Change between `start` and `end`. Both endpoints are resolved
    /// independently: the start probes forward, the end backward.
    ///
    /// Rejects reversed ranges and dates after `today` before touching the
    /// series.
    pub fn lookup_range(
        &self,
        series: &HistoricalSeries,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
        performance: PerformanceType,
    ) -> Result<RangeResult, DashboardError> {
        validate_range(start, end, today)?;

        let start = self.resolve(series, start, ProbeDirection::Forward, performance)?;
        let end = self.resolve(series, end, ProbeDirection::Backward, performance)?;
        let diff = end.value - start.value;
        Ok(RangeResult {
            start,
            end,
            diff,
            ratio: ratio(diff, start.value),
        })
    }

    /// Preset range ending at the latest record.
    pub fn quick_range(
        &self,
        series: &HistoricalSeries,
        range: QuickRange,
        today: NaiveDate,
        performance: PerformanceType,
    ) -> Result<QuickRangeSummary, DashboardError> {
        let (last_date, _) = series.last().ok_or(DashboardError::NoHistory)?;
        let end = self.resolve(series, last_date, ProbeDirection::Backward, performance)?;

        let start = match range {
            QuickRange::Mtd => first_matching(series, performance, |d| {
                d.year() == today.year() && d.month() == today.month()
            }),
            QuickRange::Ytd => first_matching(series, performance, |d| d.year() == today.year()),
            QuickRange::Days7 => self.start_before(series, today - Duration::days(7), performance)?,
            QuickRange::Days30 => {
                self.start_before(series, today - Duration::days(30), performance)?
            }
            QuickRange::Year1 => {
                let target = today
                    .checked_sub_months(Months::new(12))
                    .unwrap_or(today - Duration::days(365));
                self.start_before(series, target, performance)?
            }
        };

        let diff = start.map(|(_, value)| end.value - value);
        Ok(QuickRangeSummary {
            range,
            start,
            end: (end.date, end.value),
            diff,
            ratio: start.zip(diff).map(|((_, value), d)| ratio(d, value)),
        })
    }

    fn start_before(
        &self,
        series: &HistoricalSeries,
        target: NaiveDate,
        performance: PerformanceType,
    ) -> Result<Option<(NaiveDate, f64)>, DashboardError> {
        let point = self.resolve(series, target, ProbeDirection::Backward, performance)?;
        Ok(Some((point.date, point.value)))
    }
}

impl Default for HistoryService {
    fn default() -> Self {
        Self::new()
    }
}

fn first_matching(
    series: &HistoricalSeries,
    performance: PerformanceType,
    predicate: impl Fn(NaiveDate) -> bool,
) -> Option<(NaiveDate, f64)> {
    series
        .iter()
        .find(|(d, _)| predicate(*d))
        .map(|(d, r)| (d, performance.value(r)))
}

/// Date checks shared by range queries and backfill submissions.
pub fn validate_range(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<(), DashboardError> {
    if start > today || end > today {
        return Err(DashboardError::Validation(
            "dates must not be in the future".to_string(),
        ));
    }
    if start > end {
        return Err(DashboardError::Validation(format!(
            "start date ({start}) must not be after end date ({end})"
        )));
    }
    Ok(())
}
