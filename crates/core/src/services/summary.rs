use std::collections::HashMap;

use crate::models::entry::Totals;
use crate::models::rows::SignClass;
use crate::models::settings::Settings;
use crate::services::animation::CountUp;
use crate::services::format::{format_currency, format_number, format_percent};
use crate::services::notifications::{self, Metric};

/// Count-up for one summary figure, with the text it settles on.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTransition {
    pub metric: Metric,
    pub count_up: CountUp,
    pub final_text: String,
}

/// Everything the summary cards need after one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryUpdate {
    pub transitions: Vec<MetricTransition>,
    /// Sign classes that changed since the last update.
    pub sign_classes: Vec<(Metric, SignClass)>,
    /// `(NT$…)` label of the previous close, when it changed.
    pub last_close_label: Option<String>,
    /// Full threshold-marker state.
    pub markers: Vec<(Metric, bool)>,
}

/// Text for `value` in the metric's own unit.
#[must_use]
pub fn format_metric(metric: Metric, value: f64) -> String {
    match metric {
        Metric::PlPercent | Metric::DailyDiffPercent => format_percent(value),
        Metric::CnyRate => format_number(value),
        _ => format_currency(value),
    }
}

/// Summary-card state carried between snapshots.
#[derive(Debug, Clone, Default)]
pub struct SummaryLayer {
    displayed: HashMap<Metric, f64>,
    sign_classes: HashMap<Metric, SignClass>,
    last_close_label: Option<String>,
    last_totals: Option<Totals>,
}

impl SummaryLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals of the most recent update.
    #[must_use]
    pub fn last_totals(&self) -> Option<&Totals> {
        self.last_totals.as_ref()
    }

    /// Value currently shown for `metric`.
    #[must_use]
    pub fn displayed(&self, metric: Metric) -> Option<f64> {
        self.displayed.get(&metric).copied()
    }

    pub fn update(&mut self, totals: &Totals, settings: &Settings) -> SummaryUpdate {
        let transitions = Metric::ALL
            .iter()
            .map(|metric| {
                let end = metric.value(totals);
                let previous = self.displayed.insert(*metric, end);
                MetricTransition {
                    metric: *metric,
                    count_up: CountUp::new(previous, end),
                    final_text: format_metric(*metric, end),
                }
            })
            .collect();

        // P/L and P/L % share the P/L sign; daily diff and its percent share
        // the diff's sign.
        let pl_class = SignClass::of(totals.pl);
        let daily_class = SignClass::of(totals.daily_diff);
        let wanted = [
            (Metric::Pl, pl_class),
            (Metric::PlPercent, pl_class),
            (Metric::DailyDiff, daily_class),
            (Metric::DailyDiffPercent, daily_class),
        ];
        let sign_classes = wanted
            .into_iter()
            .filter(|(metric, class)| self.sign_classes.insert(*metric, *class) != Some(*class))
            .collect();

        let label = format!("({})", format_currency(totals.last_close_value));
        let last_close_label = if self.last_close_label.as_deref() != Some(label.as_str()) {
            self.last_close_label = Some(label.clone());
            Some(label)
        } else {
            None
        };

        self.last_totals = Some(totals.clone());

        SummaryUpdate {
            transitions,
            sign_classes,
            last_close_label,
            markers: notifications::markers(settings, totals),
        }
    }

    /// Re-evaluate the markers against the last totals, e.g. after the
    /// settings changed. Empty before the first update.
    #[must_use]
    pub fn markers(&self, settings: &Settings) -> Vec<(Metric, bool)> {
        self.last_totals
            .as_ref()
            .map(|t| notifications::markers(settings, t))
            .unwrap_or_default()
    }
}
