use std::collections::HashMap;

use crate::models::history::ClosePoint;

/// A rendered per-entity price chart, owned by whatever charting backend
/// the host uses. The core only ever renders into it or destroys it.
///
/// Native charts must be `Send` so the dashboard can be shared across
/// tasks; browser chart handles are not, so the bound is dropped on wasm.
#[cfg(not(target_arch = "wasm32"))]
pub trait ChartResource: Send {
    fn render(&mut self, history: &[ClosePoint]);

    fn destroy(&mut self);
}

#[cfg(target_arch = "wasm32")]
pub trait ChartResource {
    fn render(&mut self, history: &[ClosePoint]);

    fn destroy(&mut self);
}

/// Live chart resources keyed by ticker.
///
/// The reconciler disposes the entry for a ticker when that ticker's rows
/// leave the table, so a chart never outlives its detail row.
#[derive(Default)]
pub struct ChartRegistry {
    charts: HashMap<String, Box<dyn ChartResource>>,
}

impl std::fmt::Debug for ChartRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tickers: Vec<&String> = self.charts.keys().collect();
        tickers.sort();
        f.debug_struct("ChartRegistry")
            .field("tickers", &tickers)
            .finish()
    }
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a chart to a ticker and draw it. A chart already attached to
    /// the ticker is destroyed first.
    pub fn attach(
        &mut self,
        ticker: &str,
        mut chart: Box<dyn ChartResource>,
        history: &[ClosePoint],
    ) {
        self.dispose(ticker);
        chart.render(history);
        self.charts.insert(ticker.to_string(), chart);
    }

    /// Redraw an attached chart. Returns `false` if none is attached.
    pub fn render(&mut self, ticker: &str, history: &[ClosePoint]) -> bool {
        match self.charts.get_mut(ticker) {
            Some(chart) => {
                chart.render(history);
                true
            }
            None => false,
        }
    }

    /// Destroy and forget the chart for `ticker`, if any.
    pub fn dispose(&mut self, ticker: &str) -> bool {
        match self.charts.remove(ticker) {
            Some(mut chart) => {
                chart.destroy();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contains(&self, ticker: &str) -> bool {
        self.charts.contains_key(ticker)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.charts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}
