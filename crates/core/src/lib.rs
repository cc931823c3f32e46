pub mod client;
pub mod errors;
pub mod models;
pub mod services;
pub mod storage;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::NaiveDate;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use client::api::DashboardApi;
use client::transport::HttpTransport;
use errors::DashboardError;
use models::{
    entry::{NewEntry, PortfolioSnapshot},
    history::{HistoricalSeries, PerformanceType},
    rows::{RowArena, RowMutation, RowSink},
    settings::Settings,
    view::{Column, ColumnVisibility, QuickRange, ViewState},
};
use services::{
    animation::FlashSchedule,
    backfill::{BackfillOutcome, BackfillPolicy, BackfillRunner},
    charts::{ChartRegistry, ChartResource},
    gate::BusyGate,
    history_service::{HistoryService, PointLookup, QuickRangeSummary, RangeResult},
    notifications::Metric,
    reconciler::Reconciler,
    summary::{SummaryLayer, SummaryUpdate},
    what_if::{what_if_from_input, WhatIfResult},
};
use storage::{settings_store::SettingsStore, store::KeyValueStore};

/// Everything the dashboard keeps between events, in one place.
#[derive(Debug, Default)]
pub struct AppState {
    pub settings: Settings,
    pub view: ViewState,
    pub arena: RowArena,
    pub charts: ChartRegistry,
    pub reconciler: Reconciler,
    pub summary: SummaryLayer,
    pub flashes: FlashSchedule,
    /// Last snapshot received, unsorted as delivered.
    pub snapshot: Option<PortfolioSnapshot>,
    pub history: HistoricalSeries,
    /// Set once a poll exhausts its retries; cleared by
    /// [`PortfolioDashboard::resume_polling`].
    pub polling_stopped: bool,
}

impl AppState {
    pub fn new(settings: Settings, columns: ColumnVisibility) -> Self {
        Self {
            settings,
            view: ViewState::with_columns(columns),
            ..Self::default()
        }
    }

    /// Sort the cached snapshot under the current view and reconcile the
    /// table against it.
    fn rerender(&mut self) -> Vec<RowMutation> {
        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };
        let sorted = self.view.sort.sorted(&snapshot.stocks);
        let mutations = self
            .reconciler
            .reconcile(&mut self.arena, &sorted, &mut self.charts);
        self.flashes.track(&mutations, Instant::now());
        mutations
    }
}

/// Result of one scheduled poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Updated {
        mutations: Vec<RowMutation>,
        summary: SummaryUpdate,
    },
    /// A previous poll was still in flight.
    Skipped,
    /// Polling was stopped after an exhausted request.
    Stopped,
}

/// Main entry point of the dashboard core.
/// Owns the backend client and the explicit application state.
#[must_use]
pub struct PortfolioDashboard<T: HttpTransport> {
    api: DashboardApi<T>,
    poll_gate: BusyGate,
    backfill: BackfillRunner,
    history_service: HistoryService,
    state: Mutex<AppState>,
}

impl<T: HttpTransport> std::fmt::Debug for PortfolioDashboard<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("PortfolioDashboard")
            .field("rows", &state.arena.len())
            .field("charts", &state.charts.len())
            .field("polling_stopped", &state.polling_stopped)
            .field("poll_in_flight", &self.poll_gate.is_busy())
            .finish()
    }
}

impl<T: HttpTransport> PortfolioDashboard<T> {
    pub fn new(api: DashboardApi<T>, settings: Settings, columns: ColumnVisibility) -> Self {
        Self {
            api,
            poll_gate: BusyGate::new(),
            backfill: BackfillRunner::new(BackfillPolicy::default()),
            history_service: HistoryService::new(),
            state: Mutex::new(AppState::new(settings, columns)),
        }
    }

    /// Start from whatever the store holds; missing or corrupt records fall
    /// back to defaults.
    pub fn from_store<S: KeyValueStore>(api: DashboardApi<T>, store: &SettingsStore<S>) -> Self {
        Self::new(api, store.load_settings(), store.load_columns())
    }

    pub fn with_backfill_policy(mut self, policy: BackfillPolicy) -> Self {
        self.backfill = BackfillRunner::new(policy);
        self
    }

    fn state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn api(&self) -> &DashboardApi<T> {
        &self.api
    }

    /// Read access to the full state.
    pub fn with_state<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.state())
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.state().settings.clone()
    }

    #[must_use]
    pub fn view(&self) -> ViewState {
        self.state().view.clone()
    }

    #[must_use]
    pub fn is_polling_stopped(&self) -> bool {
        self.state().polling_stopped
    }

    // ── Polling ─────────────────────────────────────────────────────

    /// Fetch the portfolio and bring the table and summary up to date.
    ///
    /// Skipped while another poll is in flight. An exhausted request stops
    /// polling and is returned; later polls report `Stopped` until
    /// [`Self::resume_polling`].
    pub async fn poll(&self) -> Result<PollOutcome, DashboardError> {
        if self.is_polling_stopped() {
            return Ok(PollOutcome::Stopped);
        }
        let Some(_permit) = self.poll_gate.try_acquire() else {
            debug!("poll skipped, previous poll still in flight");
            return Ok(PollOutcome::Skipped);
        };

        let snapshot = match self.api.portfolio().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if e.is_exhausted() {
                    error!(error = %e, "stopping automatic polling");
                    self.state().polling_stopped = true;
                }
                return Err(e);
            }
        };

        let mut state = self.state();
        let summary = {
            let AppState {
                summary, settings, ..
            } = &mut *state;
            summary.update(&snapshot.totals, settings)
        };
        state.snapshot = Some(snapshot);
        let mutations = state.rerender();
        Ok(PollOutcome::Updated { mutations, summary })
    }

    /// Poll on the configured interval until polling stops, handing every
    /// result to `on_result`.
    ///
    /// Returns at once when the interval is 0. The interval is re-read
    /// after every poll, so a settings change takes effect on the next tick
    /// and setting it to 0 ends the loop. An exhausted request ends the
    /// loop after its error is delivered.
    pub async fn run_polling<F>(&self, mut on_result: F)
    where
        F: FnMut(Result<PollOutcome, DashboardError>),
    {
        let Some(mut period) = self.settings().poll_interval() else {
            info!("automatic polling disabled");
            return;
        };
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            let result = self.poll().await;
            let stopped = matches!(result, Ok(PollOutcome::Stopped)) || self.is_polling_stopped();
            on_result(result);
            if stopped {
                info!("automatic polling ended");
                return;
            }

            match self.settings().poll_interval() {
                None => {
                    info!("automatic polling disabled");
                    return;
                }
                Some(next) if next != period => {
                    debug!(interval_ms = next.as_millis() as u64, "poll interval changed");
                    period = next;
                    timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                }
                Some(_) => {}
            }
        }
    }

    /// Manual recovery after polling was stopped.
    pub fn resume_polling(&self) {
        self.state().polling_stopped = false;
        info!("automatic polling resumed");
    }

    /// Flash clears due at `now`, already applied to the table.
    pub fn due_flash_clears(&self, now: Instant) -> Vec<RowMutation> {
        let mut state = self.state();
        let due = state.flashes.due(now);
        for mutation in &due {
            state.arena.apply(mutation);
        }
        due
    }

    // ── View ────────────────────────────────────────────────────────

    /// Header click on `column`: update the sort and re-reconcile the
    /// cached snapshot. Columns that do not sort are ignored.
    pub fn resort(&self, column: Column) -> Vec<RowMutation> {
        if !column.is_data() {
            return Vec::new();
        }
        let mut state = self.state();
        state.view.sort.click(column);
        state.rerender()
    }

    /// Replace the settings and re-evaluate the notification markers.
    pub fn apply_settings(&self, settings: Settings) -> Vec<(Metric, bool)> {
        let mut state = self.state();
        state.settings = settings;
        state.summary.markers(&state.settings)
    }

    /// Persist the current settings and column visibility.
    pub fn save_settings<S: KeyValueStore>(
        &self,
        store: &mut SettingsStore<S>,
    ) -> Result<(), DashboardError> {
        let state = self.state();
        store.save_settings(&state.settings)?;
        store.save_columns(&state.view.columns)
    }

    pub fn set_column_visible(&self, column: Column, visible: bool) -> ColumnVisibility {
        let mut state = self.state();
        state.view.columns.set(column, visible);
        state.view.columns.clone()
    }

    /// Record the what-if input of `ticker` and evaluate it against the
    /// latest snapshot. Blank or invalid input yields `Ok(None)`.
    pub fn what_if(&self, ticker: &str, input: &str) -> Result<Option<WhatIfResult>, DashboardError> {
        let mut state = self.state();
        let (entry, cny_rate) = {
            let snapshot = state
                .snapshot
                .as_ref()
                .ok_or_else(|| DashboardError::UnknownTicker(ticker.to_string()))?;
            let entry = snapshot
                .find(ticker)
                .cloned()
                .ok_or_else(|| DashboardError::UnknownTicker(ticker.to_string()))?;
            (entry, snapshot.totals.effective_cny_rate())
        };
        state.arena.set_what_if_input(ticker, input);
        Ok(what_if_from_input(&entry, input, cny_rate))
    }

    // ── Charts ──────────────────────────────────────────────────────

    /// Fetch `ticker`'s price history, draw it into `chart` and expand the
    /// detail row.
    pub async fn open_chart(
        &self,
        ticker: &str,
        chart: Box<dyn ChartResource>,
    ) -> Result<(), DashboardError> {
        let history = self.api.stock_history(ticker).await?;
        let mut state = self.state();
        if !state.arena.set_expanded(ticker, true) {
            return Err(DashboardError::UnknownTicker(ticker.to_string()));
        }
        state.charts.attach(ticker, chart, &history);
        Ok(())
    }

    /// Refetch `ticker`'s price history and redraw its attached chart.
    /// Returns `false`, without fetching, when no chart is attached.
    pub async fn refresh_chart(&self, ticker: &str) -> Result<bool, DashboardError> {
        if !self.state().charts.contains(ticker) {
            return Ok(false);
        }
        let history = self.api.stock_history(ticker).await?;
        Ok(self.state().charts.render(ticker, &history))
    }

    /// Collapse the detail row and dispose its chart.
    pub fn close_chart(&self, ticker: &str) -> bool {
        let mut state = self.state();
        state.arena.set_expanded(ticker, false);
        state.charts.dispose(ticker)
    }

    // ── History ─────────────────────────────────────────────────────

    /// Reload the daily history series.
    pub async fn refresh_history(&self) -> Result<usize, DashboardError> {
        let summary = self.api.history_summary().await?;
        let len = summary.daily.len();
        self.state().history = summary.daily;
        Ok(len)
    }

    pub fn set_performance_type(&self, performance: PerformanceType) {
        self.state().view.performance_type = performance;
    }

    pub fn lookup_point(&self, date: NaiveDate) -> Result<PointLookup, DashboardError> {
        let state = self.state();
        self.history_service
            .lookup_point(&state.history, date, state.view.performance_type)
    }

    pub fn lookup_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<RangeResult, DashboardError> {
        let state = self.state();
        self.history_service.lookup_range(
            &state.history,
            start,
            end,
            today,
            state.view.performance_type,
        )
    }

    /// Select a preset range and summarise it.
    pub fn quick_range(
        &self,
        range: QuickRange,
        today: NaiveDate,
    ) -> Result<QuickRangeSummary, DashboardError> {
        let mut state = self.state();
        state.view.quick_range = range;
        self.history_service
            .quick_range(&state.history, range, today, state.view.performance_type)
    }

    /// Submit a backfill, follow it to completion and reload the history
    /// when it succeeds.
    pub async fn run_backfill(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<BackfillOutcome, DashboardError> {
        let outcome = self.backfill.run(&self.api, start, end, today).await?;
        if outcome.is_success() {
            self.refresh_history().await?;
        }
        Ok(outcome)
    }

    #[must_use]
    pub fn is_backfill_running(&self) -> bool {
        self.backfill.is_running()
    }

    pub async fn delete_history(&self, date: NaiveDate) -> Result<(), DashboardError> {
        self.api.delete_history(date).await?;
        self.refresh_history().await?;
        Ok(())
    }

    // ── Entries ─────────────────────────────────────────────────────

    pub async fn add_stock(&self, entry: &NewEntry) -> Result<(), DashboardError> {
        self.api.add_stock(entry).await
    }

    pub async fn update_stock(&self, entry: &NewEntry) -> Result<(), DashboardError> {
        self.api.update_stock(entry).await
    }

    pub async fn delete_stock(&self, ticker: &str) -> Result<(), DashboardError> {
        self.api.delete_stock(ticker).await
    }

    // ── Debug & assistant ───────────────────────────────────────────

    pub async fn debug_messages(&self) -> Result<Vec<String>, DashboardError> {
        self.api.debug_messages().await
    }

    pub async fn ask_ai(&self, question: &str) -> Result<String, DashboardError> {
        self.api.ask_ai(question).await
    }
}
