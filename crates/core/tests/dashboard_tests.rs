// ═══════════════════════════════════════════════════════════════════
// Dashboard Tests — Polling, view changes, what-if, charts, backfill
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use portfolio_dashboard_core::client::api::DashboardApi;
use portfolio_dashboard_core::client::retry::{ResilientClient, RetryPolicy};
use portfolio_dashboard_core::client::transport::{
    ApiRequest, ApiResponse, HttpTransport, TransportError,
};
use portfolio_dashboard_core::errors::DashboardError;
use portfolio_dashboard_core::models::history::ClosePoint;
use portfolio_dashboard_core::models::rows::{FlashDirection, RowId, RowKey, RowMutation};
use portfolio_dashboard_core::models::settings::Settings;
use portfolio_dashboard_core::models::view::{Column, ColumnVisibility, SortDirection};
use portfolio_dashboard_core::services::backfill::{BackfillOutcome, BackfillPolicy};
use portfolio_dashboard_core::services::charts::ChartResource;
use portfolio_dashboard_core::services::notifications::Metric;
use portfolio_dashboard_core::storage::settings_store::SettingsStore;
use portfolio_dashboard_core::storage::store::MemoryStore;
use portfolio_dashboard_core::PollOutcome;
use portfolio_dashboard_core::PortfolioDashboard;

// ═══════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════

/// Answers per URL from a queue; the last reply repeats. Every reply
/// takes `latency` to arrive.
#[derive(Default)]
struct Backend {
    routes: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
    log: Mutex<Vec<String>>,
    latency: Duration,
}

impl Backend {
    fn new() -> Self {
        Self::default()
    }

    fn slow(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn route(self, url: &str, replies: &[(u16, &str)]) -> Self {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            replies.iter().map(|(s, b)| (*s, b.to_string())).collect(),
        );
        self
    }

    fn calls(&self, url: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl HttpTransport for Backend {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.log.lock().unwrap().push(request.url.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let (status, body) = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&request.url) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => queue.front().cloned().unwrap(),
                None => (404, "{}".to_string()),
            }
        };
        Ok(ApiResponse::new(status, body))
    }
}

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        retry_delay: Duration::from_secs(2),
        attempt_timeout: Duration::from_secs(10),
    }
}

fn dashboard(backend: Backend) -> PortfolioDashboard<Backend> {
    let client = ResilientClient::with_policy(backend, policy(2));
    PortfolioDashboard::new(
        DashboardApi::new(client),
        Settings::default(),
        ColumnVisibility::default(),
    )
}

fn backend(dash: &PortfolioDashboard<Backend>) -> &Backend {
    dash.api().client().transport()
}

const PORTFOLIO: &str = r#"{
    "totals": {"market_value": 2250000, "pl": 150000, "pl_percent": 7.1},
    "stocks": [
        {"ticker": "T1", "name": "One", "shares": 1000, "current_price": 500, "market_value": 500000},
        {"ticker": "T2", "name": "Two", "shares": 1000, "current_price": 1000, "market_value": 1000000},
        {"ticker": "T3", "name": "Three", "shares": 1000, "current_price": 750, "market_value": 750000}
    ]
}"#;

const PORTFOLIO_T1_UP: &str = r#"{
    "totals": {"market_value": 2260000},
    "stocks": [
        {"ticker": "T1", "name": "One", "shares": 1000, "current_price": 510, "market_value": 510000},
        {"ticker": "T2", "name": "Two", "shares": 1000, "current_price": 1000, "market_value": 1000000},
        {"ticker": "T3", "name": "Three", "shares": 1000, "current_price": 750, "market_value": 750000}
    ]
}"#;

const PORTFOLIO_WITHOUT_T1: &str = r#"{
    "totals": {"market_value": 1750000},
    "stocks": [
        {"ticker": "T2", "name": "Two", "shares": 1000, "current_price": 1000, "market_value": 1000000},
        {"ticker": "T3", "name": "Three", "shares": 1000, "current_price": 750, "market_value": 750000}
    ]
}"#;

fn keys(dash: &PortfolioDashboard<Backend>) -> Vec<String> {
    dash.with_state(|s| s.arena.keys())
}

fn ids(dash: &PortfolioDashboard<Backend>) -> HashSet<RowId> {
    dash.with_state(|s| s.arena.rows().iter().map(|r| r.id).collect())
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Chart stand-in that records what happens to it.
struct RecordingChart {
    events: Arc<Mutex<Vec<String>>>,
}

impl ChartResource for RecordingChart {
    fn render(&mut self, history: &[ClosePoint]) {
        self.events
            .lock()
            .unwrap()
            .push(format!("render:{}", history.len()));
    }

    fn destroy(&mut self) {
        self.events.lock().unwrap().push("destroy".to_string());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Polling
// ═══════════════════════════════════════════════════════════════════

mod polling {
    use super::*;

    #[tokio::test]
    async fn first_poll_renders_sorted_table() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));

        let outcome = dash.poll().await.unwrap();

        assert!(matches!(outcome, PollOutcome::Updated { .. }));
        assert_eq!(
            keys(&dash),
            vec!["T2", "T2-chart", "T3", "T3-chart", "T1", "T1-chart"]
        );
        assert!(dash.with_state(|s| s.snapshot.is_some()));
    }

    #[tokio::test]
    async fn empty_portfolio_shows_placeholder() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, "{}")]));

        dash.poll().await.unwrap();

        assert_eq!(keys(&dash), vec!["<placeholder>"]);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_polls_are_skipped() {
        let dash = dashboard(
            Backend::new()
                .slow(Duration::from_millis(500))
                .route("/api/portfolio", &[(200, PORTFOLIO)]),
        );

        let (a, b) = tokio::join!(dash.poll(), dash.poll());
        let outcomes = [a.unwrap(), b.unwrap()];

        let skipped = outcomes
            .iter()
            .filter(|o| **o == PollOutcome::Skipped)
            .count();
        assert_eq!(skipped, 1);
        assert_eq!(backend(&dash).calls("/api/portfolio"), 1);

        // The gate reopens once the first poll is done.
        assert!(matches!(
            dash.poll().await.unwrap(),
            PollOutcome::Updated { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_poll_stops_polling_until_resumed() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(500, "oops")]));

        let err = dash.poll().await.unwrap_err();
        assert!(matches!(err, DashboardError::Http { status: 500, attempts: 3, .. }));
        assert!(dash.is_polling_stopped());

        assert_eq!(dash.poll().await.unwrap(), PollOutcome::Stopped);
        assert_eq!(backend(&dash).calls("/api/portfolio"), 3);

        dash.resume_polling();
        assert!(!dash.is_polling_stopped());
        assert!(dash.poll().await.is_err());
        assert_eq!(backend(&dash).calls("/api/portfolio"), 6);
    }

    #[tokio::test]
    async fn changed_price_flashes_then_clears() {
        let dash = dashboard(
            Backend::new().route("/api/portfolio", &[(200, PORTFOLIO), (200, PORTFOLIO_T1_UP)]),
        );
        dash.poll().await.unwrap();

        let PollOutcome::Updated { mutations, .. } = dash.poll().await.unwrap() else {
            panic!("expected an update");
        };

        let t1 = dash.with_state(|s| s.arena.find(&RowKey::data("T1")).unwrap().id);
        assert!(mutations.contains(&RowMutation::Flash {
            row: t1,
            column: Column::CurrentPrice,
            direction: FlashDirection::Up,
        }));
        let flash = |dash: &PortfolioDashboard<Backend>| {
            dash.with_state(|s| {
                s.arena.get(t1).unwrap().cell(Column::CurrentPrice).unwrap().flash
            })
        };
        assert_eq!(flash(&dash), Some(FlashDirection::Up));

        assert!(dash.due_flash_clears(Instant::now()).is_empty());
        let clears = dash.due_flash_clears(Instant::now() + Duration::from_secs(2));
        assert!(clears.contains(&RowMutation::ClearFlash {
            row: t1,
            column: Column::CurrentPrice,
        }));
        assert_eq!(flash(&dash), None);
    }

    #[tokio::test]
    async fn summary_reports_totals() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));

        dash.poll().await.unwrap();

        let displayed = dash.with_state(|s| s.summary.displayed(Metric::MarketValue));
        assert_eq!(displayed, Some(2_250_000.0));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Scheduled polling
// ═══════════════════════════════════════════════════════════════════

mod scheduled_polling {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn polls_each_interval_until_exhausted() {
        let dash = dashboard(Backend::new().route(
            "/api/portfolio",
            &[(200, PORTFOLIO), (200, PORTFOLIO_T1_UP), (500, "{}")],
        ));
        let started = tokio::time::Instant::now();
        let mut results = Vec::new();

        dash.run_polling(|result| results.push(result)).await;

        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], Ok(PollOutcome::Updated { .. })));
        assert!(matches!(results[1], Ok(PollOutcome::Updated { .. })));
        assert!(matches!(
            results[2],
            Err(DashboardError::Http {
                status: 500,
                attempts: 3,
                ..
            })
        ));
        // Ticks at 0 s, 5 s and 10 s; the last poll spends two 2 s retry delays.
        assert_eq!(started.elapsed(), Duration::from_secs(14));
        assert_eq!(backend(&dash).calls("/api/portfolio"), 5);
        assert!(dash.is_polling_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_never_polls() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));
        dash.apply_settings(Settings {
            update_interval: 0,
            ..Settings::default()
        });
        let mut results = 0;

        dash.run_polling(|_| results += 1).await;

        assert_eq!(results, 0);
        assert_eq!(backend(&dash).calls("/api/portfolio"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_mid_run_ends_the_loop() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));
        let mut results = 0;

        dash.run_polling(|result| {
            assert!(result.is_ok());
            results += 1;
            if results == 2 {
                dash.apply_settings(Settings {
                    update_interval: 0,
                    ..Settings::default()
                });
            }
        })
        .await;

        assert_eq!(results, 2);
        assert_eq!(backend(&dash).calls("/api/portfolio"), 2);
        assert!(!dash.is_polling_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn new_interval_applies_from_next_tick() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));
        let started = tokio::time::Instant::now();
        let mut ticks = Vec::new();

        dash.run_polling(|_| {
            ticks.push(started.elapsed());
            match ticks.len() {
                1 => {
                    dash.apply_settings(Settings {
                        update_interval: 1000,
                        ..Settings::default()
                    });
                }
                3 => {
                    dash.apply_settings(Settings {
                        update_interval: 0,
                        ..Settings::default()
                    });
                }
                _ => {}
            }
        })
        .await;

        assert_eq!(
            ticks,
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(2)
            ]
        );
    }
}

// ═══════════════════════════════════════════════════════════════════
// Thread safety
// ═══════════════════════════════════════════════════════════════════

mod thread_safety {
    use super::*;
    use portfolio_dashboard_core::client::transport::ReqwestTransport;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn dashboard_is_shareable_across_tasks() {
        assert_send::<PortfolioDashboard<ReqwestTransport>>();
        assert_sync::<PortfolioDashboard<ReqwestTransport>>();
        assert_sync::<PortfolioDashboard<Backend>>();
    }

    #[tokio::test]
    async fn spawned_tasks_drive_a_shared_dashboard() {
        let dash = Arc::new(dashboard(
            Backend::new()
                .route("/api/portfolio", &[(200, PORTFOLIO)])
                .route(
                    "/api/stock_history/T1",
                    &[(200, r#"{"status":"success","history":[{"date":"2024-01-02","close":10.0}]}"#)],
                ),
        ));
        let events = Arc::new(Mutex::new(Vec::new()));

        let poller = dash.clone();
        tokio::spawn(async move { poller.poll().await.map(|_| ()) })
            .await
            .unwrap()
            .unwrap();

        let opener = dash.clone();
        let chart = Box::new(RecordingChart {
            events: events.clone(),
        });
        tokio::spawn(async move { opener.open_chart("T1", chart).await })
            .await
            .unwrap()
            .unwrap();

        assert!(dash.with_state(|s| s.charts.contains("T1")));
        assert_eq!(*events.lock().unwrap(), vec!["render:1"]);
    }
}

// ═══════════════════════════════════════════════════════════════════
// View changes
// ═══════════════════════════════════════════════════════════════════

mod view {
    use super::*;

    #[tokio::test]
    async fn resort_moves_rows_without_rebuilding() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));
        dash.poll().await.unwrap();
        let before = ids(&dash);

        dash.resort(Column::MarketValue);

        assert_eq!(dash.view().sort.direction, SortDirection::Asc);
        assert_eq!(
            keys(&dash),
            vec!["T1", "T1-chart", "T3", "T3-chart", "T2", "T2-chart"]
        );
        assert_eq!(ids(&dash), before);
        assert_eq!(backend(&dash).calls("/api/portfolio"), 1);
    }

    #[tokio::test]
    async fn non_data_columns_do_not_sort() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));
        dash.poll().await.unwrap();

        assert!(dash.resort(Column::Chart).is_empty());
        assert_eq!(dash.view().sort.key, Column::MarketValue);
    }

    #[tokio::test]
    async fn settings_change_updates_markers() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));
        assert!(dash.apply_settings(Settings::default()).is_empty());
        dash.poll().await.unwrap();

        let markers = dash.apply_settings(Settings {
            enable_notifications: true,
            enable_market_value_notification: true,
            ..Settings::default()
        });

        assert!(markers.contains(&(Metric::MarketValue, true)));
        assert!(dash.settings().enable_notifications);

        let markers = dash.apply_settings(Settings::default());
        assert!(markers.iter().all(|(_, on)| !on));
    }

    #[test]
    fn settings_and_columns_persist() {
        let dash = dashboard(Backend::new());
        let mut store = SettingsStore::new(MemoryStore::new());

        dash.apply_settings(Settings {
            update_interval: 0,
            ..Settings::default()
        });
        dash.set_column_visible(Column::Chart, true);
        dash.save_settings(&mut store).unwrap();

        let restored = PortfolioDashboard::from_store(
            DashboardApi::new(ResilientClient::new(Backend::new())),
            &store,
        );
        assert_eq!(restored.settings().update_interval, 0);
        assert!(restored.view().columns.is_visible(Column::Chart));
    }
}

// ═══════════════════════════════════════════════════════════════════
// What-if
// ═══════════════════════════════════════════════════════════════════

mod what_if {
    use super::*;

    #[tokio::test]
    async fn evaluates_against_latest_snapshot() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));
        dash.poll().await.unwrap();

        let result = dash.what_if("T1", "600").unwrap().unwrap();

        assert_eq!(result.target_value, 600_000.0);
        assert_eq!(result.diff, 100_000.0);
        assert!((result.ratio - 0.2).abs() < 1e-12);
        let input = dash.with_state(|s| {
            s.arena.find(&RowKey::data("T1")).unwrap().what_if_input.clone()
        });
        assert_eq!(input, "600");
    }

    #[tokio::test]
    async fn blank_input_is_no_result() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));
        dash.poll().await.unwrap();

        assert_eq!(dash.what_if("T1", "  ").unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_ticker() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));
        assert!(matches!(
            dash.what_if("T1", "600"),
            Err(DashboardError::UnknownTicker(_))
        ));

        dash.poll().await.unwrap();
        assert!(matches!(
            dash.what_if("ZZZ", "600"),
            Err(DashboardError::UnknownTicker(_))
        ));
    }

    #[tokio::test]
    async fn input_survives_reorder() {
        let dash = dashboard(Backend::new().route("/api/portfolio", &[(200, PORTFOLIO)]));
        dash.poll().await.unwrap();
        dash.what_if("T3", "800").unwrap();

        dash.resort(Column::Ticker);
        dash.poll().await.unwrap();

        let input = dash.with_state(|s| {
            s.arena.find(&RowKey::data("T3")).unwrap().what_if_input.clone()
        });
        assert_eq!(input, "800");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Charts
// ═══════════════════════════════════════════════════════════════════

mod charts {
    use super::*;

    const HISTORY: &str =
        r#"{"status":"success","history":[{"date":"2024-01-02","close":10.0},{"date":"2024-01-03","close":11.0}]}"#;

    #[tokio::test]
    async fn open_renders_and_removal_disposes() {
        let dash = dashboard(
            Backend::new()
                .route("/api/portfolio", &[(200, PORTFOLIO), (200, PORTFOLIO_WITHOUT_T1)])
                .route("/api/stock_history/T1", &[(200, HISTORY)]),
        );
        dash.poll().await.unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));

        dash.open_chart(
            "T1",
            Box::new(RecordingChart {
                events: events.clone(),
            }),
        )
        .await
        .unwrap();

        assert!(dash.with_state(|s| s.charts.contains("T1")));
        assert!(dash.with_state(|s| s.arena.find(&RowKey::detail("T1")).unwrap().expanded));
        assert_eq!(*events.lock().unwrap(), vec!["render:2"]);

        let PollOutcome::Updated { mutations, .. } = dash.poll().await.unwrap() else {
            panic!("expected an update");
        };

        assert!(mutations.contains(&RowMutation::DisposeChart {
            ticker: "T1".to_string()
        }));
        assert!(!dash.with_state(|s| s.charts.contains("T1")));
        assert_eq!(*events.lock().unwrap(), vec!["render:2", "destroy"]);
    }

    #[tokio::test]
    async fn close_collapses_and_disposes() {
        let dash = dashboard(
            Backend::new()
                .route("/api/portfolio", &[(200, PORTFOLIO)])
                .route("/api/stock_history/T1", &[(200, HISTORY)]),
        );
        dash.poll().await.unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        dash.open_chart(
            "T1",
            Box::new(RecordingChart {
                events: events.clone(),
            }),
        )
        .await
        .unwrap();

        assert!(dash.close_chart("T1"));

        assert!(!dash.with_state(|s| s.arena.find(&RowKey::detail("T1")).unwrap().expanded));
        assert!(!dash.close_chart("T1"));
        assert_eq!(*events.lock().unwrap(), vec!["render:2", "destroy"]);
    }

    #[tokio::test]
    async fn refresh_redraws_attached_chart() {
        let longer = r#"{"status":"success","history":[{"date":"2024-01-02","close":10.0},{"date":"2024-01-03","close":11.0},{"date":"2024-01-04","close":12.0}]}"#;
        let dash = dashboard(
            Backend::new()
                .route("/api/portfolio", &[(200, PORTFOLIO)])
                .route("/api/stock_history/T1", &[(200, HISTORY), (200, longer)]),
        );
        dash.poll().await.unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        dash.open_chart(
            "T1",
            Box::new(RecordingChart {
                events: events.clone(),
            }),
        )
        .await
        .unwrap();

        assert!(dash.refresh_chart("T1").await.unwrap());

        assert_eq!(*events.lock().unwrap(), vec!["render:2", "render:3"]);
        assert_eq!(backend(&dash).calls("/api/stock_history/T1"), 2);
    }

    #[tokio::test]
    async fn refresh_without_chart_fetches_nothing() {
        let dash = dashboard(
            Backend::new()
                .route("/api/portfolio", &[(200, PORTFOLIO)])
                .route("/api/stock_history/T2", &[(200, HISTORY)]),
        );
        dash.poll().await.unwrap();

        assert!(!dash.refresh_chart("T2").await.unwrap());
        assert_eq!(backend(&dash).calls("/api/stock_history/T2"), 0);
    }

    #[tokio::test]
    async fn failed_history_attaches_nothing() {
        let dash = dashboard(
            Backend::new()
                .route("/api/portfolio", &[(200, PORTFOLIO)])
                .route(
                    "/api/stock_history/T1",
                    &[(200, r#"{"status":"error","message":"no data"}"#)],
                ),
        );
        dash.poll().await.unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));

        let err = dash
            .open_chart(
                "T1",
                Box::new(RecordingChart {
                    events: events.clone(),
                }),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DashboardError::Api { .. }));
        assert!(dash.with_state(|s| s.charts.is_empty()));
        assert!(events.lock().unwrap().is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// History & backfill
// ═══════════════════════════════════════════════════════════════════

mod backfill {
    use super::*;

    const ACK: &str = r#"{"status":"success","message":"queued"}"#;
    const RUNNING: &str = r#"{"running":true,"message":"fetching"}"#;
    const DONE: &str = r#"{"running":false,"message":"Backfill complete"}"#;
    const IDLE: &str = r#"{"running":false,"message":""}"#;
    const FAILED: &str = r#"{"running":false,"message":"Error: upstream unavailable"}"#;
    const SUMMARY: &str = r#"{"daily":{"2024-01-02":{"total":100},"2024-01-05":{"total":110}}}"#;

    fn backfill_backend(statuses: &[(u16, &str)]) -> Backend {
        Backend::new()
            .route("/api/backfill_range", &[(200, ACK)])
            .route("/api/backfill_status", statuses)
            .route("/api/history_summary", &[(200, SUMMARY)])
    }

    #[tokio::test(start_paused = true)]
    async fn success_refreshes_history() {
        let dash = dashboard(backfill_backend(&[(200, RUNNING), (200, RUNNING), (200, DONE)]));

        let outcome = dash
            .run_backfill(day(2024, 1, 1), day(2024, 1, 5), day(2024, 2, 1))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BackfillOutcome::Succeeded {
                message: "Backfill complete".to_string()
            }
        );
        assert_eq!(backend(&dash).calls("/api/backfill_status"), 3);
        assert_eq!(backend(&dash).calls("/api/history_summary"), 1);
        assert_eq!(dash.with_state(|s| s.history.len()), 2);
        assert!(!dash.is_backfill_running());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_job_gets_grace_polls() {
        let dash = dashboard(backfill_backend(&[(200, IDLE)]));

        let outcome = dash
            .run_backfill(day(2024, 1, 1), day(2024, 1, 5), day(2024, 2, 1))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(backend(&dash).calls("/api/backfill_status"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_are_paced() {
        let dash = dashboard(backfill_backend(&[(200, RUNNING), (200, DONE)]))
            .with_backfill_policy(BackfillPolicy {
                poll_interval: Duration::from_secs(5),
                grace_polls: 0,
            });
        let started = tokio::time::Instant::now();

        dash.run_backfill(day(2024, 1, 1), day(2024, 1, 5), day(2024, 2, 1))
            .await
            .unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_message_is_reported() {
        let dash = dashboard(backfill_backend(&[(200, RUNNING), (200, FAILED)]));

        let outcome = dash
            .run_backfill(day(2024, 1, 1), day(2024, 1, 5), day(2024, 2, 1))
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.message(), "Error: upstream unavailable");
        assert_eq!(backend(&dash).calls("/api/history_summary"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_job_is_rejected_while_first_runs() {
        let dash = dashboard(backfill_backend(&[(200, RUNNING), (200, RUNNING), (200, DONE)]));

        let (a, b) = tokio::join!(
            dash.run_backfill(day(2024, 1, 1), day(2024, 1, 5), day(2024, 2, 1)),
            dash.run_backfill(day(2024, 1, 1), day(2024, 1, 5), day(2024, 2, 1)),
        );

        assert!(a.is_ok());
        assert!(matches!(b, Err(DashboardError::Validation(_))));
        assert_eq!(backend(&dash).calls("/api/backfill_range"), 1);
    }

    #[tokio::test]
    async fn future_dates_are_not_submitted() {
        let dash = dashboard(backfill_backend(&[(200, DONE)]));

        let err = dash
            .run_backfill(day(2024, 1, 1), day(2024, 3, 1), day(2024, 2, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, DashboardError::Validation(_)));
        assert_eq!(backend(&dash).calls("/api/backfill_range"), 0);
        assert!(!dash.is_backfill_running());
    }

    #[tokio::test]
    async fn lookups_use_refreshed_history() {
        let dash = dashboard(backfill_backend(&[(200, DONE)]));
        assert_eq!(dash.refresh_history().await.unwrap(), 2);

        let point = dash.lookup_point(day(2024, 1, 5)).unwrap();
        assert_eq!(point.previous.unwrap().diff, 10.0);

        let range = dash
            .lookup_range(day(2024, 1, 1), day(2024, 1, 6), day(2024, 2, 1))
            .unwrap();
        assert_eq!(range.diff, 10.0);
    }
}
