use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::retry::ResilientClient;
use super::transport::{ApiRequest, HttpTransport};
use crate::errors::DashboardError;
use crate::models::backfill::{AiReply, BackfillRequest, BackfillStatus, DebugMessages, StatusReply};
use crate::models::entry::{NewEntry, PortfolioSnapshot};
use crate::models::history::{ClosePoint, HistorySummary, StockHistory};
use crate::services::format::sanitize_markup;
use crate::services::history_service::validate_range;

/// Typed access to the dashboard backend. Every call goes through the
/// resilient client except [`DashboardApi::debug_messages`].
pub struct DashboardApi<T: HttpTransport> {
    client: ResilientClient<T>,
}

impl<T: HttpTransport> DashboardApi<T> {
    pub fn new(client: ResilientClient<T>) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &ResilientClient<T> {
        &self.client
    }

    async fn fetch<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, DashboardError> {
        let response = self.client.execute(&request).await?;
        response.json()
    }

    async fn acknowledge(&self, request: ApiRequest) -> Result<StatusReply, DashboardError> {
        let endpoint = request.url.clone();
        let reply: StatusReply = self.fetch(request).await?;
        if !reply.is_success() {
            return Err(DashboardError::Api {
                endpoint,
                message: reply.message,
            });
        }
        Ok(reply)
    }

    // ── Portfolio ───────────────────────────────────────────────────

    pub async fn portfolio(&self) -> Result<PortfolioSnapshot, DashboardError> {
        self.fetch(ApiRequest::get("/api/portfolio")).await
    }

    pub async fn stock_history(&self, ticker: &str) -> Result<Vec<ClosePoint>, DashboardError> {
        let endpoint = format!("/api/stock_history/{ticker}");
        let history: StockHistory = self.fetch(ApiRequest::get(endpoint.as_str())).await?;
        if history.status != "success" {
            return Err(DashboardError::Api {
                endpoint,
                message: history
                    .message
                    .unwrap_or_else(|| "No historical data found".to_string()),
            });
        }
        Ok(history.history)
    }

    pub async fn history_summary(&self) -> Result<HistorySummary, DashboardError> {
        self.fetch(ApiRequest::get("/api/history_summary")).await
    }

    // ── Entry CRUD ──────────────────────────────────────────────────

    pub async fn add_stock(&self, entry: &NewEntry) -> Result<(), DashboardError> {
        validate_entry(entry)?;
        let body = serde_json::to_value(entry)
            .map_err(|e| DashboardError::Serialization(e.to_string()))?;
        self.acknowledge(ApiRequest::post("/api/stock", body)).await?;
        debug!(ticker = %entry.ticker, "entry added");
        Ok(())
    }

    pub async fn update_stock(&self, entry: &NewEntry) -> Result<(), DashboardError> {
        validate_entry(entry)?;
        let body = serde_json::to_value(entry)
            .map_err(|e| DashboardError::Serialization(e.to_string()))?;
        self.acknowledge(ApiRequest::put(format!("/api/stock/{}", entry.ticker), body))
            .await?;
        debug!(ticker = %entry.ticker, "entry updated");
        Ok(())
    }

    pub async fn delete_stock(&self, ticker: &str) -> Result<(), DashboardError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(DashboardError::Validation("ticker is required".to_string()));
        }
        self.acknowledge(ApiRequest::delete(format!("/api/stock/{ticker}")))
            .await?;
        debug!(ticker, "entry deleted");
        Ok(())
    }

    // ── History maintenance ─────────────────────────────────────────

    /// Submit a backfill job. Dates are checked against `today` before
    /// anything is sent.
    pub async fn backfill_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<StatusReply, DashboardError> {
        validate_range(start, end, today)?;
        let body = serde_json::to_value(BackfillRequest {
            start_date: start,
            end_date: end,
        })
        .map_err(|e| DashboardError::Serialization(e.to_string()))?;
        self.acknowledge(ApiRequest::post("/api/backfill_range", body))
            .await
    }

    pub async fn backfill_status(&self) -> Result<BackfillStatus, DashboardError> {
        self.fetch(ApiRequest::get("/api/backfill_status")).await
    }

    pub async fn delete_history(&self, date: NaiveDate) -> Result<StatusReply, DashboardError> {
        self.acknowledge(ApiRequest::post(
            "/api/delete_history",
            json!({ "date": date }),
        ))
        .await
    }

    /// Backend debug log. One attempt only; a failure here should not
    /// light up the connection indicator.
    pub async fn debug_messages(&self) -> Result<Vec<String>, DashboardError> {
        let request = ApiRequest::get("/api/debug_messages");
        let reply: DebugMessages = self.client.send_once(&request).await?.json()?;
        if reply.status != "success" {
            return Err(DashboardError::Api {
                endpoint: request.url,
                message: format!("unexpected status '{}'", reply.status),
            });
        }
        Ok(reply.messages)
    }

    // ── Assistant ───────────────────────────────────────────────────

    /// Ask the assistant a question. The markdown answer comes back with
    /// all markup escaped.
    pub async fn ask_ai(&self, question: &str) -> Result<String, DashboardError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DashboardError::Validation("question is empty".to_string()));
        }
        let reply: AiReply = self
            .fetch(ApiRequest::post("/api/ask_ai", json!({ "question": question })))
            .await?;
        if let Some(error) = reply.error {
            return Err(DashboardError::Api {
                endpoint: "/api/ask_ai".to_string(),
                message: error,
            });
        }
        Ok(sanitize_markup(&reply.response))
    }
}

/// Required fields of an entry form.
pub fn validate_entry(entry: &NewEntry) -> Result<(), DashboardError> {
    if entry.ticker.trim().is_empty() {
        return Err(DashboardError::Validation("ticker is required".to_string()));
    }
    if !entry.shares.is_finite() || entry.shares <= 0.0 {
        return Err(DashboardError::Validation(
            "shares must be a positive number".to_string(),
        ));
    }
    if !entry.avg_cost.is_finite() || entry.avg_cost < 0.0 {
        return Err(DashboardError::Validation(
            "average cost must not be negative".to_string(),
        ));
    }
    Ok(())
}
