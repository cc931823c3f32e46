use serde::{Deserialize, Serialize};

/// Body of `POST /api/backfill_range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackfillRequest {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

/// Generic `{status, message}` acknowledgement used by several endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: String,

    #[serde(default)]
    pub message: String,
}

impl StatusReply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Response of `GET /api/backfill_status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackfillStatus {
    #[serde(default)]
    pub running: bool,

    #[serde(default)]
    pub message: String,
}

impl BackfillStatus {
    /// A stopped job whose message reports an error.
    #[must_use]
    pub fn reports_failure(&self) -> bool {
        let lower = self.message.to_lowercase();
        lower.contains("error") || self.message.contains("FATAL") || self.message.contains("錯誤")
    }
}

/// Response of `GET /api/debug_messages`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugMessages {
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub messages: Vec<String>,
}

/// Response of `POST /api/ask_ai`. `response` is markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiReply {
    #[serde(default)]
    pub response: String,

    #[serde(default)]
    pub error: Option<String>,
}
