use thiserror::Error;

/// Unified error type for the entire portfolio-dashboard-core library.
/// Every public function returns `Result<T, DashboardError>`.
#[derive(Debug, Error)]
pub enum DashboardError {
    // ── Network (terminal, retries exhausted) ───────────────────────
    #[error("Request to {url} timed out after {attempts} attempts")]
    Timeout { url: String, attempts: u32 },

    #[error("Backend unreachable at {url} after {attempts} attempts: {message}")]
    Unreachable {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("Backend returned HTTP {status} for {url} after {attempts} attempts")]
    Http {
        url: String,
        status: u16,
        attempts: u32,
    },

    // ── Application ─────────────────────────────────────────────────
    #[error("API error ({endpoint}): {message}")]
    Api { endpoint: String, message: String },

    // ── Validation (never reaches the network) ──────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    // ── Lookups ─────────────────────────────────────────────────────
    #[error("No historical data available")]
    NoHistory,

    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    // ── Storage ─────────────────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl DashboardError {
    /// `true` for the errors the resilient client raises once its attempt
    /// ceiling is spent. Callers stop automatic polling on these.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            DashboardError::Timeout { .. }
                | DashboardError::Unreachable { .. }
                | DashboardError::Http { .. }
        )
    }

    /// Message suitable for a blocking alert.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Timeout { .. } => {
                "Connection timed out, check your network connection".to_string()
            }
            DashboardError::Http { .. } => {
                "Cannot reach the backend service, check that the API is running".to_string()
            }
            DashboardError::Unreachable { .. } => {
                "Connection failed, check your network connection".to_string()
            }
            other => other.to_string(),
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for DashboardError {
    fn from(e: std::io::Error) -> Self {
        DashboardError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(e: serde_json::Error) -> Self {
        DashboardError::Deserialization(e.to_string())
    }
}
