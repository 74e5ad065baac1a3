use thiserror::Error;

/// Unified error type for the entire stock-dashboard-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input ───────────────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    // ── API / Network ───────────────────────────────────────────────
    /// The server replied with a failure status.
    #[error("API error ({status}): {message}")]
    Transport { status: u16, message: String },

    /// No reply from the server at all (connect failure, timeout).
    #[error("No response from server: {0}")]
    NoResponse(String),

    /// The request could not be constructed or sent.
    #[error("Request error: {0}")]
    Request(String),

    /// The candle endpoint reported its "no data" sentinel for the range.
    #[error("No chart data available for {symbol}")]
    NoData { symbol: String },

    // ── Storage ─────────────────────────────────────────────────────
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── Streaming ───────────────────────────────────────────────────
    #[error("Price feed error: {0}")]
    Feed(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Sanitize error message: strip query parameters from URLs to prevent
        // API key leakage. reqwest errors often contain full URLs with secrets.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };

        if let Some(status) = e.status() {
            CoreError::Transport {
                status: status.as_u16(),
                message: sanitized,
            }
        } else if e.is_connect() || e.is_timeout() {
            CoreError::NoResponse(sanitized)
        } else if e.is_builder() {
            CoreError::Request(sanitized)
        } else {
            // Request went out but no usable response came back.
            CoreError::NoResponse(sanitized)
        }
    }
}
