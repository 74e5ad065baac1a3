use std::time::Duration;

/// Configuration for the dashboard's external endpoints and timing knobs.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// API token for the market data provider.
    pub api_key: String,

    /// Base URL of the REST API.
    pub rest_base_url: String,

    /// URL of the streaming websocket endpoint.
    pub ws_url: String,

    /// Quiescence window for debounced search input.
    pub search_debounce: Duration,

    /// How many search hits get enriched with a live quote.
    pub search_quote_limit: usize,

    /// Delay before the feed reconnects after a dropped connection.
    pub reconnect_delay: Duration,
}

impl DashboardConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            rest_base_url: "https://finnhub.io/api/v1".to_string(),
            ws_url: "wss://ws.finnhub.io".to_string(),
            search_debounce: Duration::from_millis(400),
            search_quote_limit: 10,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}
