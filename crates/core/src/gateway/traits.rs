use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::stock::{Quote, StockProfile, StockSummary};

/// Trait abstraction for the market data backend.
///
/// The stores only know this contract. If the upstream API changes or gets
/// swapped out, only the one implementation is touched — and tests inject
/// their own doubles.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Search for instruments whose ticker or name matches `query`.
    /// Returns quote snapshots for the matching instruments.
    async fn search(&self, query: &str) -> Result<Vec<StockSummary>, CoreError>;

    /// Get the latest quote for a ticker.
    async fn get_quote(&self, ticker: &str) -> Result<Quote, CoreError>;

    /// Get the company profile for a ticker.
    async fn get_profile(&self, ticker: &str) -> Result<StockProfile, CoreError>;

    /// Get daily candles for a ticker between two unix epochs (seconds).
    /// A "no data" response from the backend surfaces as `CoreError::NoData`,
    /// never as an empty success.
    async fn get_candles(
        &self,
        ticker: &str,
        resolution: &str,
        from: i64,
        to: i64,
    ) -> Result<CandleSeries, CoreError>;
}

/// Column-oriented candle payload, the shape the wire delivers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    pub timestamps: Vec<i64>,
    pub opens: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
}

/// A streaming price update pushed by the feed outside of request/response
/// cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    pub ticker: String,
    pub price: f64,
}

/// Transport contract for the streaming price feed.
///
/// Implementations own the connection lifecycle, including reconnecting
/// after a drop and resubscribing every active ticker — the stores never
/// see a disconnect.
pub trait PriceFeed: Send {
    fn subscribe(&mut self, ticker: &str) -> Result<(), CoreError>;
    fn unsubscribe(&mut self, ticker: &str) -> Result<(), CoreError>;
}
