use serde::{Deserialize, Serialize};

use super::chart::ChartSeries;

/// Immutable snapshot of a stock quote at fetch time.
///
/// This is the unit stored in search results and the watchlist, and the
/// payload handed to the portfolio when a holding is opened. `ticker` is
/// the primary key across all stores and is always uppercased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSummary {
    /// Ticker symbol, uppercased (e.g., "AAPL", "MSFT")
    pub ticker: String,

    /// Human-readable company name (e.g., "Apple Inc.")
    pub name: String,

    pub current_price: f64,

    /// Absolute change since the previous close
    pub change: f64,

    /// Percent change since the previous close
    pub change_percent: f64,

    pub open: f64,
    pub high: f64,
    pub low: f64,
}

impl StockSummary {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into().to_uppercase(),
            name: name.into(),
            current_price: 0.0,
            change: 0.0,
            change_percent: 0.0,
            open: 0.0,
            high: 0.0,
            low: 0.0,
        }
    }

    /// Build a summary from a quote payload.
    pub fn from_quote(ticker: impl Into<String>, name: impl Into<String>, quote: &Quote) -> Self {
        Self {
            ticker: ticker.into().to_uppercase(),
            name: name.into(),
            current_price: quote.current_price,
            change: quote.change,
            change_percent: quote.change_percent,
            open: quote.open,
            high: quote.high,
            low: quote.low,
        }
    }
}

/// A point-in-time quote as returned by the market data gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub current_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,
}

/// Company profile as returned by the market data gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockProfile {
    pub name: String,
    pub market_cap: f64,
    pub sector: String,
    pub website: String,
    pub logo_url: String,
}

/// The currently selected stock: a summary extended with its chart series
/// and company profile.
///
/// At most one instance is live at a time. A new detail fetch replaces it
/// wholesale; individual chart periods are patched in place as they arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedStock {
    pub summary: StockSummary,
    pub profile: StockProfile,
    pub chart: ChartSeries,
}

impl SelectedStock {
    pub fn new(summary: StockSummary, profile: StockProfile) -> Self {
        Self {
            summary,
            profile,
            chart: ChartSeries::default(),
        }
    }

    /// Build a selection from an already-fetched summary, with no profile data.
    pub fn from_summary(summary: StockSummary) -> Self {
        Self::new(summary, StockProfile::default())
    }

    pub fn ticker(&self) -> &str {
        &self.summary.ticker
    }
}
