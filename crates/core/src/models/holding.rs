use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stock::StockSummary;

/// Grouping tag used when no explicit asset type is set on a holding.
pub const DEFAULT_ASSET_TYPE: &str = "Stocks";

/// A single position in the simulated portfolio, keyed by ticker.
///
/// **Invariant**: `purchase_price` is the quantity-weighted average of every
/// purchase merged into this ticker — never a plain overwrite, except when
/// the holding is first created. `shares` is the sum of all add-events'
/// share counts unless explicitly replaced by a direct share edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker symbol, uppercased — unique key within the portfolio
    pub ticker: String,

    pub name: String,

    /// Number of shares held (always > 0)
    pub shares: f64,

    /// Weighted-average cost per share across all purchases
    pub purchase_price: f64,

    /// Last known market price
    pub current_price: f64,

    /// Price movement applied by the most recent tick
    pub change: f64,
    pub change_percent: f64,

    /// Optional grouping tag for allocation breakdowns (defaults to "Stocks")
    #[serde(default)]
    pub asset_type: Option<String>,

    /// When the price fields were last reconciled against a tick
    pub last_updated: DateTime<Utc>,
}

impl Holding {
    /// Open a new position from a quote snapshot.
    pub fn open(stock: &StockSummary, shares: f64, purchase_price: f64) -> Self {
        Self {
            ticker: stock.ticker.to_uppercase(),
            name: stock.name.clone(),
            shares,
            purchase_price,
            current_price: stock.current_price,
            change: stock.change,
            change_percent: stock.change_percent,
            asset_type: None,
            last_updated: Utc::now(),
        }
    }

    /// Merge another purchase into this holding.
    ///
    /// `shares` accumulates; `purchase_price` becomes the share-weighted
    /// average of the old position and the new lot.
    pub fn merge_purchase(&mut self, shares: f64, purchase_price: f64) {
        let new_shares = self.shares + shares;
        self.purchase_price =
            (self.shares * self.purchase_price + shares * purchase_price) / new_shares;
        self.shares = new_shares;
    }

    /// Market value of the position at the current price.
    pub fn market_value(&self) -> f64 {
        self.current_price * self.shares
    }

    /// Total cost basis of the position.
    pub fn cost_basis(&self) -> f64 {
        self.purchase_price * self.shares
    }

    /// The grouping tag, falling back to the default.
    pub fn asset_type_or_default(&self) -> &str {
        self.asset_type.as_deref().unwrap_or(DEFAULT_ASSET_TYPE)
    }
}
