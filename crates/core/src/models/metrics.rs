use serde::{Deserialize, Serialize};

/// Aggregate portfolio metrics computed by the valuation engine.
///
/// All percentage fields are guarded: a zero denominator yields 0, never a
/// NaN or infinity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// Sum of current_price × shares across all holdings
    pub total_value: f64,

    /// Sum of purchase_price × shares across all holdings
    pub total_cost: f64,

    /// total_value − total_cost
    pub total_gain_loss: f64,

    /// (total_gain_loss / total_cost) × 100, or 0 for a zero-cost portfolio
    pub total_gain_loss_percent: f64,

    /// Sum of change × shares across all holdings
    pub daily_change: f64,

    /// (daily_change / total_value) × 100, or 0 for a zero-value portfolio
    pub daily_change_percent: f64,
}

/// One holding's share of the portfolio by market value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub ticker: String,

    /// Market value of the position
    pub value: f64,

    /// Percentage of total portfolio value (0 when the portfolio is empty)
    pub percent: f64,
}
