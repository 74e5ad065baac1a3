//! Portfolio valuation engine.
//!
//! Pure functions over a portfolio snapshot — no state, no I/O. Every
//! function is total: an empty portfolio yields zeros, and every division
//! is guarded so no input produces a NaN or infinity.

use std::collections::HashMap;

use crate::models::holding::Holding;
use crate::models::metrics::{Allocation, PortfolioMetrics};

/// Sum of current_price × shares across the portfolio.
pub fn total_value(holdings: &[Holding]) -> f64 {
    holdings.iter().map(Holding::market_value).sum()
}

/// Sum of purchase_price × shares across the portfolio.
pub fn total_cost(holdings: &[Holding]) -> f64 {
    holdings.iter().map(Holding::cost_basis).sum()
}

/// Absolute gain/loss: total value minus total cost.
pub fn total_gain_loss(holdings: &[Holding]) -> f64 {
    holdings
        .iter()
        .map(|h| (h.current_price - h.purchase_price) * h.shares)
        .sum()
}

/// Percentage return on cost. Zero-cost portfolios return 0.
pub fn total_gain_loss_percentage(holdings: &[Holding]) -> f64 {
    let cost = total_cost(holdings);
    if cost > 0.0 {
        total_gain_loss(holdings) / cost * 100.0
    } else {
        0.0
    }
}

/// Sum of today's price change × shares across the portfolio.
pub fn daily_change(holdings: &[Holding]) -> f64 {
    holdings.iter().map(|h| h.change * h.shares).sum()
}

/// Daily change as a percentage of total value. Zero-value portfolios
/// return 0.
pub fn daily_change_percentage(holdings: &[Holding]) -> f64 {
    let value = total_value(holdings);
    if value > 0.0 {
        daily_change(holdings) / value * 100.0
    } else {
        0.0
    }
}

/// Per-holding share of the portfolio by market value, in input order.
pub fn allocations(holdings: &[Holding]) -> Vec<Allocation> {
    let value = total_value(holdings);
    holdings
        .iter()
        .map(|h| {
            let market_value = h.market_value();
            Allocation {
                ticker: h.ticker.clone(),
                value: market_value,
                percent: if value > 0.0 {
                    market_value / value * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// Market value summed per asset-type tag (untagged holdings group under
/// "Stocks"). Used for pie-chart-style breakdowns.
pub fn distribution_by_type(holdings: &[Holding]) -> HashMap<String, f64> {
    let mut groups: HashMap<String, f64> = HashMap::new();
    for holding in holdings {
        *groups
            .entry(holding.asset_type_or_default().to_string())
            .or_insert(0.0) += holding.market_value();
    }
    groups
}

/// All aggregate metrics in one pass-friendly bundle.
pub fn portfolio_metrics(holdings: &[Holding]) -> PortfolioMetrics {
    PortfolioMetrics {
        total_value: total_value(holdings),
        total_cost: total_cost(holdings),
        total_gain_loss: total_gain_loss(holdings),
        total_gain_loss_percent: total_gain_loss_percentage(holdings),
        daily_change: daily_change(holdings),
        daily_change_percent: daily_change_percentage(holdings),
    }
}

// ── Display helpers ─────────────────────────────────────────────────

/// Format a value as US-dollar currency, e.g. `$1,234.56` / `-$0.75`.
pub fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let dollars = cents / 100;
    let rem = cents % 100;

    // Insert thousands separators into the dollar part.
    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{rem:02}")
}

/// Format a percentage with an always-visible sign, e.g. `+1.35%`.
pub fn format_percentage(value: f64) -> String {
    format!("{value:+.2}%")
}
