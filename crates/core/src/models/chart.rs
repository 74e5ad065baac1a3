use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chart time range. The fixed enumeration the UI can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartPeriod {
    #[serde(rename = "1week")]
    Week,
    #[serde(rename = "1month")]
    Month,
    #[serde(rename = "1year")]
    Year,
}

impl ChartPeriod {
    /// The period token used on the wire and in the UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartPeriod::Week => "1week",
            ChartPeriod::Month => "1month",
            ChartPeriod::Year => "1year",
        }
    }

    /// Candle resolution requested from the gateway for this period.
    pub fn resolution(&self) -> &'static str {
        // Daily candles for every period; the span varies instead.
        "D"
    }

    /// Calendar span of the period in days.
    pub fn span_days(&self) -> i64 {
        match self {
            ChartPeriod::Week => 7,
            ChartPeriod::Month => 30,
            ChartPeriod::Year => 365,
        }
    }

    pub fn all() -> [ChartPeriod; 3] {
        [ChartPeriod::Week, ChartPeriod::Month, ChartPeriod::Year]
    }
}

impl std::fmt::Display for ChartPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChartPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1week" => Ok(ChartPeriod::Week),
            "1month" => Ok(ChartPeriod::Month),
            "1year" => Ok(ChartPeriod::Year),
            other => Err(format!("unknown chart period '{other}'")),
        }
    }
}

/// A single daily candle in a chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Calendar day of the candle (daily granularity, no time component)
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
}

/// Per-period chart data for a selected stock.
///
/// Each period maps to a sequence of points ordered ascending by date. The
/// data source is trusted to supply unique dates per period; the store never
/// deduplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    periods: HashMap<ChartPeriod, Vec<ChartPoint>>,
}

impl ChartSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(&self, period: ChartPeriod) -> Option<&[ChartPoint]> {
        self.periods.get(&period).map(Vec::as_slice)
    }

    /// Replace the data for one period, leaving the others untouched.
    pub fn set_period(&mut self, period: ChartPeriod, points: Vec<ChartPoint>) {
        self.periods.insert(period, points);
    }

    pub fn has_period(&self, period: ChartPeriod) -> bool {
        self.periods.contains_key(&period)
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}
