// ═══════════════════════════════════════════════════════════════════
// Model Tests — ChartPeriod, ChartSeries, Holding, StockSummary
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;

use stock_dashboard_core::gateway::traits::CandleSeries;
use stock_dashboard_core::models::chart::{ChartPeriod, ChartPoint, ChartSeries};
use stock_dashboard_core::models::holding::Holding;
use stock_dashboard_core::models::stock::{Quote, SelectedStock, StockSummary};
use stock_dashboard_core::stores::catalog::candles_to_points;

fn make_date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn point(y: i32, m: u32, d: u32, close: f64) -> ChartPoint {
    ChartPoint {
        date: make_date(y, m, d),
        open: close - 0.5,
        close,
        high: None,
        low: None,
    }
}

mod chart_period {
    use super::*;

    #[test]
    fn tokens_round_trip_through_from_str() {
        for period in ChartPeriod::all() {
            assert_eq!(period.as_str().parse::<ChartPeriod>().unwrap(), period);
        }
    }

    #[test]
    fn unknown_token_is_rejected() {
        assert!("1decade".parse::<ChartPeriod>().is_err());
    }

    #[test]
    fn serde_uses_wire_tokens() {
        assert_eq!(
            serde_json::to_string(&ChartPeriod::Week).unwrap(),
            "\"1week\""
        );
        let parsed: ChartPeriod = serde_json::from_str("\"1year\"").unwrap();
        assert_eq!(parsed, ChartPeriod::Year);
    }

    #[test]
    fn spans_match_the_period() {
        assert_eq!(ChartPeriod::Week.span_days(), 7);
        assert_eq!(ChartPeriod::Month.span_days(), 30);
        assert_eq!(ChartPeriod::Year.span_days(), 365);
    }
}

mod chart_series {
    use super::*;

    #[test]
    fn set_period_replaces_only_that_period() {
        let mut series = ChartSeries::new();
        series.set_period(ChartPeriod::Week, vec![point(2024, 3, 18, 175.04)]);
        series.set_period(ChartPeriod::Month, vec![point(2024, 3, 1, 170.0)]);

        series.set_period(ChartPeriod::Week, vec![point(2024, 3, 19, 176.24)]);

        assert_eq!(series.period(ChartPeriod::Week).unwrap().len(), 1);
        assert_eq!(series.period(ChartPeriod::Week).unwrap()[0].close, 176.24);
        assert_eq!(series.period(ChartPeriod::Month).unwrap()[0].close, 170.0);
        assert!(series.period(ChartPeriod::Year).is_none());
    }

    #[test]
    fn empty_series_has_no_periods() {
        let series = ChartSeries::new();
        assert!(series.is_empty());
        for period in ChartPeriod::all() {
            assert!(!series.has_period(period));
        }
    }

    #[test]
    fn candles_convert_in_timestamp_order() {
        let series = CandleSeries {
            timestamps: vec![1_710_720_000, 1_710_806_400],
            opens: vec![174.93, 175.12],
            highs: vec![176.24, 176.9],
            lows: vec![174.5, 174.8],
            closes: vec![175.04, 176.24],
            volumes: vec![1000.0, 1100.0],
        };

        let points = candles_to_points(&series);
        assert_eq!(points.len(), 2);
        assert!(points[0].date < points[1].date);
        assert_eq!(points[0].close, 175.04);
        assert_eq!(points[0].high, Some(176.24));
        assert_eq!(points[1].low, Some(174.8));
    }

    #[test]
    fn ragged_candle_columns_drop_incomplete_rows() {
        let series = CandleSeries {
            timestamps: vec![1_710_720_000, 1_710_806_400],
            opens: vec![174.93],
            highs: vec![],
            lows: vec![],
            closes: vec![175.04],
            volumes: vec![],
        };

        let points = candles_to_points(&series);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].high, None);
    }
}

mod holding {
    use super::*;

    fn stock(ticker: &str, price: f64) -> StockSummary {
        StockSummary {
            ticker: ticker.to_string(),
            name: format!("{ticker} Inc."),
            current_price: price,
            change: 1.0,
            change_percent: 0.5,
            open: price,
            high: price,
            low: price,
        }
    }

    #[test]
    fn open_copies_the_quote_snapshot() {
        let holding = Holding::open(&stock("AAPL", 175.0), 2.0, 150.0);
        assert_eq!(holding.ticker, "AAPL");
        assert_eq!(holding.shares, 2.0);
        assert_eq!(holding.purchase_price, 150.0);
        assert_eq!(holding.current_price, 175.0);
        assert!(holding.asset_type.is_none());
    }

    #[test]
    fn open_uppercases_the_ticker() {
        let holding = Holding::open(&stock("aapl", 175.0), 1.0, 175.0);
        assert_eq!(holding.ticker, "AAPL");
    }

    #[test]
    fn merge_accumulates_shares_and_averages_cost() {
        let mut holding = Holding::open(&stock("AAPL", 175.0), 2.0, 10.0);
        holding.merge_purchase(3.0, 20.0);

        assert!((holding.shares - 5.0).abs() < 1e-9);
        assert!((holding.purchase_price - 16.0).abs() < 1e-9);
    }

    #[test]
    fn value_and_cost_helpers() {
        let holding = Holding::open(&stock("AAPL", 175.0), 2.0, 150.0);
        assert_eq!(holding.market_value(), 350.0);
        assert_eq!(holding.cost_basis(), 300.0);
    }

    #[test]
    fn serde_round_trip_defaults_missing_asset_type() {
        let holding = Holding::open(&stock("AAPL", 175.0), 2.0, 150.0);
        let mut json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&holding).unwrap()).unwrap();
        // Old snapshots may predate the asset_type field.
        json.as_object_mut().unwrap().remove("asset_type");

        let parsed: Holding = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.ticker, "AAPL");
        assert!(parsed.asset_type.is_none());
        assert_eq!(parsed.asset_type_or_default(), "Stocks");
    }
}

mod stock_summary {
    use super::*;

    #[test]
    fn new_uppercases_the_ticker() {
        let summary = StockSummary::new("msft", "Microsoft");
        assert_eq!(summary.ticker, "MSFT");
        assert_eq!(summary.current_price, 0.0);
    }

    #[test]
    fn from_quote_copies_price_fields() {
        let quote = Quote {
            current_price: 175.04,
            change: 2.34,
            change_percent: 1.35,
            open: 174.93,
            high: 176.24,
            low: 174.5,
            previous_close: 172.7,
        };
        let summary = StockSummary::from_quote("aapl", "Apple Inc.", &quote);
        assert_eq!(summary.ticker, "AAPL");
        assert_eq!(summary.current_price, 175.04);
        assert_eq!(summary.change, 2.34);
        assert_eq!(summary.open, 174.93);
    }

    #[test]
    fn selected_stock_starts_with_an_empty_chart() {
        let selected = SelectedStock::from_summary(StockSummary::new("AAPL", "Apple"));
        assert!(selected.chart.is_empty());
        assert_eq!(selected.ticker(), "AAPL");
    }
}
