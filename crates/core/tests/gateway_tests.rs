// ═══════════════════════════════════════════════════════════════════
// Gateway Tests — FinnhubGateway against a wiremock server
// ═══════════════════════════════════════════════════════════════════

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stock_dashboard_core::errors::CoreError;
use stock_dashboard_core::gateway::finnhub::FinnhubGateway;
use stock_dashboard_core::gateway::traits::MarketDataGateway;

fn gateway(server: &MockServer) -> FinnhubGateway {
    FinnhubGateway::with_base_url("test-key", server.uri())
}

// ═══════════════════════════════════════════════════════════════════
// Quotes
// ═══════════════════════════════════════════════════════════════════

mod quotes {
    use super::*;

    #[tokio::test]
    async fn quote_parses_full_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "AAPL"))
            .and(query_param("token", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "c": 175.04, "d": 2.34, "dp": 1.35,
                "h": 176.24, "l": 174.5, "o": 174.93, "pc": 172.7
            })))
            .mount(&server)
            .await;

        let quote = gateway(&server).get_quote("AAPL").await.unwrap();
        assert_eq!(quote.current_price, 175.04);
        assert_eq!(quote.change, 2.34);
        assert_eq!(quote.change_percent, 1.35);
        assert_eq!(quote.open, 174.93);
        assert_eq!(quote.high, 176.24);
        assert_eq!(quote.low, 174.5);
        assert_eq!(quote.previous_close, 172.7);
    }

    #[tokio::test]
    async fn null_change_fields_default_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "c": 10.0, "d": null, "dp": null,
                "h": 10.0, "l": 10.0, "o": 10.0, "pc": 10.0
            })))
            .mount(&server)
            .await;

        let quote = gateway(&server).get_quote("NEWCO").await.unwrap();
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.change_percent, 0.0);
    }

    #[tokio::test]
    async fn server_error_maps_to_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = gateway(&server).get_quote("AAPL").await;
        match result {
            Err(CoreError::Transport { status, .. }) => assert_eq!(status, 500),
            other => panic!("Expected Transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dead_server_maps_to_no_response() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let result = FinnhubGateway::with_base_url("test-key", uri)
            .get_quote("AAPL")
            .await;
        assert!(matches!(result, Err(CoreError::NoResponse(_))));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Profile
// ═══════════════════════════════════════════════════════════════════

mod profile {
    use super::*;

    #[tokio::test]
    async fn profile_maps_provider_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/profile2"))
            .and(query_param("symbol", "AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Apple Inc",
                "marketCapitalization": 2600000.0,
                "finnhubIndustry": "Technology",
                "weburl": "https://www.apple.com/",
                "logo": "https://static.finnhub.io/logo/aapl.png"
            })))
            .mount(&server)
            .await;

        let profile = gateway(&server).get_profile("AAPL").await.unwrap();
        assert_eq!(profile.name, "Apple Inc");
        assert_eq!(profile.market_cap, 2600000.0);
        assert_eq!(profile.sector, "Technology");
        assert_eq!(profile.website, "https://www.apple.com/");
        assert_eq!(profile.logo_url, "https://static.finnhub.io/logo/aapl.png");
    }

    #[tokio::test]
    async fn sparse_profile_defaults_missing_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/profile2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let profile = gateway(&server).get_profile("OBSCURE").await.unwrap();
        assert!(profile.name.is_empty());
        assert_eq!(profile.market_cap, 0.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Candles
// ═══════════════════════════════════════════════════════════════════

mod candles {
    use super::*;

    #[tokio::test]
    async fn candles_parse_column_arrays() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/candle"))
            .and(query_param("symbol", "AAPL"))
            .and(query_param("resolution", "D"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "s": "ok",
                "t": [1710720000, 1710806400, 1710892800],
                "o": [174.93, 175.12, 176.5],
                "h": [176.24, 176.9, 177.1],
                "l": [174.5, 174.8, 175.2],
                "c": [175.04, 176.24, 175.84],
                "v": [1000.0, 1100.0, 900.0]
            })))
            .mount(&server)
            .await;

        let series = gateway(&server)
            .get_candles("AAPL", "D", 1710700000, 1710900000)
            .await
            .unwrap();
        assert_eq!(series.timestamps.len(), 3);
        assert_eq!(series.closes, vec![175.04, 176.24, 175.84]);
        assert_eq!(series.opens[0], 174.93);
    }

    #[tokio::test]
    async fn no_data_sentinel_is_a_failure_not_an_empty_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/candle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "s": "no_data" })))
            .mount(&server)
            .await;

        let result = gateway(&server)
            .get_candles("AAPL", "D", 0, 100)
            .await;
        match result {
            Err(CoreError::NoData { symbol }) => assert_eq!(symbol, "AAPL"),
            other => panic!("Expected NoData error, got {:?}", other),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Search with quote enrichment
// ═══════════════════════════════════════════════════════════════════

mod search {
    use super::*;

    #[tokio::test]
    async fn search_enriches_hits_with_quotes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "apple"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "result": [
                    { "symbol": "AAPL", "description": "APPLE INC", "displaySymbol": "AAPL", "type": "Common Stock" }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "c": 175.04, "d": 2.34, "dp": 1.35,
                "h": 176.24, "l": 174.5, "o": 174.93, "pc": 172.7
            })))
            .mount(&server)
            .await;

        let results = gateway(&server).search("apple").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ticker, "AAPL");
        assert_eq!(results[0].name, "APPLE INC");
        assert_eq!(results[0].current_price, 175.04);
    }

    #[tokio::test]
    async fn hits_whose_quote_fails_are_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 2,
                "result": [
                    { "symbol": "AAPL", "description": "APPLE INC" },
                    { "symbol": "BROKEN", "description": "BROKEN CO" }
                ]
            })))
            .mount(&server)
            .await;
        // Only AAPL has a quote; BROKEN's quote request 404s.
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "c": 175.04, "d": 2.34, "dp": 1.35,
                "h": 176.24, "l": 174.5, "o": 174.93, "pc": 172.7
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "BROKEN"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let results = gateway(&server).search("co").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ticker, "AAPL");
    }

    #[tokio::test]
    async fn quote_limit_caps_enrichment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "result": [
                    { "symbol": "A", "description": "A CO" },
                    { "symbol": "B", "description": "B CO" },
                    { "symbol": "C", "description": "C CO" }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "c": 1.0, "d": 0.0, "dp": 0.0,
                "h": 1.0, "l": 1.0, "o": 1.0, "pc": 1.0
            })))
            .mount(&server)
            .await;

        let results = FinnhubGateway::with_base_url("test-key", server.uri())
            .quote_limit(2)
            .search("co")
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn search_transport_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let result = gateway(&server).search("apple").await;
        match result {
            Err(CoreError::Transport { status, .. }) => assert_eq!(status, 429),
            other => panic!("Expected Transport error, got {:?}", other),
        }
    }
}
