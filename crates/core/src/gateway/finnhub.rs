use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::traits::{CandleSeries, MarketDataGateway};
use crate::errors::CoreError;
use crate::models::stock::{Quote, StockProfile, StockSummary};

const BASE_URL: &str = "https://finnhub.io/api/v1";

/// Finnhub REST gateway.
///
/// - **Endpoints**: `/search`, `/quote`, `/stock/profile2`, `/stock/candle`
/// - Search hits carry no price data, so the top hits are enriched with
///   concurrently fetched quotes before they are returned as summaries.
/// - The candle endpoint reports an explicit `"no_data"` status for empty
///   ranges; that surfaces as `CoreError::NoData`, not an empty series.
pub struct FinnhubGateway {
    client: Client,
    base_url: String,
    api_key: String,
    /// How many search hits get a quote attached.
    quote_limit: usize,
}

impl FinnhubGateway {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Point the gateway at a different base URL (test servers).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            quote_limit: 10,
        }
    }

    pub fn quote_limit(mut self, limit: usize) -> Self {
        self.quote_limit = limit;
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<T>().await?)
    }
}

// ── Finnhub API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    symbol: String,
    description: String,
}

#[derive(Deserialize)]
struct QuoteResponse {
    /// Current price
    c: f64,
    /// Absolute change (null outside trading data)
    d: Option<f64>,
    /// Percent change
    dp: Option<f64>,
    h: f64,
    l: f64,
    o: f64,
    /// Previous close
    pc: f64,
}

#[derive(Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "marketCapitalization")]
    market_capitalization: f64,
    #[serde(default, rename = "finnhubIndustry")]
    finnhub_industry: String,
    #[serde(default)]
    weburl: String,
    #[serde(default)]
    logo: String,
}

#[derive(Deserialize)]
struct CandleResponse {
    /// Status: "ok" or "no_data"
    s: String,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    o: Vec<f64>,
    #[serde(default)]
    h: Vec<f64>,
    #[serde(default)]
    l: Vec<f64>,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    v: Vec<f64>,
}

impl From<QuoteResponse> for Quote {
    fn from(q: QuoteResponse) -> Self {
        Quote {
            current_price: q.c,
            change: q.d.unwrap_or(0.0),
            change_percent: q.dp.unwrap_or(0.0),
            open: q.o,
            high: q.h,
            low: q.l,
            previous_close: q.pc,
        }
    }
}

#[async_trait]
impl MarketDataGateway for FinnhubGateway {
    async fn search(&self, query: &str) -> Result<Vec<StockSummary>, CoreError> {
        let resp: SearchResponse = self.get_json("/search", &[("q", query)]).await?;
        debug!(query, hits = resp.result.len(), "search results received");

        // Search hits have no prices; attach quotes to the top hits so the
        // caller gets full summaries. Hits whose quote fails are dropped.
        let hits: Vec<SearchHit> = resp.result.into_iter().take(self.quote_limit).collect();
        let quotes = join_all(hits.iter().map(|hit| self.get_quote(&hit.symbol))).await;

        let summaries = hits
            .iter()
            .zip(quotes)
            .filter_map(|(hit, quote)| {
                let quote = quote.ok()?;
                Some(StockSummary::from_quote(
                    hit.symbol.as_str(),
                    hit.description.as_str(),
                    &quote,
                ))
            })
            .collect();
        Ok(summaries)
    }

    async fn get_quote(&self, ticker: &str) -> Result<Quote, CoreError> {
        let resp: QuoteResponse = self.get_json("/quote", &[("symbol", ticker)]).await?;
        Ok(resp.into())
    }

    async fn get_profile(&self, ticker: &str) -> Result<StockProfile, CoreError> {
        let resp: ProfileResponse = self
            .get_json("/stock/profile2", &[("symbol", ticker)])
            .await?;
        Ok(StockProfile {
            name: resp.name,
            market_cap: resp.market_capitalization,
            sector: resp.finnhub_industry,
            website: resp.weburl,
            logo_url: resp.logo,
        })
    }

    async fn get_candles(
        &self,
        ticker: &str,
        resolution: &str,
        from: i64,
        to: i64,
    ) -> Result<CandleSeries, CoreError> {
        let from_s = from.to_string();
        let to_s = to.to_string();
        let resp: CandleResponse = self
            .get_json(
                "/stock/candle",
                &[
                    ("symbol", ticker),
                    ("resolution", resolution),
                    ("from", from_s.as_str()),
                    ("to", to_s.as_str()),
                ],
            )
            .await?;

        if resp.s == "no_data" {
            return Err(CoreError::NoData {
                symbol: ticker.to_uppercase(),
            });
        }

        Ok(CandleSeries {
            timestamps: resp.t,
            opens: resp.o,
            highs: resp.h,
            lows: resp.l,
            closes: resp.c,
            volumes: resp.v,
        })
    }
}
