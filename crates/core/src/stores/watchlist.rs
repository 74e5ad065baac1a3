use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::stock::StockSummary;
use crate::storage::blob::{BlobStore, WATCHLIST_KEY};

/// A deduplicated set of stock summaries keyed by ticker.
///
/// Insertion order is preserved for display. Every mutation is followed by a
/// persistence save; a save failure lands in the error field and the
/// in-memory set stays authoritative.
pub struct WatchlistStore {
    stocks: Vec<StockSummary>,
    error: Option<String>,
    blob: Arc<dyn BlobStore>,
}

impl WatchlistStore {
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self {
            stocks: Vec::new(),
            error: None,
            blob,
        }
    }

    /// Hydrate the watchlist from the blob store. A missing blob leaves the
    /// set empty; a load/parse failure is recorded and the set stays empty.
    pub fn load(&mut self) {
        match self.blob.load_blob(WATCHLIST_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<StockSummary>>(&raw) {
                Ok(stocks) => {
                    debug!(count = stocks.len(), "watchlist loaded");
                    self.stocks = stocks;
                }
                Err(e) => {
                    warn!(error = %e, "failed to parse saved watchlist");
                    self.error = Some(format!("Error loading saved watchlist: {e}"));
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "failed to load saved watchlist");
                self.error = Some(e.to_string());
            }
        }
    }

    /// Add a stock. No-op if the ticker is already present.
    pub fn add(&mut self, stock: StockSummary) {
        if self.contains(&stock.ticker) {
            return;
        }
        self.stocks.push(stock);
        self.persist();
    }

    /// Remove a ticker. No-op if absent.
    pub fn remove(&mut self, ticker: &str) {
        let before = self.stocks.len();
        self.stocks
            .retain(|s| !s.ticker.eq_ignore_ascii_case(ticker));
        if self.stocks.len() != before {
            self.persist();
        }
    }

    /// Empty the watchlist and drop its saved blob.
    pub fn clear(&mut self) {
        self.stocks.clear();
        if let Err(e) = self.blob.clear_blob(WATCHLIST_KEY) {
            warn!(error = %e, "failed to clear saved watchlist");
            self.error = Some(e.to_string());
        }
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.stocks
            .iter()
            .any(|s| s.ticker.eq_ignore_ascii_case(ticker))
    }

    pub fn stocks(&self) -> &[StockSummary] {
        &self.stocks
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.stocks)
            .map_err(CoreError::from)
            .and_then(|json| self.blob.save_blob(WATCHLIST_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "failed to save watchlist");
            self.error = Some(e.to_string());
        }
    }
}
