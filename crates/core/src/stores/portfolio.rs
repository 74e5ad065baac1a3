use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::metrics::PortfolioMetrics;
use crate::models::stock::StockSummary;
use crate::storage::blob::{BlobStore, PORTFOLIO_KEY};
use crate::streaming::{SharedSession, SubscriptionId};
use crate::valuation;

/// Mutable portfolio state behind the store's lock. Tick callbacks mutate
/// it directly, so it lives in an `Arc<Mutex<_>>` the callbacks can share.
#[derive(Default)]
struct PortfolioState {
    holdings: Vec<Holding>,
    error: Option<String>,
}

impl PortfolioState {
    fn find_mut(&mut self, ticker: &str) -> Option<&mut Holding> {
        self.holdings
            .iter_mut()
            .find(|h| h.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Reconcile one streaming tick. Untracked tickers mutate nothing.
    fn apply_tick(&mut self, ticker: &str, price: f64) {
        if let Some(holding) = self.find_mut(ticker) {
            let previous = holding.current_price;
            holding.change = price - previous;
            holding.change_percent = if previous == 0.0 {
                0.0
            } else {
                holding.change / previous * 100.0
            };
            holding.current_price = price;
            holding.last_updated = Utc::now();
        }
    }
}

/// A ticker-keyed collection of holdings with live price reconciliation.
///
/// Duplicate adds merge: shares accumulate and the purchase price becomes
/// the share-weighted average across all buys. Each held ticker keeps one
/// registration in the shared streaming session; removing the holding closes
/// it synchronously, so no orphaned callback can touch the store afterwards.
pub struct PortfolioStore {
    state: Arc<Mutex<PortfolioState>>,
    session: SharedSession,
    registrations: HashMap<String, SubscriptionId>,
    blob: Arc<dyn BlobStore>,
}

impl PortfolioStore {
    pub fn new(session: SharedSession, blob: Arc<dyn BlobStore>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PortfolioState::default())),
            session,
            registrations: HashMap::new(),
            blob,
        }
    }

    /// Hydrate holdings from the blob store and reopen a streaming
    /// subscription for each held ticker. Load failures are recorded and
    /// the portfolio stays empty.
    pub fn load(&mut self) {
        let loaded: Vec<Holding> = match self.blob.load_blob(PORTFOLIO_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(holdings) => holdings,
                Err(e) => {
                    warn!(error = %e, "failed to parse saved portfolio");
                    self.lock_state().error =
                        Some(format!("Error loading saved portfolio: {e}"));
                    return;
                }
            },
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "failed to load saved portfolio");
                self.lock_state().error = Some(e.to_string());
                return;
            }
        };

        debug!(count = loaded.len(), "portfolio loaded");
        let tickers: Vec<String> = loaded.iter().map(|h| h.ticker.clone()).collect();
        self.lock_state().holdings = loaded;
        for ticker in tickers {
            self.open_subscription(&ticker);
        }
    }

    /// Add shares of a stock to the portfolio.
    ///
    /// `shares` defaults to 1 when unspecified; a non-positive value is
    /// rejected and the store is unchanged. `purchase_price` defaults to the
    /// stock's current price. An existing holding merges: shares accumulate
    /// and the purchase price becomes the weighted average. Only a brand-new
    /// ticker opens a streaming subscription.
    pub fn add_holding(
        &mut self,
        stock: &StockSummary,
        shares: Option<f64>,
        purchase_price: Option<f64>,
    ) -> Result<(), CoreError> {
        let shares = match shares {
            None => 1.0,
            Some(s) if !s.is_finite() || s <= 0.0 => {
                return Err(CoreError::Validation(format!(
                    "Share count must be positive, got {s}"
                )));
            }
            Some(s) => s,
        };
        let price = match purchase_price {
            None => stock.current_price,
            Some(p) if !p.is_finite() || p < 0.0 => {
                return Err(CoreError::Validation(format!(
                    "Purchase price must be non-negative, got {p}"
                )));
            }
            Some(p) => p,
        };

        let ticker = stock.ticker.to_uppercase();
        let is_new = {
            let mut state = self.lock_state();
            let merged = match state.find_mut(&ticker) {
                Some(existing) => {
                    existing.merge_purchase(shares, price);
                    debug!(ticker = %ticker, shares = existing.shares, "merged purchase into holding");
                    true
                }
                None => false,
            };
            if !merged {
                state.holdings.push(Holding::open(stock, shares, price));
                debug!(ticker = %ticker, shares, "opened new holding");
            }
            !merged
        };

        if is_new {
            self.open_subscription(&ticker);
        }
        self.persist();
        Ok(())
    }

    /// Remove a holding and close its streaming subscription. No-op if the
    /// ticker is not held.
    pub fn remove_holding(&mut self, ticker: &str) {
        let removed = {
            let mut state = self.lock_state();
            let before = state.holdings.len();
            state
                .holdings
                .retain(|h| !h.ticker.eq_ignore_ascii_case(ticker));
            state.holdings.len() != before
        };
        if !removed {
            return;
        }

        self.close_subscription(ticker);
        self.persist();
        debug!(ticker, "holding removed");
    }

    /// Overwrite the share count of an existing holding — a direct edit,
    /// not a merge. Silent no-op if the ticker is not held; a non-positive
    /// count is rejected with the prior value intact.
    pub fn set_shares(&mut self, ticker: &str, shares: f64) -> Result<(), CoreError> {
        if !shares.is_finite() || shares <= 0.0 {
            return Err(CoreError::Validation(format!(
                "Share count must be positive, got {shares}"
            )));
        }

        let changed = {
            let mut state = self.lock_state();
            match state.find_mut(ticker) {
                Some(holding) => {
                    holding.shares = shares;
                    true
                }
                None => false,
            }
        };
        if changed {
            self.persist();
        }
        Ok(())
    }

    /// Reconcile a streaming price tick against the matching holding.
    /// Untracked tickers and an empty portfolio mutate nothing.
    pub fn apply_price_tick(&self, ticker: &str, price: f64) {
        self.lock_state().apply_tick(ticker, price);
    }

    /// Unsubscribe every held ticker, empty the collection, and drop the
    /// saved blob.
    pub fn clear(&mut self) {
        let ids: Vec<SubscriptionId> = self.registrations.drain().map(|(_, id)| id).collect();
        {
            let mut session = self.lock_session();
            for id in ids {
                session.unsubscribe(id);
            }
        }
        self.lock_state().holdings.clear();
        if let Err(e) = self.blob.clear_blob(PORTFOLIO_KEY) {
            warn!(error = %e, "failed to clear saved portfolio");
            self.lock_state().error = Some(e.to_string());
        }
        debug!("portfolio cleared");
    }

    // ── Snapshots ───────────────────────────────────────────────────

    /// Current holdings, in insertion order.
    pub fn holdings(&self) -> Vec<Holding> {
        self.lock_state().holdings.clone()
    }

    pub fn get(&self, ticker: &str) -> Option<Holding> {
        self.lock_state()
            .holdings
            .iter()
            .find(|h| h.ticker.eq_ignore_ascii_case(ticker))
            .cloned()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.get(ticker).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock_state().holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate valuation metrics for the current snapshot.
    pub fn metrics(&self) -> PortfolioMetrics {
        valuation::portfolio_metrics(&self.lock_state().holdings)
    }

    pub fn error(&self) -> Option<String> {
        self.lock_state().error.clone()
    }

    pub fn clear_error(&self) {
        self.lock_state().error = None;
    }

    // ── Internal ────────────────────────────────────────────────────

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PortfolioState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, crate::streaming::StreamingSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register this store's tick callback for a ticker. A feed failure is
    /// recorded in the error field; the holding itself stays.
    fn open_subscription(&mut self, ticker: &str) {
        let state = Arc::clone(&self.state);
        let key = ticker.to_uppercase();
        let callback_ticker = key.clone();
        let result = self.lock_session().subscribe(&key, move |price| {
            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            state.apply_tick(&callback_ticker, price);
        });
        match result {
            Ok(id) => {
                self.registrations.insert(key, id);
            }
            Err(e) => {
                warn!(ticker = %key, error = %e, "could not open price subscription");
                self.lock_state().error = Some(e.to_string());
            }
        }
    }

    fn close_subscription(&mut self, ticker: &str) {
        if let Some(id) = self.registrations.remove(&ticker.to_uppercase()) {
            self.lock_session().unsubscribe(id);
        }
    }

    fn persist(&mut self) {
        let json = {
            let state = self.lock_state();
            serde_json::to_string(&state.holdings)
        };
        let result = json
            .map_err(CoreError::from)
            .and_then(|json| self.blob.save_blob(PORTFOLIO_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "failed to save portfolio");
            self.lock_state().error = Some(e.to_string());
        }
    }
}
