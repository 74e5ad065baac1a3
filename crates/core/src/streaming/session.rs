use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::gateway::traits::PriceFeed;

/// Handle to one callback registration in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

struct Registration {
    id: SubscriptionId,
    on_tick: Box<dyn FnMut(f64) + Send>,
}

/// The one subscription table shared by every store that consumes streaming
/// prices.
///
/// Per ticker it keeps the set of callback registrations; the external feed
/// is told to subscribe exactly once, when the first registration for a
/// ticker appears, and to unsubscribe exactly once, when the last one is
/// removed. Ticks dispatched for a ticker nobody registered are dropped —
/// a tick racing a removal can never mutate store state.
///
/// Constructed by the composition root and injected into the stores, so
/// tests can swap in a recording feed and nothing leaks between instances.
pub struct StreamingSession {
    feed: Box<dyn PriceFeed>,
    subscribers: HashMap<String, Vec<Registration>>,
}

/// Shared handle the stores hold.
pub type SharedSession = Arc<Mutex<StreamingSession>>;

impl StreamingSession {
    pub fn new(feed: Box<dyn PriceFeed>) -> Self {
        Self {
            feed,
            subscribers: HashMap::new(),
        }
    }

    /// Wrap a session for sharing across stores.
    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// Register a callback for a ticker's price ticks.
    ///
    /// The first registration for a ticker issues the external subscribe; if
    /// that fails, nothing is registered and the error is returned.
    pub fn subscribe(
        &mut self,
        ticker: &str,
        on_tick: impl FnMut(f64) + Send + 'static,
    ) -> Result<SubscriptionId, CoreError> {
        let key = ticker.to_uppercase();

        if !self.subscribers.contains_key(&key) {
            self.feed.subscribe(&key)?;
            debug!(ticker = %key, "opened feed subscription");
        }

        let id = SubscriptionId(Uuid::new_v4());
        self.subscribers.entry(key).or_default().push(Registration {
            id,
            on_tick: Box::new(on_tick),
        });
        Ok(id)
    }

    /// Remove one registration. When the ticker's set empties, the external
    /// unsubscribe is issued. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut found = false;
        let mut emptied: Option<String> = None;

        for (ticker, regs) in self.subscribers.iter_mut() {
            let before = regs.len();
            regs.retain(|r| r.id != id);
            if regs.len() != before {
                found = true;
                if regs.is_empty() {
                    emptied = Some(ticker.clone());
                }
                break;
            }
        }

        if let Some(ticker) = emptied {
            self.subscribers.remove(&ticker);
            if let Err(e) = self.feed.unsubscribe(&ticker) {
                warn!(ticker = %ticker, error = %e, "feed unsubscribe failed");
            }
            debug!(ticker = %ticker, "closed feed subscription");
        }
        found
    }

    /// Remove every registration for a ticker and close its feed
    /// subscription. No-op for an unknown ticker.
    pub fn unsubscribe_ticker(&mut self, ticker: &str) {
        let key = ticker.to_uppercase();
        if self.subscribers.remove(&key).is_some() {
            if let Err(e) = self.feed.unsubscribe(&key) {
                warn!(ticker = %key, error = %e, "feed unsubscribe failed");
            }
            debug!(ticker = %key, "closed feed subscription");
        }
    }

    /// Deliver a tick to every callback registered for the ticker. Returns
    /// how many callbacks ran; an unsubscribed ticker delivers to none.
    pub fn dispatch(&mut self, ticker: &str, price: f64) -> usize {
        let key = ticker.to_uppercase();
        match self.subscribers.get_mut(&key) {
            Some(regs) => {
                for reg in regs.iter_mut() {
                    (reg.on_tick)(price);
                }
                regs.len()
            }
            None => 0,
        }
    }

    pub fn is_subscribed(&self, ticker: &str) -> bool {
        self.subscribers.contains_key(&ticker.to_uppercase())
    }

    /// Number of registrations currently held for a ticker.
    pub fn registration_count(&self, ticker: &str) -> usize {
        self.subscribers
            .get(&ticker.to_uppercase())
            .map_or(0, Vec::len)
    }

    /// Tickers with at least one live registration, sorted for determinism.
    pub fn active_tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.subscribers.keys().cloned().collect();
        tickers.sort();
        tickers
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("active_tickers", &self.active_tickers())
            .finish()
    }
}
