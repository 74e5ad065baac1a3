use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::gateway::traits::{CandleSeries, MarketDataGateway};
use crate::models::chart::{ChartPeriod, ChartPoint};
use crate::models::stock::{SelectedStock, StockSummary};
use crate::streaming::{SharedSession, SubscriptionId};

/// Lifecycle of the store's most recent fetch. `Failed` is not terminal —
/// any new fetch re-enters `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Mutable catalog state behind the store's lock. Tick callbacks mutate it
/// directly, so it lives in an `Arc<Mutex<_>>` the callbacks can share.
#[derive(Default)]
struct CatalogState {
    search_results: Vec<StockSummary>,
    selected: Option<SelectedStock>,
    selected_period: Option<ChartPeriod>,
    /// Latest streamed price per ticker, recorded whether or not the ticker
    /// is the current selection.
    live_prices: HashMap<String, f64>,
    status: FetchStatus,
    error: Option<String>,
}

impl CatalogState {
    fn apply_tick(&mut self, ticker: &str, price: f64) {
        let key = ticker.to_uppercase();
        if let Some(selected) = self.selected.as_mut() {
            if selected.summary.ticker == key {
                selected.summary.current_price = price;
            }
        }
        self.live_prices.insert(key, price);
    }

    /// A stale fetch completed: clear its loading flag without touching the
    /// live selection's state.
    fn settle_stale_fetch(&mut self) {
        if self.status == FetchStatus::Loading {
            self.status = if self.selected.is_some() {
                FetchStatus::Succeeded
            } else {
                FetchStatus::Idle
            };
        }
    }
}

/// Holds search results, the selected stock with its per-period chart data,
/// and the side map of live prices.
///
/// Fetch failures never reach the caller: they land in the error field with
/// the loading flag cleared and no partial mutation, for the UI to render.
/// Catalog state is ephemeral — nothing here is persisted.
pub struct StockCatalogStore {
    gateway: Arc<dyn MarketDataGateway>,
    session: SharedSession,
    state: Arc<Mutex<CatalogState>>,
    /// Registration for the current selection's price subscription.
    selection_sub: Option<SubscriptionId>,
}

impl StockCatalogStore {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, session: SharedSession) -> Self {
        Self {
            gateway,
            session,
            state: Arc::new(Mutex::new(CatalogState::default())),
            selection_sub: None,
        }
    }

    // ── Search ──────────────────────────────────────────────────────

    /// Search for stocks matching `query`.
    ///
    /// An empty or whitespace query never reaches the gateway. A transport
    /// failure empties the results and is captured in the error field —
    /// nothing is thrown to the caller.
    pub async fn search(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            let mut state = self.lock_state();
            state.search_results.clear();
            state.error = None;
            return;
        }

        {
            let mut state = self.lock_state();
            state.status = FetchStatus::Loading;
            state.error = None;
        }

        match self.gateway.search(query).await {
            Ok(results) => {
                debug!(query, count = results.len(), "search succeeded");
                let mut state = self.lock_state();
                state.search_results = results;
                state.status = FetchStatus::Succeeded;
            }
            Err(e) => {
                warn!(query, error = %e, "search failed");
                let mut state = self.lock_state();
                state.search_results.clear();
                state.error = Some(e.to_string());
                state.status = FetchStatus::Failed;
            }
        }
    }

    pub fn clear_search_results(&self) {
        let mut state = self.lock_state();
        state.search_results.clear();
        state.error = None;
    }

    // ── Selection ───────────────────────────────────────────────────

    /// Load quote and profile for a ticker (concurrently) and make it the
    /// selected stock.
    ///
    /// Success replaces the selection wholesale and moves the streaming
    /// subscription to the new ticker. Failure is captured in the error
    /// field and the prior selection — and its subscription — stay intact.
    pub async fn select_by_ticker(&mut self, ticker: &str) {
        let key = ticker.to_uppercase();
        {
            let mut state = self.lock_state();
            state.status = FetchStatus::Loading;
            state.error = None;
        }

        let (quote, profile) =
            tokio::join!(self.gateway.get_quote(&key), self.gateway.get_profile(&key));

        let (quote, profile) = match (quote, profile) {
            (Ok(q), Ok(p)) => (q, p),
            (Err(e), _) | (_, Err(e)) => {
                warn!(ticker = %key, error = %e, "stock detail fetch failed");
                let mut state = self.lock_state();
                state.error = Some(e.to_string());
                state.status = FetchStatus::Failed;
                return;
            }
        };

        let name = if profile.name.is_empty() {
            key.clone()
        } else {
            profile.name.clone()
        };
        let summary = StockSummary::from_quote(key.as_str(), name, &quote);
        self.install_selection(SelectedStock::new(summary, profile));
        debug!(ticker = %key, "stock selected");
    }

    /// Make an already-fetched summary the selected stock — no gateway
    /// round-trip, no profile data.
    pub fn select_by_snapshot(&mut self, summary: StockSummary) {
        let ticker = summary.ticker.clone();
        self.install_selection(SelectedStock::from_summary(summary));
        debug!(ticker = %ticker, "stock selected from snapshot");
    }

    /// Drop the selection and close its streaming subscription.
    pub fn deselect(&mut self) {
        {
            let mut state = self.lock_state();
            state.selected = None;
            state.selected_period = None;
        }
        if let Some(id) = self.selection_sub.take() {
            self.lock_session().unsubscribe(id);
        }
    }

    // ── Chart data ──────────────────────────────────────────────────

    /// Fetch one period's chart slice and patch it into the selection.
    ///
    /// If the selection changed while the fetch was in flight, the late
    /// response — success or failure — is discarded rather than merged
    /// into the new selection.
    pub async fn load_chart_period(&self, ticker: &str, period: ChartPeriod) {
        let key = ticker.to_uppercase();
        {
            let mut state = self.lock_state();
            state.status = FetchStatus::Loading;
            state.error = None;
        }

        let to = Utc::now().timestamp();
        let from = to - period.span_days() * 86_400;

        match self
            .gateway
            .get_candles(&key, period.resolution(), from, to)
            .await
        {
            Ok(series) => {
                self.apply_chart_response(&key, period, candles_to_points(&series));
            }
            Err(e) => {
                let mut state = self.lock_state();
                let still_selected = state
                    .selected
                    .as_ref()
                    .is_some_and(|s| s.summary.ticker == key);
                if still_selected {
                    warn!(ticker = %key, period = %period, error = %e, "chart fetch failed");
                    state.error = Some(e.to_string());
                    state.status = FetchStatus::Failed;
                } else {
                    debug!(ticker = %key, "discarding error from stale chart fetch");
                    state.settle_stale_fetch();
                }
            }
        }
    }

    /// Patch one period of chart data into the selection, but only when the
    /// response's ticker still matches the selected one. Returns whether the
    /// data was applied.
    pub fn apply_chart_response(
        &self,
        ticker: &str,
        period: ChartPeriod,
        points: Vec<ChartPoint>,
    ) -> bool {
        let key = ticker.to_uppercase();
        let mut state = self.lock_state();
        match state.selected.as_mut() {
            Some(selected) if selected.summary.ticker == key => {
                selected.chart.set_period(period, points);
                state.status = FetchStatus::Succeeded;
                true
            }
            _ => {
                debug!(ticker = %key, period = %period, "discarding stale chart response");
                state.settle_stale_fetch();
                false
            }
        }
    }

    /// Set the chart period the UI is looking at.
    pub fn set_period(&self, period: ChartPeriod) {
        self.lock_state().selected_period = Some(period);
    }

    // ── Streaming ───────────────────────────────────────────────────

    /// Reconcile a streaming price tick. The selection's price is updated
    /// in place when the ticker matches; the tick is always recorded in the
    /// side live-price map.
    pub fn apply_price_tick(&self, ticker: &str, price: f64) {
        self.lock_state().apply_tick(ticker, price);
    }

    // ── Snapshots ───────────────────────────────────────────────────

    pub fn search_results(&self) -> Vec<StockSummary> {
        self.lock_state().search_results.clone()
    }

    pub fn selected(&self) -> Option<SelectedStock> {
        self.lock_state().selected.clone()
    }

    pub fn selected_ticker(&self) -> Option<String> {
        self.lock_state()
            .selected
            .as_ref()
            .map(|s| s.summary.ticker.clone())
    }

    pub fn selected_period(&self) -> Option<ChartPeriod> {
        self.lock_state().selected_period
    }

    pub fn live_price(&self, ticker: &str) -> Option<f64> {
        self.lock_state()
            .live_prices
            .get(&ticker.to_uppercase())
            .copied()
    }

    pub fn status(&self) -> FetchStatus {
        self.lock_state().status
    }

    pub fn error(&self) -> Option<String> {
        self.lock_state().error.clone()
    }

    pub fn clear_error(&self) {
        self.lock_state().error = None;
    }

    // ── Internal ────────────────────────────────────────────────────

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, crate::streaming::StreamingSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the selection wholesale and move the streaming subscription
    /// over to the new ticker.
    fn install_selection(&mut self, selection: SelectedStock) {
        let ticker = selection.summary.ticker.clone();
        {
            let mut state = self.lock_state();
            state.selected = Some(selection);
            state.status = FetchStatus::Succeeded;
            state.error = None;
        }

        if let Some(id) = self.selection_sub.take() {
            self.lock_session().unsubscribe(id);
        }
        let state = Arc::clone(&self.state);
        let callback_ticker = ticker.clone();
        let result = self.lock_session().subscribe(&ticker, move |price| {
            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            state.apply_tick(&callback_ticker, price);
        });
        match result {
            Ok(id) => self.selection_sub = Some(id),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "could not open price subscription");
                self.lock_state().error = Some(e.to_string());
            }
        }
    }
}

/// Convert a column-oriented candle payload into chart points, ascending
/// by date.
pub fn candles_to_points(series: &CandleSeries) -> Vec<ChartPoint> {
    series
        .timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date = DateTime::from_timestamp(ts, 0)?.date_naive();
            Some(ChartPoint {
                date,
                open: series.opens.get(i).copied()?,
                close: series.closes.get(i).copied()?,
                high: series.highs.get(i).copied(),
                low: series.lows.get(i).copied(),
            })
        })
        .collect()
}

// ── Search debouncing ───────────────────────────────────────────────

/// Generation-counted debounce guard for search input.
///
/// Each keystroke calls [`SearchDebouncer::begin`], which supersedes every
/// earlier generation. After waiting out the quiescence window, only the
/// newest generation is still current and allowed to dispatch; superseded
/// keystrokes fall out silently.
pub struct SearchDebouncer {
    generation: AtomicU64,
    delay: Duration,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            generation: AtomicU64::new(0),
            delay,
        }
    }

    /// Register a new keystroke and get its generation token.
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether this generation is still the newest.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Wait out the quiescence window; returns whether this generation
    /// survived it.
    pub async fn wait(&self, generation: u64) -> bool {
        tokio::time::sleep(self.delay).await;
        self.is_current(generation)
    }
}
