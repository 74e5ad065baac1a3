pub mod config;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod storage;
pub mod stores;
pub mod streaming;
pub mod valuation;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use config::DashboardConfig;
use errors::CoreError;
use gateway::feed::FinnhubFeed;
use gateway::finnhub::FinnhubGateway;
use gateway::traits::{MarketDataGateway, PriceFeed, PriceTick};
use models::chart::ChartPeriod;
use models::holding::Holding;
use models::metrics::{Allocation, PortfolioMetrics};
use models::stock::{SelectedStock, StockSummary};
use storage::blob::{BlobStore, MemoryBlobStore};
use stores::catalog::{FetchStatus, SearchDebouncer, StockCatalogStore};
use stores::portfolio::PortfolioStore;
use stores::watchlist::WatchlistStore;
use streaming::{SharedSession, StreamingSession};

/// Composition root for the dashboard core.
///
/// Owns the three stores, the shared streaming session, and the debounce
/// guard, and exposes the operations the UI layer dispatches. Price ticks
/// arrive on a channel from the feed; the host's event loop calls
/// [`Dashboard::pump_ticks`] to drain them into the stores.
///
/// Dropping the dashboard drops the feed handle, which shuts the feed's
/// connection task down.
#[must_use]
pub struct Dashboard {
    catalog: StockCatalogStore,
    watchlist: WatchlistStore,
    portfolio: PortfolioStore,
    session: SharedSession,
    debouncer: SearchDebouncer,
    ticks: Option<mpsc::UnboundedReceiver<PriceTick>>,
}

impl Dashboard {
    /// Connect to the live market data backend with in-memory persistence.
    pub fn connect(config: DashboardConfig) -> Self {
        Self::connect_with_storage(config, Arc::new(MemoryBlobStore::new()))
    }

    /// Connect to the live market data backend, persisting watchlist and
    /// portfolio through the given blob store.
    pub fn connect_with_storage(config: DashboardConfig, blob: Arc<dyn BlobStore>) -> Self {
        let gateway = Arc::new(
            FinnhubGateway::with_base_url(config.api_key.as_str(), config.rest_base_url.as_str())
                .quote_limit(config.search_quote_limit),
        );
        let (feed, ticks) = FinnhubFeed::connect(
            config.ws_url.as_str(),
            config.api_key.as_str(),
            config.reconnect_delay,
        );
        Self::build(gateway, Box::new(feed), Some(ticks), blob, &config)
    }

    /// Assemble a dashboard from explicit collaborators. This is the seam
    /// tests use to inject gateway/feed/storage doubles.
    pub fn with_components(
        gateway: Arc<dyn MarketDataGateway>,
        feed: Box<dyn PriceFeed>,
        ticks: Option<mpsc::UnboundedReceiver<PriceTick>>,
        blob: Arc<dyn BlobStore>,
        config: &DashboardConfig,
    ) -> Self {
        Self::build(gateway, feed, ticks, blob, config)
    }

    // ── Search ──────────────────────────────────────────────────────

    /// Search immediately, bypassing the debounce window.
    pub async fn search(&self, query: &str) {
        self.catalog.search(query).await;
    }

    /// Debounced search: waits out the quiescence window and dispatches
    /// only if no newer keystroke superseded this one. Returns whether the
    /// search was dispatched.
    pub async fn search_debounced(&self, query: &str) -> bool {
        let generation = self.debouncer.begin();
        if !self.debouncer.wait(generation).await {
            return false;
        }
        self.catalog.search(query).await;
        true
    }

    pub fn search_results(&self) -> Vec<StockSummary> {
        self.catalog.search_results()
    }

    pub fn clear_search_results(&self) {
        self.catalog.clear_search_results();
    }

    // ── Selection & charts ──────────────────────────────────────────

    pub async fn select_stock(&mut self, ticker: &str) {
        self.catalog.select_by_ticker(ticker).await;
    }

    pub fn select_stock_snapshot(&mut self, summary: StockSummary) {
        self.catalog.select_by_snapshot(summary);
    }

    pub fn deselect_stock(&mut self) {
        self.catalog.deselect();
    }

    pub async fn load_chart(&self, ticker: &str, period: ChartPeriod) {
        self.catalog.set_period(period);
        self.catalog.load_chart_period(ticker, period).await;
    }

    pub fn selected_stock(&self) -> Option<SelectedStock> {
        self.catalog.selected()
    }

    pub fn catalog_status(&self) -> FetchStatus {
        self.catalog.status()
    }

    pub fn catalog_error(&self) -> Option<String> {
        self.catalog.error()
    }

    pub fn live_price(&self, ticker: &str) -> Option<f64> {
        self.catalog.live_price(ticker)
    }

    // ── Watchlist ───────────────────────────────────────────────────

    pub fn add_to_watchlist(&mut self, stock: StockSummary) {
        self.watchlist.add(stock);
    }

    pub fn remove_from_watchlist(&mut self, ticker: &str) {
        self.watchlist.remove(ticker);
    }

    pub fn clear_watchlist(&mut self) {
        self.watchlist.clear();
    }

    pub fn watchlist(&self) -> &[StockSummary] {
        self.watchlist.stocks()
    }

    pub fn is_watched(&self, ticker: &str) -> bool {
        self.watchlist.contains(ticker)
    }

    // ── Portfolio ───────────────────────────────────────────────────

    pub fn add_holding(
        &mut self,
        stock: &StockSummary,
        shares: Option<f64>,
        purchase_price: Option<f64>,
    ) -> Result<(), CoreError> {
        self.portfolio.add_holding(stock, shares, purchase_price)
    }

    pub fn remove_holding(&mut self, ticker: &str) {
        self.portfolio.remove_holding(ticker);
    }

    pub fn set_shares(&mut self, ticker: &str, shares: f64) -> Result<(), CoreError> {
        self.portfolio.set_shares(ticker, shares)
    }

    pub fn clear_portfolio(&mut self) {
        self.portfolio.clear();
    }

    pub fn holdings(&self) -> Vec<Holding> {
        self.portfolio.holdings()
    }

    pub fn is_held(&self, ticker: &str) -> bool {
        self.portfolio.contains(ticker)
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Aggregate metrics for the current portfolio snapshot.
    pub fn portfolio_metrics(&self) -> PortfolioMetrics {
        self.portfolio.metrics()
    }

    /// Per-holding allocation percentages.
    pub fn allocations(&self) -> Vec<Allocation> {
        valuation::allocations(&self.portfolio.holdings())
    }

    /// Market value grouped by asset-type tag.
    pub fn distribution_by_type(&self) -> HashMap<String, f64> {
        valuation::distribution_by_type(&self.portfolio.holdings())
    }

    // ── Streaming ───────────────────────────────────────────────────

    /// Drain pending price ticks from the feed into the stores.
    ///
    /// Each tick is dispatched through the shared session, which delivers
    /// it only to tickers with live registrations — a tick racing a
    /// removal is dropped. Returns how many ticks were processed.
    pub fn pump_ticks(&mut self) -> usize {
        let Some(ticks) = self.ticks.as_mut() else {
            return 0;
        };

        let mut pending = Vec::new();
        while let Ok(tick) = ticks.try_recv() {
            pending.push(tick);
        }

        let count = pending.len();
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        for tick in pending {
            session.dispatch(&tick.ticker, tick.price);
        }
        count
    }

    /// The shared subscription table (for diagnostics and tests).
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    // ── Store access ────────────────────────────────────────────────

    pub fn catalog(&self) -> &StockCatalogStore {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut StockCatalogStore {
        &mut self.catalog
    }

    pub fn watchlist_store(&self) -> &WatchlistStore {
        &self.watchlist
    }

    pub fn portfolio_store(&self) -> &PortfolioStore {
        &self.portfolio
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(
        gateway: Arc<dyn MarketDataGateway>,
        feed: Box<dyn PriceFeed>,
        ticks: Option<mpsc::UnboundedReceiver<PriceTick>>,
        blob: Arc<dyn BlobStore>,
        config: &DashboardConfig,
    ) -> Self {
        let session = StreamingSession::new(feed).into_shared();
        let catalog = StockCatalogStore::new(gateway, Arc::clone(&session));

        let mut watchlist = WatchlistStore::new(Arc::clone(&blob));
        watchlist.load();

        let mut portfolio = PortfolioStore::new(Arc::clone(&session), blob);
        portfolio.load();

        Self {
            catalog,
            watchlist,
            portfolio,
            session,
            debouncer: SearchDebouncer::new(config.search_debounce),
            ticks,
        }
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("watchlist", &self.watchlist.len())
            .field("holdings", &self.portfolio.len())
            .field("selected", &self.catalog.selected_ticker())
            .finish()
    }
}
