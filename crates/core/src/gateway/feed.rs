use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::traits::{PriceFeed, PriceTick};
use crate::errors::CoreError;

/// Commands sent from the feed handle to the connection task.
enum FeedCommand {
    Subscribe(String),
    Unsubscribe(String),
    Shutdown,
}

/// Finnhub websocket price feed.
///
/// The handle talks to a background task over a command channel; the task
/// owns the socket, parses trade messages into [`PriceTick`]s, and pushes
/// them out on the tick channel returned by [`FinnhubFeed::connect`].
///
/// If the connection drops, the task waits `reconnect_delay` and reconnects,
/// then resubscribes every active ticker. Subscriptions made while offline
/// are queued into the active set and sent on the next connect.
pub struct FinnhubFeed {
    commands: mpsc::UnboundedSender<FeedCommand>,
}

impl FinnhubFeed {
    /// Spawn the connection task and return the feed handle plus the
    /// receiving end of the tick stream.
    pub fn connect(
        ws_url: impl Into<String>,
        api_key: impl Into<String>,
        reconnect_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PriceTick>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        let url = format!("{}?token={}", ws_url.into(), api_key.into());
        tokio::spawn(run_connection(url, reconnect_delay, cmd_rx, tick_tx));

        (Self { commands: cmd_tx }, tick_rx)
    }

    /// Tell the connection task to close the socket and exit.
    pub fn shutdown(&self) {
        let _ = self.commands.send(FeedCommand::Shutdown);
    }
}

impl PriceFeed for FinnhubFeed {
    fn subscribe(&mut self, ticker: &str) -> Result<(), CoreError> {
        self.commands
            .send(FeedCommand::Subscribe(ticker.to_uppercase()))
            .map_err(|_| CoreError::Feed("feed connection task is gone".into()))
    }

    fn unsubscribe(&mut self, ticker: &str) -> Result<(), CoreError> {
        self.commands
            .send(FeedCommand::Unsubscribe(ticker.to_uppercase()))
            .map_err(|_| CoreError::Feed("feed connection task is gone".into()))
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct FeedMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Vec<TradeEvent>,
}

#[derive(Deserialize)]
struct TradeEvent {
    /// Symbol
    s: String,
    /// Last price
    p: f64,
}

fn subscribe_message(ticker: &str) -> String {
    json!({ "type": "subscribe", "symbol": ticker }).to_string()
}

fn unsubscribe_message(ticker: &str) -> String {
    json!({ "type": "unsubscribe", "symbol": ticker }).to_string()
}

/// Parse a feed frame into price ticks. Non-trade frames (pings, acks)
/// yield nothing.
fn parse_ticks(text: &str) -> Vec<PriceTick> {
    match serde_json::from_str::<FeedMessage>(text) {
        Ok(msg) if msg.kind == "trade" => msg
            .data
            .into_iter()
            .map(|t| PriceTick {
                ticker: t.s.to_uppercase(),
                price: t.p,
            })
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "ignoring unparseable feed frame");
            Vec::new()
        }
    }
}

/// The connection task: owns the socket for its whole lifetime, reconnects
/// on drop, and keeps the active subscription set so a fresh connection can
/// be brought back to the same state.
async fn run_connection(
    url: String,
    reconnect_delay: Duration,
    mut commands: mpsc::UnboundedReceiver<FeedCommand>,
    ticks: mpsc::UnboundedSender<PriceTick>,
) {
    let mut active: HashSet<String> = HashSet::new();

    'reconnect: loop {
        let stream = match connect_async(url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                warn!(error = %e, "feed connect failed, retrying");
                // Keep draining commands while offline so the active set
                // stays current for the next attempt.
                if drain_while_offline(&mut commands, &mut active, reconnect_delay).await {
                    return;
                }
                continue 'reconnect;
            }
        };

        info!(tickers = active.len(), "price feed connected");
        let (mut write, mut read) = stream.split();

        for ticker in &active {
            if write
                .send(Message::Text(subscribe_message(ticker)))
                .await
                .is_err()
            {
                warn!("feed dropped during resubscribe");
                tokio::time::sleep(reconnect_delay).await;
                continue 'reconnect;
            }
        }

        loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        for tick in parse_ticks(&text) {
                            if ticks.send(tick).is_err() {
                                // Nobody is listening anymore.
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = write.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        warn!("price feed disconnected, reconnecting");
                        tokio::time::sleep(reconnect_delay).await;
                        continue 'reconnect;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "price feed error, reconnecting");
                        tokio::time::sleep(reconnect_delay).await;
                        continue 'reconnect;
                    }
                    Some(Ok(_)) => {}
                },
                cmd = commands.recv() => match cmd {
                    Some(FeedCommand::Subscribe(ticker)) => {
                        if active.insert(ticker.clone()) {
                            let _ = write.send(Message::Text(subscribe_message(&ticker))).await;
                        }
                    }
                    Some(FeedCommand::Unsubscribe(ticker)) => {
                        if active.remove(&ticker) {
                            let _ = write.send(Message::Text(unsubscribe_message(&ticker))).await;
                        }
                    }
                    Some(FeedCommand::Shutdown) | None => {
                        let _ = write.close().await;
                        return;
                    }
                },
            }
        }
    }
}

/// While disconnected, apply subscription commands to the active set and
/// wait out the reconnect delay. Returns true if the task should exit.
async fn drain_while_offline(
    commands: &mut mpsc::UnboundedReceiver<FeedCommand>,
    active: &mut HashSet<String>,
    reconnect_delay: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + reconnect_delay;
    loop {
        match tokio::time::timeout_at(deadline, commands.recv()).await {
            Ok(Some(FeedCommand::Subscribe(ticker))) => {
                active.insert(ticker);
            }
            Ok(Some(FeedCommand::Unsubscribe(ticker))) => {
                active.remove(&ticker);
            }
            Ok(Some(FeedCommand::Shutdown)) | Ok(None) => return true,
            Err(_) => return false, // delay elapsed
        }
    }
}
