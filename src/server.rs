//! Demo feed server.
//!
//! Serves the orders and bills feeds over WebSocket so the dashboards can be
//! run without the real backend. Every connecting client must pass a `token`
//! query parameter; it then receives the recorded script for its feed, one
//! frame per tick, followed by anything published live.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::session::FeedKind;

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

const MIN_REPLAY_INTERVAL: Duration = Duration::from_millis(1);

const LIVE_BUFFER: usize = 256;

/// Configuration for the demo feed server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// 0 picks a free port
    pub port: u16,
    pub orders_path: String,
    pub bills_path: String,
    /// Frames replayed to every orders client
    pub orders: Vec<String>,
    /// Frames replayed to every bills client
    pub bills: Vec<String>,
    /// Delay between replayed frames
    pub interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            orders_path: "/ws/orders".to_string(),
            bills_path: "/ws/bills".to_string(),
            orders: Vec::new(),
            bills: Vec::new(),
            interval: Duration::from_millis(500),
        }
    }
}

/// Shared state behind the router.
#[derive(Clone)]
pub struct FeedServerState {
    orders: Arc<[String]>,
    bills: Arc<[String]>,
    interval: Duration,
    orders_tx: broadcast::Sender<String>,
    bills_tx: broadcast::Sender<String>,
    /// Bumped to drop every open socket.
    kick_tx: Arc<watch::Sender<u64>>,
    shutdown: CancellationToken,
}

impl FeedServerState {
    pub fn new(config: &ServerConfig) -> Self {
        let (orders_tx, _) = broadcast::channel(LIVE_BUFFER);
        let (bills_tx, _) = broadcast::channel(LIVE_BUFFER);
        let (kick_tx, _) = watch::channel(0);
        Self {
            orders: config.orders.clone().into(),
            bills: config.bills.clone().into(),
            interval: config.interval,
            orders_tx,
            bills_tx,
            kick_tx: Arc::new(kick_tx),
            shutdown: CancellationToken::new(),
        }
    }

    fn script(&self, kind: FeedKind) -> Arc<[String]> {
        match kind {
            FeedKind::Orders => Arc::clone(&self.orders),
            FeedKind::Bills => Arc::clone(&self.bills),
        }
    }

    fn live(&self, kind: FeedKind) -> &broadcast::Sender<String> {
        match kind {
            FeedKind::Orders => &self.orders_tx,
            FeedKind::Bills => &self.bills_tx,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Build the router serving both feeds plus `/health`.
pub fn build_router(state: FeedServerState, orders_path: &str, bills_path: &str) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(orders_path, get(orders_ws))
        .route(bills_path, get(bills_ws))
        .with_state(state)
}

async fn orders_ws(
    State(state): State<FeedServerState>,
    Query(query): Query<TokenQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    accept(FeedKind::Orders, state, query, ws)
}

async fn bills_ws(
    State(state): State<FeedServerState>,
    Query(query): Query<TokenQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    accept(FeedKind::Bills, state, query, ws)
}

fn accept(
    kind: FeedKind,
    state: FeedServerState,
    query: TokenQuery,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if query.token.as_deref().is_none_or(str::is_empty) {
        warn!(feed = %kind, "Rejecting feed connection without token");
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, kind, state)),
        Err(rejection) => rejection.into_response(),
    }
}

struct SocketFeed {
    script: Arc<[String]>,
    interval: Duration,
    live: broadcast::Receiver<String>,
    kick: watch::Receiver<u64>,
    shutdown: CancellationToken,
}

async fn handle_socket(socket: WebSocket, kind: FeedKind, state: FeedServerState) {
    let (sender, receiver) = socket.split();
    let feed = SocketFeed {
        script: state.script(kind),
        interval: state.interval,
        live: state.live(kind).subscribe(),
        kick: state.kick_tx.subscribe(),
        shutdown: state.shutdown.clone(),
    };
    info!(feed = %kind, frames = feed.script.len(), "Feed client connected");
    run_socket_loop(sender, receiver, feed).await;
    info!(feed = %kind, "Feed client disconnected");
}

/// Per-client loop: scripted replay, live forwarding and ping/pong keepalive.
///
/// If no Pong is received within [`PONG_TIMEOUT`] after a Ping is sent, the
/// connection is considered dead and the loop exits.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    feed: SocketFeed,
) {
    let SocketFeed {
        script,
        interval,
        mut live,
        mut kick,
        shutdown,
    } = feed;

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately; consume it so the first real
    // ping fires after PING_INTERVAL has elapsed.
    ping_interval.tick().await;

    // First replay tick is immediate.
    let mut replay = tokio::time::interval(interval.max(MIN_REPLAY_INTERVAL));
    let mut next_frame = 0;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;
    kick.borrow_and_update();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = kick.changed() => {
                debug!("Dropping client on request");
                break;
            }

            _ = replay.tick(), if next_frame < script.len() => {
                let frame = script[next_frame].clone();
                if sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
                next_frame += 1;
            }

            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    break;
                }
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            result = live.recv() => {
                match result {
                    Ok(frame) => {
                        if sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Client lagged behind live frames");
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // Best-effort close frame
    let _ = sender.send(Message::Close(None)).await;
}

/// A running demo feed server.
pub struct FeedServer {
    local_addr: SocketAddr,
    state: FeedServerState,
    task: JoinHandle<Result<()>>,
}

impl FeedServer {
    /// Bind and start serving in the background.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let state = FeedServerState::new(&config);
        let app = build_router(state.clone(), &config.orders_path, &config.bills_path);

        let addr = format!("{}:{}", config.host, config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        let local_addr = listener.local_addr()?;

        let shutdown = state.shutdown.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .context("Server error")
        });

        info!(%local_addr, "Feed server listening");
        Ok(Self {
            local_addr,
            state,
            task,
        })
    }

    /// Base URL clients should use as `server.ws_url`.
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Clients currently connected to a feed.
    pub fn client_count(&self, kind: FeedKind) -> usize {
        self.state.live(kind).receiver_count()
    }

    /// Push a raw frame to every connected client of a feed.
    /// Returns how many clients it was queued for.
    pub fn publish(&self, kind: FeedKind, frame: impl Into<String>) -> usize {
        self.state.live(kind).send(frame.into()).unwrap_or(0)
    }

    /// Serialize and push an event to every connected client of a feed.
    pub fn publish_event<E: Serialize>(&self, kind: FeedKind, event: &E) -> Result<usize> {
        let frame = serde_json::to_string(event).context("Failed to serialize feed event")?;
        Ok(self.publish(kind, frame))
    }

    /// Close every open socket; clients are free to reconnect.
    pub fn drop_connections(&self) {
        self.state.kick_tx.send_modify(|generation| *generation += 1);
    }

    /// Stop accepting, close every socket and wait for the server to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.state.shutdown.cancel();
        self.task.await.context("Feed server task panicked")?
    }
}

/// Resolve when Ctrl+C is received.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let config = ServerConfig::default();
        build_router(
            FeedServerState::new(&config),
            &config.orders_path,
            &config.bills_path,
        )
    }

    #[tokio::test]
    async fn test_health() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_feed_requires_token() {
        for uri in ["/ws/orders", "/ws/bills", "/ws/orders?token="] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let resp = test_router().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_plain_request_with_token_is_not_upgraded() {
        let req = Request::builder()
            .uri("/ws/orders?token=abc")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let req = Request::builder()
            .uri("/ws/tables?token=abc")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_publish_and_shutdown() {
        let server = FeedServer::bind(ServerConfig {
            port: 0,
            ..ServerConfig::default()
        })
        .await
        .unwrap();
        assert!(server.ws_url().starts_with("ws://127.0.0.1:"));
        assert_eq!(server.client_count(FeedKind::Orders), 0);
        assert_eq!(server.publish(FeedKind::Orders, "{}"), 0);
        server.shutdown().await.unwrap();
    }
}
