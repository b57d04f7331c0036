//! WebSocket connection manager for one live feed.
//!
//! Follows a `watch` of the feed URL: `None` keeps the feed idle
//! (`UNINSTANTIATED`), a new URL (re)connects. Any close the caller did not
//! ask for triggers a reconnect, with a fixed interval and a fixed attempt
//! budget that resets after each successful open. Once the budget is spent
//! the feed stays `CLOSED` until the URL changes or the feed is cancelled.

use std::fmt;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::FeedError;
use crate::session::redact_token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
    /// No URL yet (signed out); nothing has been dialled.
    Uninstantiated,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
            Self::Uninstantiated => "UNINSTANTIATED",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-interval reconnect with a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub reconnect: ReconnectPolicy,
    /// Upper bound for TCP connect plus WebSocket handshake.
    pub connect_timeout: Duration,
    /// Frames buffered between the socket and the synchronizer.
    pub frame_buffer: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(5),
            frame_buffer: 256,
        }
    }
}

/// Consumer side of a spawned [`ConnectionManager`].
pub struct FeedConnection {
    pub state: watch::Receiver<ConnectionState>,
    pub frames: mpsc::Receiver<String>,
    pub task: JoinHandle<()>,
}

/// How one connected (or attempted) session ended.
#[derive(Debug)]
enum SessionEnd {
    Cancelled,
    UrlChanged,
    /// The frame receiver was dropped; nobody is listening any more.
    ReceiverGone,
    Dropped { was_open: bool, error: FeedError },
}

pub struct ConnectionManager {
    label: &'static str,
    url_rx: watch::Receiver<Option<Url>>,
    options: ConnectionOptions,
    state_tx: watch::Sender<ConnectionState>,
    frame_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl ConnectionManager {
    pub fn new(
        label: &'static str,
        url_rx: watch::Receiver<Option<Url>>,
        options: ConnectionOptions,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<ConnectionState>, mpsc::Receiver<String>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Uninstantiated);
        let (frame_tx, frame_rx) = mpsc::channel(options.frame_buffer.max(1));
        let manager = Self {
            label,
            url_rx,
            options,
            state_tx,
            frame_tx,
            cancel,
        };
        (manager, state_rx, frame_rx)
    }

    /// Spawn the manager on the current runtime.
    pub fn spawn(
        label: &'static str,
        url_rx: watch::Receiver<Option<Url>>,
        options: ConnectionOptions,
        cancel: CancellationToken,
    ) -> FeedConnection {
        let (manager, state, frames) = Self::new(label, url_rx, options, cancel);
        let task = tokio::spawn(manager.run());
        FeedConnection {
            state,
            frames,
            task,
        }
    }

    /// Drive the connection until cancelled or until the frame receiver is dropped.
    pub async fn run(mut self) {
        // Reconnect attempts since the last successful open.
        let mut attempts: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let url = self.url_rx.borrow_and_update().clone();
            let Some(url) = url else {
                self.set_state(ConnectionState::Uninstantiated);
                attempts = 0;
                if !self.wait_for_url_change().await {
                    break;
                }
                continue;
            };

            self.set_state(ConnectionState::Connecting);
            match self.connect_and_pump(&url).await {
                SessionEnd::Cancelled | SessionEnd::ReceiverGone => break,
                SessionEnd::UrlChanged => {
                    debug!(feed = self.label, "Feed URL changed, reconnecting");
                    attempts = 0;
                }
                SessionEnd::Dropped { was_open, error } => {
                    self.set_state(ConnectionState::Closed);
                    if was_open {
                        attempts = 0;
                    }
                    if attempts >= self.options.reconnect.max_attempts {
                        warn!(
                            feed = self.label,
                            error = %error,
                            max_attempts = self.options.reconnect.max_attempts,
                            "Reconnect budget exhausted; waiting for a new feed URL"
                        );
                        if !self.wait_for_url_change().await {
                            break;
                        }
                        attempts = 0;
                        continue;
                    }
                    attempts += 1;
                    warn!(
                        feed = self.label,
                        error = %error,
                        attempt = attempts,
                        max_attempts = self.options.reconnect.max_attempts,
                        "Feed disconnected, reconnecting in {:?}",
                        self.options.reconnect.interval
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        Ok(()) = self.url_rx.changed() => {
                            attempts = 0;
                        }
                        _ = tokio::time::sleep(self.options.reconnect.interval) => {}
                    }
                }
            }
        }

        self.set_state(ConnectionState::Closed);
        debug!(feed = self.label, "Connection manager stopped");
    }

    /// Returns `false` when cancelled first.
    async fn wait_for_url_change(&mut self) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            changed = self.url_rx.changed() => match changed {
                Ok(()) => true,
                Err(_) => {
                    // The URL can never change again.
                    self.cancel.cancelled().await;
                    false
                }
            }
        }
    }

    async fn connect_and_pump(&mut self, url: &Url) -> SessionEnd {
        let shown = redact_token(url);
        info!(feed = self.label, url = %shown, "Connecting to feed");

        let timeout = self.options.connect_timeout;
        let connect = tokio::time::timeout(timeout, connect_async(url.as_str()));
        let ws_stream = tokio::select! {
            _ = self.cancel.cancelled() => return SessionEnd::Cancelled,
            Ok(()) = self.url_rx.changed() => return SessionEnd::UrlChanged,
            result = connect => match result {
                Ok(Ok((ws_stream, response))) => {
                    debug!(
                        feed = self.label,
                        status = ?response.status(),
                        "Handshake complete"
                    );
                    ws_stream
                }
                Ok(Err(e)) => {
                    return SessionEnd::Dropped {
                        was_open: false,
                        error: FeedError::WebSocket(e),
                    };
                }
                Err(_) => {
                    return SessionEnd::Dropped {
                        was_open: false,
                        error: FeedError::ConnectTimeout {
                            url: shown,
                            timeout_ms: timeout.as_millis() as u64,
                        },
                    };
                }
            }
        };

        let (mut write, mut read) = ws_stream.split();
        self.set_state(ConnectionState::Open);
        info!(feed = self.label, "Feed connected");

        let end = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break SessionEnd::Cancelled,
                Ok(()) = self.url_rx.changed() => break SessionEnd::UrlChanged,
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        // A full buffer must not hide cancellation or a URL change.
                        tokio::select! {
                            _ = self.cancel.cancelled() => break SessionEnd::Cancelled,
                            Ok(()) = self.url_rx.changed() => break SessionEnd::UrlChanged,
                            sent = self.frame_tx.send(text.as_str().to_owned()) => {
                                if sent.is_err() {
                                    break SessionEnd::ReceiverGone;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(feed = self.label, bytes = data.len(), "Ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            return SessionEnd::Dropped {
                                was_open: true,
                                error: e.into(),
                            };
                        }
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        info!(feed = self.label, frame = ?frame, "Server closed the feed");
                        return SessionEnd::Dropped {
                            was_open: true,
                            error: FeedError::ConnectionClosed,
                        };
                    }
                    Some(Err(e)) => {
                        return SessionEnd::Dropped {
                            was_open: true,
                            error: e.into(),
                        };
                    }
                    None => {
                        return SessionEnd::Dropped {
                            was_open: true,
                            error: FeedError::ConnectionClosed,
                        };
                    }
                }
            }
        };

        // Caller-initiated close.
        self.set_state(ConnectionState::Closing);
        let _ = write.send(Message::Close(None)).await;
        let _ = write.close().await;
        end
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            debug!(feed = self.label, state = %next, "Connection state changed");
        }
    }
}
