//! Explicit session context for the live feeds.
//!
//! A [`Session`] owns the WebSocket base URL, the feed paths and the current
//! bearer token. Feeds never read the token from ambient state: they receive a
//! `watch::Receiver<Option<Url>>` from [`Session::watch_feed_url`] that yields
//! `None` while signed out and a `?token=`-carrying URL while signed in.
//! Browser-style socket clients cannot set an `Authorization` header, so the
//! backend expects the token in the query string.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::SessionError;

const TOKEN_PARAM: &str = "token";

/// Bearer token plus its expiry, when the issuer told us one.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Orders,
    Bills,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Bills => "bills",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved, token-less feed URLs.
#[derive(Debug, Clone)]
struct FeedEndpoints {
    orders: Url,
    bills: Url,
}

impl FeedEndpoints {
    fn get(&self, kind: FeedKind) -> &Url {
        match kind {
            FeedKind::Orders => &self.orders,
            FeedKind::Bills => &self.bills,
        }
    }
}

struct SessionInner {
    endpoints: FeedEndpoints,
    token_tx: watch::Sender<Option<SessionToken>>,
}

/// Cheaply cloneable handle; clones share the token.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Resolve the feed endpoints against `ws_url`. Starts signed out.
    pub fn new(ws_url: &str, orders_path: &str, bills_path: &str) -> Result<Self, SessionError> {
        let base = Url::parse(ws_url).map_err(|source| SessionError::InvalidBaseUrl {
            url: ws_url.to_string(),
            source,
        })?;
        if !matches!(base.scheme(), "ws" | "wss") {
            return Err(SessionError::UnsupportedScheme(base.scheme().to_string()));
        }
        let join = |path: &str| {
            base.join(path).map_err(|source| SessionError::InvalidFeedPath {
                path: path.to_string(),
                source,
            })
        };
        let endpoints = FeedEndpoints {
            orders: join(orders_path)?,
            bills: join(bills_path)?,
        };
        let (token_tx, _) = watch::channel(None);
        Ok(Self {
            inner: Arc::new(SessionInner {
                endpoints,
                token_tx,
            }),
        })
    }

    pub fn sign_in(&self, token: SessionToken) {
        debug!(expires_at = ?token.expires_at(), "Session signed in");
        self.inner.token_tx.send_replace(Some(token));
    }

    pub fn sign_out(&self) {
        if self.inner.token_tx.send_replace(None).is_some() {
            info!("Session signed out");
        }
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.inner.token_tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.token_tx.borrow().is_some()
    }

    /// Feed URL for the current token, `None` while signed out.
    pub fn feed_url(&self, kind: FeedKind) -> Option<Url> {
        let token = self.inner.token_tx.borrow();
        token
            .as_ref()
            .map(|token| with_token(self.inner.endpoints.get(kind), token))
    }

    /// Follow the session's token as a stream of feed URLs.
    ///
    /// Must be called inside a Tokio runtime. The forwarding task ends when
    /// the returned receiver and all its clones are dropped.
    pub fn watch_feed_url(&self, kind: FeedKind) -> watch::Receiver<Option<Url>> {
        let (url_tx, url_rx) = watch::channel(self.feed_url(kind));
        let mut token_rx = self.inner.token_tx.subscribe();
        let endpoint = self.inner.endpoints.get(kind).clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = url_tx.closed() => break,
                    changed = token_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = token_rx
                            .borrow_and_update()
                            .as_ref()
                            .map(|token| with_token(&endpoint, token));
                        url_tx.send_if_modified(|current| {
                            if *current == next {
                                false
                            } else {
                                *current = next;
                                true
                            }
                        });
                    }
                }
            }
        });

        url_rx
    }

    /// Sign the session out when its token expires.
    ///
    /// Tokens without an expiry are left alone. Signing in again with a new
    /// token re-arms the timer.
    pub fn spawn_expiry_watch(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let mut token_rx = self.inner.token_tx.subscribe();
        let session = self.clone();

        tokio::spawn(async move {
            loop {
                let expires_at = token_rx
                    .borrow_and_update()
                    .as_ref()
                    .and_then(SessionToken::expires_at);

                let Some(expires_at) = expires_at else {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        changed = token_rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                    continue;
                };

                let wait = (expires_at - Utc::now()).to_std().unwrap_or_default();
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = token_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(wait) => {
                        let expired = session.inner.token_tx.send_if_modified(|token| {
                            if token.as_ref().and_then(|t| t.expires_at) == Some(expires_at) {
                                *token = None;
                                true
                            } else {
                                false
                            }
                        });
                        if expired {
                            warn!(%expires_at, "Session token expired; feeds will disconnect");
                        }
                    }
                }
            }
        })
    }
}

fn with_token(endpoint: &Url, token: &SessionToken) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut().append_pair(TOKEN_PARAM, token.value());
    url
}

/// Render a URL for logs with the token query value masked.
pub fn redact_token(url: &Url) -> String {
    if !url.query_pairs().any(|(key, _)| key == TOKEN_PARAM) {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == TOKEN_PARAM {
                "redacted".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();
    let mut shown = url.clone();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}
