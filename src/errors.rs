//! Typed error hierarchy for tableside.
//!
//! - `FeedError`: socket, decode and channel failures inside a live feed
//! - `SessionError`: building feed URLs from the session context

use thiserror::Error;

/// Errors raised while running a live feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Timed out connecting to {url} after {timeout_ms}ms")]
    ConnectTimeout { url: String, timeout_ms: u64 },

    #[error("Failed to decode {feed} frame: {source}")]
    Decode {
        feed: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Connection closed by server")]
    ConnectionClosed,
}

/// Errors from the session context.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid WebSocket base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme '{0}' (expected ws or wss)")]
    UnsupportedScheme(String),

    #[error("Invalid feed path '{path}': {source}")]
    InvalidFeedPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_the_feed() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = FeedError::Decode {
            feed: "orders",
            source,
        };
        assert!(err.to_string().starts_with("Failed to decode orders frame"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn connect_timeout_carries_url_and_budget() {
        let err = FeedError::ConnectTimeout {
            url: "ws://kitchen.local/ws/orders".to_string(),
            timeout_ms: 5000,
        };
        match &err {
            FeedError::ConnectTimeout { url, timeout_ms } => {
                assert_eq!(url, "ws://kitchen.local/ws/orders");
                assert_eq!(*timeout_ms, 5000);
            }
            _ => panic!("Expected ConnectTimeout"),
        }
        assert!(err.to_string().contains("5000ms"));
    }

    #[test]
    fn unsupported_scheme_is_matchable() {
        let err = SessionError::UnsupportedScheme("http".into());
        assert!(matches!(err, SessionError::UnsupportedScheme(ref s) if s == "http"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&FeedError::ConnectionClosed);
        assert_std_error(&SessionError::UnsupportedScheme("ftp".into()));
    }
}
