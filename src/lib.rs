//! Live order and bill feeds for restaurant dashboards.
//!
//! | Module     | Role                                                   |
//! |------------|--------------------------------------------------------|
//! | `session`  | token-carrying feed URLs, sign-in/out, expiry          |
//! | `feed`     | socket lifecycle, frame decoding, reducers, views      |
//! | `config`   | `tableside.toml` + env + CLI layering                  |
//! | `logging`  | tracing subscriber setup                               |
//! | `server`   | demo WebSocket feed server                             |
//! | `ui`       | kitchen and waiter dashboard rendering                 |

pub mod config;
pub mod errors;
pub mod feed;
pub mod logging;
pub mod server;
pub mod session;
pub mod ui;

pub use errors::{FeedError, SessionError};
pub use session::{FeedKind, Session, SessionToken};
