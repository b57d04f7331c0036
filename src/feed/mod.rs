//! Live order and bill feeds.
//!
//! ## Module Map
//!
//! ```text
//!  Session::watch_feed_url ──> connection.rs (ConnectionManager)
//!                                   │ raw text frames (mpsc)
//!                                   v
//!                              sync.rs (FeedSynchronizer)
//!                                   │ decoder.rs: frame -> OrderEvent / BillEvent
//!                                   │ orders.rs / bills.rs: event -> Patch
//!                                   │ keyed.rs: KeyedList::apply(patch)
//!                                   v
//!                              watch::Receiver<FeedSnapshot>
//!                                   │
//!                                   v
//!                              views.rs (kitchen_orders, open_bills, ...)
//! ```
//!
//! Each feed runs two tasks: the connection manager owns the socket, the
//! synchronizer owns the list and is its only writer.

pub mod bills;
pub mod connection;
pub mod decoder;
pub mod keyed;
pub mod orders;
pub mod reducer;
pub mod sync;
pub mod views;

pub use bills::BillFeed;
pub use connection::{ConnectionOptions, ConnectionState, ReconnectPolicy};
pub use keyed::{Keyed, KeyedList, Patch};
pub use orders::OrderFeed;
pub use reducer::FeedReducer;
pub use sync::{DashboardStatus, FeedHandle, FeedSnapshot, FeedSynchronizer, spawn_feed};
