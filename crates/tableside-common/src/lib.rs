//! Shared domain types for the tableside live feeds.
//!
//! The backend pushes one JSON object per WebSocket text frame, shaped as
//! `{ "type": "<EVENT>", "data": { ... } }`. This crate holds the entity
//! views the dashboards render and the event unions those frames decode into:
//!
//! | Module   | Entity      | Event union  |
//! |----------|-------------|--------------|
//! | `orders` | `OrderView` | `OrderEvent` |
//! | `bills`  | `BillView`  | `BillEvent`  |

pub mod bills;
pub mod orders;

pub use bills::{BillEvent, BillLine, BillStatus, BillView};
pub use orders::{DeliveryMode, OrderEvent, OrderLine, OrderStatus, OrderView};
