//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled          |
//! |-----------------|---------------------------|
//! | `dashboard`     | `Kitchen`, `Waiter`       |
//! | `replay`        | `Replay`                  |
//! | `serve`         | `Serve`                   |
//! | `config`        | `Config`                  |

pub mod config;
pub mod dashboard;
pub mod replay;
pub mod serve;

pub use config::cmd_config;
pub use dashboard::{cmd_kitchen, cmd_waiter};
pub use replay::cmd_replay;
pub use serve::cmd_serve;
