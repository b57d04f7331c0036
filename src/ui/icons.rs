//! Shared UI icons.

use console::Emoji;

// Connection indicators
pub static LIVE: Emoji<'_, '_> = Emoji("🟢 ", "[LIVE]");
pub static LOADING: Emoji<'_, '_> = Emoji("⏳ ", "[...]");
pub static LOST: Emoji<'_, '_> = Emoji("🔴 ", "[LOST]");
pub static SIGNED_OUT: Emoji<'_, '_> = Emoji("🔒 ", "[OUT]");

// Order indicators
pub static DELIVERY: Emoji<'_, '_> = Emoji("🛵 ", "[D]");
pub static PICK_UP: Emoji<'_, '_> = Emoji("🛍️  ", "[P]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");

// Bill indicators
pub static TABLE: Emoji<'_, '_> = Emoji("🍽️  ", "#");
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
