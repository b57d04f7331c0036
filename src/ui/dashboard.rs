//! Kitchen and waiter dashboards.
//!
//! Rendering is pure: each `render_*` function turns a snapshot into text,
//! and [`Dashboard`] decides how that text reaches the terminal. Two modes:
//! - `full`: clear the screen and redraw on every snapshot
//! - `json`: one JSON object per snapshot, for piping

use std::io;

use console::{Term, style};
use serde_json::json;
use tableside_common::{BillView, DeliveryMode, OrderStatus, OrderView};

use crate::feed::views::{
    bills_for_table, bills_total, front_desk_orders, kitchen_orders, ready_orders,
};
use crate::feed::{DashboardStatus, FeedSnapshot};
use crate::ui::icons::{
    CLOCK, DELIVERY, LIVE, LOADING, LOST, PICK_UP, SIGNED_OUT, TABLE, WARNING,
};

/// Output mode for the dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Redraw the whole screen
    #[default]
    Full,
    /// JSON lines
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Full,
        })
    }
}

pub fn status_badge(status: DashboardStatus) -> String {
    match status {
        DashboardStatus::Live => format!("{}{}", LIVE, style("live").green().bold()),
        DashboardStatus::Loading => format!("{}{}", LOADING, style("connecting").yellow()),
        DashboardStatus::ConnectionLost => {
            format!("{}{}", LOST, style("connection lost").red().bold())
        }
        DashboardStatus::SignedOut => format!("{}{}", SIGNED_OUT, style("signed out").dim()),
    }
}

fn status_name(status: DashboardStatus) -> &'static str {
    match status {
        DashboardStatus::Live => "live",
        DashboardStatus::Loading => "loading",
        DashboardStatus::ConnectionLost => "connection_lost",
        DashboardStatus::SignedOut => "signed_out",
    }
}

fn header<T>(title: &str, snapshot: &FeedSnapshot<T>) -> String {
    let mut out = format!(
        "{}  {}\n",
        style(title).bold().underlined(),
        status_badge(snapshot.status())
    );
    if snapshot.dropped > 0 {
        out.push_str(&format!(
            "{}{} malformed frame(s) dropped\n",
            WARNING,
            style(snapshot.dropped).yellow()
        ));
    }
    out.push('\n');
    out
}

fn order_row(order: &OrderView) -> String {
    let kind = if order.is_delivery() { DELIVERY } else { PICK_UP };
    let customer = order
        .customer_info
        .display_name()
        .unwrap_or_else(|| "-".to_string());
    let mut row = format!(
        "  {}{}  {}  {}",
        kind,
        style(&order.id).cyan().bold(),
        style(order.status).dim(),
        customer
    );
    if order.delivery_mode == DeliveryMode::Scheduled {
        if let Some(at) = &order.scheduled_for {
            row.push_str(&format!("  {}{}", CLOCK, at));
        }
    }
    if let Some(minutes) = order.estimated_preparation_time_minutes {
        row.push_str(&format!("  ~{} min", minutes));
    }
    row.push('\n');
    for line in &order.order_lines {
        row.push_str(&format!("      {}x {}\n", line.quantity, line.name));
    }
    row
}

fn order_section(out: &mut String, title: &str, orders: &[&OrderView]) {
    out.push_str(&format!("{} ({})\n", style(title).bold(), orders.len()));
    if orders.is_empty() {
        out.push_str(&format!("  {}\n", style("nothing here").dim()));
    }
    for order in orders {
        out.push_str(&order_row(order));
    }
    out.push('\n');
}

/// Kitchen view: orders to cook, plus what is waiting at the pass.
pub fn render_kitchen(snapshot: &FeedSnapshot<OrderView>, statuses: &[OrderStatus]) -> String {
    let mut out = header("Kitchen", snapshot);
    let orders = &snapshot.entities;
    order_section(&mut out, "To prepare", &kitchen_orders(orders, statuses));
    order_section(&mut out, "Ready", &ready_orders(orders));
    out.push_str(&format!(
        "{}\n",
        style(format!(
            "{} awaiting front desk · {} orders total",
            front_desk_orders(orders).len(),
            orders.len()
        ))
        .dim()
    ));
    out
}

fn bill_row(bill: &BillView) -> String {
    let items: u32 = bill.bill_lines.iter().map(|line| line.quantity).sum();
    format!(
        "  {}{:<4} {:>10}  {} item(s)  {}  updated {}\n",
        TABLE,
        bill.table_number,
        style(bill.total_amount.round_dp(2)).bold(),
        items,
        style(&bill.id).dim(),
        bill.updated_at.format("%H:%M")
    )
}

/// Bills visible to the waiter, split into (open, closed).
fn waiter_bills(
    snapshot: &FeedSnapshot<BillView>,
    table: Option<u32>,
) -> (Vec<&BillView>, Vec<&BillView>) {
    let bills = &snapshot.entities;
    let visible: Vec<&BillView> = match table {
        Some(number) => bills_for_table(bills, number),
        None => bills.iter().collect(),
    };
    visible.into_iter().partition(|bill| bill.is_open())
}

/// Waiter view: open tabs, optionally for one table only.
pub fn render_waiter(snapshot: &FeedSnapshot<BillView>, table: Option<u32>) -> String {
    let mut out = header("Waiter", snapshot);
    let (open, closed) = waiter_bills(snapshot, table);
    out.push_str(&format!("{} ({})\n", style("Open bills").bold(), open.len()));
    if open.is_empty() {
        out.push_str(&format!("  {}\n", style("no open tabs").dim()));
    }
    for bill in &open {
        out.push_str(&bill_row(bill));
    }

    out.push_str(&format!(
        "\n{} {}   {}\n",
        style("Open total:").bold(),
        style(bills_total(&open).round_dp(2)).green().bold(),
        style(format!("{} closed", closed.len())).dim()
    ));
    out
}

pub fn kitchen_json(
    snapshot: &FeedSnapshot<OrderView>,
    statuses: &[OrderStatus],
) -> serde_json::Value {
    json!({
        "status": status_name(snapshot.status()),
        "applied": snapshot.applied,
        "dropped": snapshot.dropped,
        "kitchen": kitchen_orders(&snapshot.entities, statuses),
        "ready": ready_orders(&snapshot.entities),
    })
}

pub fn waiter_json(snapshot: &FeedSnapshot<BillView>, table: Option<u32>) -> serde_json::Value {
    let (open, _) = waiter_bills(snapshot, table);
    json!({
        "status": status_name(snapshot.status()),
        "applied": snapshot.applied,
        "dropped": snapshot.dropped,
        "table": table,
        "openTotal": bills_total(&open),
        "open": open,
    })
}

/// Terminal sink for rendered dashboards.
pub struct Dashboard {
    term: Term,
    mode: UiMode,
}

impl Dashboard {
    pub fn new(mode: UiMode) -> Self {
        Self {
            term: Term::stdout(),
            mode,
        }
    }

    /// Show one frame of output: `text` in full mode, `value` in json mode.
    pub fn draw(&self, text: &str, value: &serde_json::Value) -> io::Result<()> {
        match self.mode {
            UiMode::Full => {
                if self.term.is_term() {
                    self.term.clear_screen()?;
                }
                self.term.write_str(text)?;
                self.term.flush()
            }
            UiMode::Json => self.term.write_line(&value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use tableside_common::orders::CustomerInfo;
    use tableside_common::{BillStatus, OrderLine};

    use super::*;
    use crate::feed::ConnectionState;
    use crate::feed::keyed::KeyedList;
    use crate::feed::views::DEFAULT_KITCHEN_STATUSES;

    fn order(id: &str, status: OrderStatus) -> OrderView {
        OrderView {
            id: id.to_string(),
            status,
            customer_info: CustomerInfo {
                first_name: Some("Ada".into()),
                last_name: Some("Lovelace".into()),
                phone: None,
            },
            address: None,
            delivery_mode: DeliveryMode::Asap,
            scheduled_for: None,
            order_lines: vec![OrderLine {
                name: "Margherita".into(),
                quantity: 2,
            }],
            estimated_preparation_time_minutes: Some(15),
        }
    }

    fn bill(id: &str, table: u32, status: BillStatus, cents: i64) -> BillView {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 19, 30, 0).unwrap();
        BillView {
            id: id.to_string(),
            table_number: table,
            status,
            user_id: None,
            total_amount: Decimal::new(cents, 2),
            bill_lines: vec![],
            opened_at: at,
            closed_at: None,
            updated_at: at,
        }
    }

    fn plain(text: &str) -> String {
        console::strip_ansi_codes(text).into_owned()
    }

    #[test]
    fn test_ui_mode_from_str() {
        assert_eq!("json".parse::<UiMode>().unwrap(), UiMode::Json);
        assert_eq!("JSON".parse::<UiMode>().unwrap(), UiMode::Json);
        assert_eq!("whatever".parse::<UiMode>().unwrap(), UiMode::Full);
    }

    #[test]
    fn test_render_kitchen_lists_only_allowed_statuses() {
        let snapshot = FeedSnapshot {
            entities: KeyedList::from_snapshot(vec![
                order("cook-me", OrderStatus::ApprovedByKitchen),
                order("pending", OrderStatus::Placed),
                order("done", OrderStatus::ReadyForPickup),
            ]),
            connection: ConnectionState::Open,
            applied: 3,
            dropped: 0,
        };
        let text = plain(&render_kitchen(&snapshot, DEFAULT_KITCHEN_STATUSES));
        assert!(text.contains("To prepare (1)"));
        assert!(text.contains("cook-me"));
        assert!(text.contains("2x Margherita"));
        assert!(text.contains("~15 min"));
        assert!(text.contains("Ready (1)"));
        assert!(text.contains("1 awaiting front desk"));
        assert!(!text.contains("malformed"));
    }

    #[test]
    fn test_render_kitchen_reports_dropped_frames() {
        let snapshot = FeedSnapshot::<OrderView> {
            dropped: 2,
            connection: ConnectionState::Closed,
            ..FeedSnapshot::default()
        };
        let text = plain(&render_kitchen(&snapshot, DEFAULT_KITCHEN_STATUSES));
        assert!(text.contains("2 malformed frame(s) dropped"));
        assert!(text.contains("connection lost"));
        assert!(text.contains("nothing here"));
    }

    #[test]
    fn test_render_waiter_totals_open_bills() {
        let snapshot = FeedSnapshot {
            entities: KeyedList::from_snapshot(vec![
                bill("b1", 4, BillStatus::Open, 1250),
                bill("b2", 7, BillStatus::Open, 800),
                bill("b3", 4, BillStatus::Closed, 9900),
            ]),
            connection: ConnectionState::Open,
            applied: 1,
            dropped: 0,
        };
        let text = plain(&render_waiter(&snapshot, None));
        assert!(text.contains("Open bills (2)"));
        assert!(text.contains("20.50"));
        assert!(text.contains("1 closed"));

        let table_four = plain(&render_waiter(&snapshot, Some(4)));
        assert!(table_four.contains("Open bills (1)"));
        assert!(table_four.contains("b1"));
        assert!(!table_four.contains("b2"));
    }

    #[test]
    fn test_table_filter_applies_to_totals() {
        let snapshot = FeedSnapshot {
            entities: KeyedList::from_snapshot(vec![
                bill("b1", 4, BillStatus::Open, 1250),
                bill("b2", 7, BillStatus::Open, 800),
                bill("b3", 7, BillStatus::Closed, 9900),
            ]),
            connection: ConnectionState::Open,
            applied: 1,
            dropped: 0,
        };
        let text = plain(&render_waiter(&snapshot, Some(4)));
        assert!(text.contains("Open total: 12.50"));
        assert!(!text.contains("20.50"));
        assert!(text.contains("0 closed"));

        let value = waiter_json(&snapshot, Some(4));
        assert_eq!(value["table"], 4);
        assert_eq!(value["openTotal"], "12.50");
        assert_eq!(value["open"].as_array().unwrap().len(), 1);
        assert_eq!(value["open"][0]["id"], "b1");

        let all = waiter_json(&snapshot, None);
        assert_eq!(all["openTotal"], "20.50");
        assert!(all["table"].is_null());
    }

    #[test]
    fn test_json_views() {
        let snapshot = FeedSnapshot {
            entities: KeyedList::from_snapshot(vec![bill("b1", 4, BillStatus::Open, 1250)]),
            connection: ConnectionState::Connecting,
            applied: 1,
            dropped: 0,
        };
        let value = waiter_json(&snapshot, None);
        assert_eq!(value["status"], "loading");
        assert_eq!(value["open"][0]["tableNumber"], 4);
        assert_eq!(value["openTotal"], "12.50");

        let orders = FeedSnapshot::<OrderView>::default();
        assert_eq!(kitchen_json(&orders, DEFAULT_KITCHEN_STATUSES)["status"], "signed_out");
    }
}
