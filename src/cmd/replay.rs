//! Offline replay of recorded frame files (`tableside replay`).

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tableside::config::TablesideConfig;
use tableside::feed::decoder::split_frames;
use tableside::feed::views::{
    closed_bills, delivery_orders, front_desk_orders, kitchen_orders, open_bills, ready_orders,
};
use tableside::feed::{
    BillFeed, ConnectionState, FeedReducer, FeedSnapshot, FeedSynchronizer, OrderFeed,
};
use tableside_common::{BillView, OrderView};

use super::super::{FeedArg, ReplayView};

/// Read a frame file: one JSON frame per line.
pub fn read_frames(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read frame file: {}", path.display()))?;
    Ok(split_frames(&content).map(str::to_string).collect())
}

fn replay_frames<R: FeedReducer>(frames: &[String]) -> FeedSnapshot<R::Entity> {
    let mut sync = FeedSynchronizer::<R>::new();
    for frame in frames {
        sync.handle_frame(frame);
    }
    sync.snapshot(ConnectionState::Closed)
}

fn print_list<T: Serialize>(items: &[&T]) -> Result<()> {
    let json = serde_json::to_string_pretty(items).context("Failed to serialize list")?;
    println!("{}", json);
    Ok(())
}

pub fn cmd_replay(
    config: &TablesideConfig,
    feed: FeedArg,
    file: &Path,
    view: ReplayView,
    table: Option<u32>,
) -> Result<()> {
    let frames = read_frames(file)?;

    match feed {
        FeedArg::Orders => {
            if table.is_some() {
                bail!("--table only applies to the bills feed");
            }
            let snapshot = replay_frames::<OrderFeed>(&frames);
            let orders = &snapshot.entities;
            let selected: Vec<&OrderView> = match view {
                ReplayView::All => orders.iter().collect(),
                ReplayView::Kitchen => kitchen_orders(orders, &config.kitchen_statuses()),
                ReplayView::FrontDesk => front_desk_orders(orders),
                ReplayView::Ready => ready_orders(orders),
                ReplayView::Delivery => delivery_orders(orders),
                ReplayView::Open | ReplayView::Closed => {
                    bail!("view '{}' does not apply to the orders feed", view)
                }
            };
            print_list(&selected)?;
            eprintln!(
                "{} frame(s): {} applied, {} dropped, {} order(s)",
                frames.len(),
                snapshot.applied,
                snapshot.dropped,
                orders.len()
            );
        }
        FeedArg::Bills => {
            let snapshot = replay_frames::<BillFeed>(&frames);
            let bills = &snapshot.entities;
            let mut selected: Vec<&BillView> = match view {
                ReplayView::All => bills.iter().collect(),
                ReplayView::Open => open_bills(bills),
                ReplayView::Closed => closed_bills(bills),
                ReplayView::Kitchen
                | ReplayView::FrontDesk
                | ReplayView::Ready
                | ReplayView::Delivery => {
                    bail!("view '{}' does not apply to the bills feed", view)
                }
            };
            if let Some(number) = table {
                selected.retain(|bill| bill.table_number == number);
            }
            print_list(&selected)?;
            eprintln!(
                "{} frame(s): {} applied, {} dropped, {} bill(s)",
                frames.len(),
                snapshot.applied,
                snapshot.dropped,
                bills.len()
            );
        }
    }

    Ok(())
}
