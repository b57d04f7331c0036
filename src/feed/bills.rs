//! Bill feed reducer.
//!
//! Bills are never removed: `CLOSED` flips the status and stamps `closedAt`.
//! `LINES_ADDED` and `LINES_REMOVED` only move `updatedAt`; the line contents
//! they carry are not merged into the view.
//!
//! A line or close event for a bill the list has never seen appends a partial
//! bill (table 0, zero total, no lines) instead of being dropped.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tableside_common::bills::BillOpened;
use tableside_common::{BillEvent, BillStatus, BillView};

use super::keyed::Patch;
use super::reducer::FeedReducer;

pub struct BillFeed;

impl FeedReducer for BillFeed {
    type Entity = BillView;
    type Event = BillEvent;

    const NAME: &'static str = "bills";

    fn patch(event: BillEvent) -> Patch<BillView> {
        match event {
            BillEvent::InitialData(bills) => Patch::Replace(bills),
            BillEvent::Opened(opened) => Patch::Insert(opened_bill(opened)),
            BillEvent::LinesAdded(change) | BillEvent::LinesRemoved(change) => {
                let updated_at = change.updated_at;
                let partial = partial_bill(change.bill_id.clone(), updated_at);
                Patch::upsert(
                    change.bill_id,
                    move |bill: &BillView| BillView {
                        updated_at,
                        ..bill.clone()
                    },
                    move || partial,
                )
            }
            BillEvent::Closed(closed) => {
                let closed_at = closed.closed_at;
                let partial = BillView {
                    status: BillStatus::Closed,
                    closed_at: Some(closed_at),
                    ..partial_bill(closed.bill_id.clone(), closed_at)
                };
                Patch::upsert(
                    closed.bill_id,
                    move |bill: &BillView| BillView {
                        status: BillStatus::Closed,
                        closed_at: Some(closed_at),
                        ..bill.clone()
                    },
                    move || partial,
                )
            }
        }
    }

    fn event_kind(event: &BillEvent) -> &'static str {
        event.kind()
    }

    fn event_id(event: &BillEvent) -> Option<&str> {
        event.bill_id()
    }
}

fn opened_bill(opened: BillOpened) -> BillView {
    BillView {
        id: opened.bill_id,
        table_number: opened.table_number.value,
        status: BillStatus::Open,
        user_id: opened.user_id,
        total_amount: Decimal::ZERO,
        bill_lines: Vec::new(),
        opened_at: opened.opened_at,
        closed_at: None,
        updated_at: opened.opened_at,
    }
}

fn partial_bill(id: String, at: DateTime<Utc>) -> BillView {
    BillView {
        id,
        table_number: 0,
        status: BillStatus::Open,
        user_id: None,
        total_amount: Decimal::ZERO,
        bill_lines: Vec::new(),
        opened_at: at,
        closed_at: None,
        updated_at: at,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tableside_common::BillLine;
    use tableside_common::bills::{BillClosed, BillLinesChanged, TableNumber};

    use super::*;
    use crate::feed::keyed::{Applied, KeyedList};
    use crate::feed::reducer::{reduce, replay};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 18, minute, 0).unwrap()
    }

    fn bill(id: &str, table: u32) -> BillView {
        BillView {
            id: id.to_string(),
            table_number: table,
            status: BillStatus::Open,
            user_id: Some("waiter-1".to_string()),
            total_amount: Decimal::new(1850, 2),
            bill_lines: vec![BillLine {
                name: "Espresso".to_string(),
                quantity: 2,
            }],
            opened_at: at(0),
            closed_at: None,
            updated_at: at(0),
        }
    }

    fn open(id: &str, table: u32, minute: u32) -> BillEvent {
        BillEvent::Opened(BillOpened {
            bill_id: id.to_string(),
            table_number: TableNumber { value: table },
            user_id: None,
            opened_at: at(minute),
        })
    }

    fn lines_added(id: &str, minute: u32) -> BillEvent {
        BillEvent::LinesAdded(BillLinesChanged {
            bill_id: id.to_string(),
            lines: vec![BillLine {
                name: "Tiramisu".to_string(),
                quantity: 1,
            }],
            updated_at: at(minute),
        })
    }

    fn close(id: &str, minute: u32) -> BillEvent {
        BillEvent::Closed(BillClosed {
            bill_id: id.to_string(),
            closed_at: at(minute),
        })
    }

    #[test]
    fn test_opened_appends_empty_open_bill() {
        let list = KeyedList::<BillView>::default();
        let (next, applied) = reduce::<BillFeed>(&list, open("B1", 5, 3));
        assert_eq!(applied, Applied::Appended);
        assert_eq!(next.len(), 1);

        let b1 = next.get("B1").unwrap();
        assert_eq!(b1.table_number, 5);
        assert_eq!(b1.status, BillStatus::Open);
        assert_eq!(b1.total_amount, Decimal::ZERO);
        assert!(b1.bill_lines.is_empty());
        assert_eq!(b1.opened_at, at(3));
        assert_eq!(b1.updated_at, at(3));
        assert!(b1.closed_at.is_none());
    }

    #[test]
    fn test_initial_data_replaces_list() {
        let list = replay::<BillFeed, _>([open("X", 1, 0), open("Y", 2, 0)]);
        let (next, _) = reduce::<BillFeed>(&list, BillEvent::InitialData(vec![bill("B1", 4)]));
        assert_eq!(next.to_vec(), vec![bill("B1", 4)]);
    }

    #[test]
    fn test_line_events_only_touch_updated_at() {
        let list = replay::<BillFeed, _>([BillEvent::InitialData(vec![bill("B1", 4)])]);
        let (added, applied) = reduce::<BillFeed>(&list, lines_added("B1", 10));
        assert_eq!(applied, Applied::Updated);

        let b1 = added.get("B1").unwrap();
        assert_eq!(b1.updated_at, at(10));
        assert_eq!(b1.bill_lines, bill("B1", 4).bill_lines);
        assert_eq!(b1.total_amount, Decimal::new(1850, 2));

        let removed = BillEvent::LinesRemoved(BillLinesChanged {
            bill_id: "B1".to_string(),
            lines: vec![],
            updated_at: at(12),
        });
        let (after_remove, _) = reduce::<BillFeed>(&added, removed);
        assert_eq!(after_remove.get("B1").unwrap().updated_at, at(12));
        assert_eq!(after_remove.get("B1").unwrap().bill_lines.len(), 1);
    }

    #[test]
    fn test_closed_keeps_bill_in_list() {
        let list = replay::<BillFeed, _>([open("B1", 5, 0), open("B2", 6, 1)]);
        let (next, _) = reduce::<BillFeed>(&list, close("B1", 45));
        assert_eq!(next.len(), 2);

        let b1 = next.get("B1").unwrap();
        assert_eq!(b1.status, BillStatus::Closed);
        assert_eq!(b1.closed_at, Some(at(45)));
        assert!(!b1.is_open());
        assert!(next.get("B2").unwrap().is_open());
    }

    #[test]
    fn test_lines_for_unknown_bill_append_partial_bill() {
        let list = replay::<BillFeed, _>([BillEvent::InitialData(vec![])]);
        let (next, applied) = reduce::<BillFeed>(&list, lines_added("ghost", 9));
        assert_eq!(applied, Applied::Appended);
        assert_eq!(next.len(), 1);

        let ghost = next.get("ghost").unwrap();
        assert_eq!(ghost.table_number, 0);
        assert_eq!(ghost.status, BillStatus::Open);
        assert_eq!(ghost.total_amount, Decimal::ZERO);
        assert!(ghost.bill_lines.is_empty());
        assert_eq!(ghost.opened_at, at(9));
        assert_eq!(ghost.updated_at, at(9));
    }

    #[test]
    fn test_close_for_unknown_bill_appends_closed_bill() {
        let list = replay::<BillFeed, _>([open("B1", 5, 0)]);
        let (next, applied) = reduce::<BillFeed>(&list, close("ghost", 30));
        assert_eq!(applied, Applied::Appended);
        assert_eq!(next.len(), 2);

        let ghost = next.get("ghost").unwrap();
        assert_eq!(ghost.status, BillStatus::Closed);
        assert_eq!(ghost.closed_at, Some(at(30)));
        assert_eq!(ghost.updated_at, at(30));
        assert!(next.get("B1").unwrap().is_open());
    }
}
