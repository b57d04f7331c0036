//! Read-only derivations over a feed's current list.
//!
//! Nothing here mutates or caches; dashboards recompute on every snapshot.

use rust_decimal::Decimal;
use tableside_common::{BillStatus, BillView, OrderStatus, OrderView};

use super::keyed::KeyedList;

/// Statuses the kitchen acts on by default.
pub const DEFAULT_KITCHEN_STATUSES: &[OrderStatus] = &[
    OrderStatus::ApprovedByFrontDesk,
    OrderStatus::ApprovedByKitchen,
    OrderStatus::Approved,
    OrderStatus::Confirmed,
];

const FRONT_DESK_STATUSES: &[OrderStatus] = &[OrderStatus::PendingApproval, OrderStatus::Placed];

const READY_STATUSES: &[OrderStatus] = &[OrderStatus::ReadyForPickup, OrderStatus::ReadyForDriver];

const DELIVERY_STATUSES: &[OrderStatus] =
    &[OrderStatus::DeliveryStarted, OrderStatus::InDelivery];

fn orders_in<'a>(orders: &'a KeyedList<OrderView>, statuses: &[OrderStatus]) -> Vec<&'a OrderView> {
    orders
        .iter()
        .filter(|order| statuses.contains(&order.status))
        .collect()
}

/// Orders awaiting kitchen action, per the given allow-list.
pub fn kitchen_orders<'a>(
    orders: &'a KeyedList<OrderView>,
    statuses: &[OrderStatus],
) -> Vec<&'a OrderView> {
    orders_in(orders, statuses)
}

/// Orders the front desk still has to approve.
pub fn front_desk_orders(orders: &KeyedList<OrderView>) -> Vec<&OrderView> {
    orders_in(orders, FRONT_DESK_STATUSES)
}

/// Orders waiting for a customer or a driver.
pub fn ready_orders(orders: &KeyedList<OrderView>) -> Vec<&OrderView> {
    orders_in(orders, READY_STATUSES)
}

pub fn delivery_orders(orders: &KeyedList<OrderView>) -> Vec<&OrderView> {
    orders_in(orders, DELIVERY_STATUSES)
}

pub fn open_bills(bills: &KeyedList<BillView>) -> Vec<&BillView> {
    bills.iter().filter(|bill| bill.status == BillStatus::Open).collect()
}

pub fn closed_bills(bills: &KeyedList<BillView>) -> Vec<&BillView> {
    bills
        .iter()
        .filter(|bill| bill.status == BillStatus::Closed)
        .collect()
}

pub fn bills_for_table(bills: &KeyedList<BillView>, table_number: u32) -> Vec<&BillView> {
    bills
        .iter()
        .filter(|bill| bill.table_number == table_number)
        .collect()
}

/// Sum of `totalAmount` over open bills.
pub fn open_bills_total(bills: &KeyedList<BillView>) -> Decimal {
    bills_total(&open_bills(bills))
}

pub fn bills_total(bills: &[&BillView]) -> Decimal {
    bills.iter().map(|bill| bill.total_amount).sum()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tableside_common::DeliveryMode;
    use tableside_common::orders::CustomerInfo;

    use super::*;

    fn order(id: &str, status: OrderStatus) -> OrderView {
        OrderView {
            id: id.to_string(),
            status,
            customer_info: CustomerInfo::default(),
            address: None,
            delivery_mode: DeliveryMode::Asap,
            scheduled_for: None,
            order_lines: vec![],
            estimated_preparation_time_minutes: None,
        }
    }

    fn bill(id: &str, table: u32, status: BillStatus, cents: i64) -> BillView {
        let opened = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        BillView {
            id: id.to_string(),
            table_number: table,
            status,
            user_id: None,
            total_amount: Decimal::new(cents, 2),
            bill_lines: vec![],
            opened_at: opened,
            closed_at: None,
            updated_at: opened,
        }
    }

    fn ids<T: crate::feed::keyed::Keyed>(items: &[&T]) -> Vec<String> {
        items.iter().map(|item| item.key().to_string()).collect()
    }

    #[test]
    fn test_order_views_partition_by_status() {
        let orders = KeyedList::from_snapshot(vec![
            order("placed", OrderStatus::Placed),
            order("desk", OrderStatus::ApprovedByFrontDesk),
            order("cooking", OrderStatus::ApprovedByKitchen),
            order("pickup", OrderStatus::ReadyForPickup),
            order("driving", OrderStatus::InDelivery),
            order("odd", OrderStatus::Unknown),
        ]);

        assert_eq!(
            ids(&kitchen_orders(&orders, DEFAULT_KITCHEN_STATUSES)),
            vec!["desk", "cooking"]
        );
        assert_eq!(ids(&front_desk_orders(&orders)), vec!["placed"]);
        assert_eq!(ids(&ready_orders(&orders)), vec!["pickup"]);
        assert_eq!(ids(&delivery_orders(&orders)), vec!["driving"]);
    }

    #[test]
    fn test_kitchen_allow_list_is_configurable() {
        let orders = KeyedList::from_snapshot(vec![
            order("a", OrderStatus::Confirmed),
            order("b", OrderStatus::ReadyForDriver),
        ]);
        let only_ready = [OrderStatus::ReadyForDriver];
        assert_eq!(ids(&kitchen_orders(&orders, &only_ready)), vec!["b"]);
    }

    #[test]
    fn test_bill_views() {
        let bills = KeyedList::from_snapshot(vec![
            bill("B1", 1, BillStatus::Open, 1000),
            bill("B2", 2, BillStatus::Closed, 5000),
            bill("B3", 1, BillStatus::Open, 250),
        ]);
        assert_eq!(ids(&open_bills(&bills)), vec!["B1", "B3"]);
        assert_eq!(ids(&closed_bills(&bills)), vec!["B2"]);
        assert_eq!(ids(&bills_for_table(&bills, 1)), vec!["B1", "B3"]);
        assert_eq!(open_bills_total(&bills), Decimal::new(1250, 2));
    }

    #[test]
    fn test_views_of_empty_lists() {
        let orders = KeyedList::<OrderView>::default();
        let bills = KeyedList::<BillView>::default();
        assert!(kitchen_orders(&orders, DEFAULT_KITCHEN_STATUSES).is_empty());
        assert!(open_bills(&bills).is_empty());
        assert_eq!(open_bills_total(&bills), Decimal::ZERO);
    }
}
