//! Order feed reducer.
//!
//! | Event                                         | Effect                                   |
//! |-----------------------------------------------|------------------------------------------|
//! | `INITIAL_DATA`                                | replace the list                         |
//! | `DELIVERY_ORDER_PLACED`/`PICK_UP_ORDER_PLACED`| insert as `PLACED`                       |
//! | `APPROVED_BY_FRONT_DESK`                      | status                                   |
//! | `APPROVED_BY_KITCHEN`                         | status + preparation estimate            |
//! | `CANCELLED`/`COMPLETED`                       | remove                                   |
//! | `DELIVERY_STARTED`                            | status                                   |
//! | `LINES_CHANGED`                               | estimate, when the event carries one     |
//! | `MARKED_AS_READY`                             | status from the event, else `UNKNOWN`    |
//!
//! Update events for an id that is not in the list are no-ops.

use tableside_common::orders::{DeliveryOrderPlaced, PickUpOrderPlaced};
use tableside_common::{OrderEvent, OrderStatus, OrderView};

use super::keyed::Patch;
use super::reducer::FeedReducer;

pub struct OrderFeed;

impl FeedReducer for OrderFeed {
    type Entity = OrderView;
    type Event = OrderEvent;

    const NAME: &'static str = "orders";

    fn patch(event: OrderEvent) -> Patch<OrderView> {
        match event {
            OrderEvent::InitialData(orders) => Patch::Replace(orders),
            OrderEvent::DeliveryOrderPlaced(placed) => Patch::Insert(delivery_order(placed)),
            OrderEvent::PickUpOrderPlaced(placed) => Patch::Insert(pick_up_order(placed)),
            OrderEvent::ApprovedByFrontDesk(target) => {
                set_status(target.order_id, OrderStatus::ApprovedByFrontDesk)
            }
            OrderEvent::ApprovedByKitchen(estimate) => {
                let minutes = estimate.estimated_preparation_time_minutes;
                Patch::update(estimate.order_id, move |order: &OrderView| OrderView {
                    status: OrderStatus::ApprovedByKitchen,
                    estimated_preparation_time_minutes: minutes,
                    ..order.clone()
                })
            }
            OrderEvent::Cancelled(target) | OrderEvent::Completed(target) => {
                Patch::Remove(target.order_id)
            }
            OrderEvent::DeliveryStarted(target) => {
                set_status(target.order_id, OrderStatus::DeliveryStarted)
            }
            OrderEvent::LinesChanged(estimate) => {
                let minutes = estimate.estimated_preparation_time_minutes;
                Patch::update(estimate.order_id, move |order: &OrderView| OrderView {
                    estimated_preparation_time_minutes: minutes
                        .or(order.estimated_preparation_time_minutes),
                    ..order.clone()
                })
            }
            OrderEvent::MarkedAsReady(ready) => set_status(
                ready.order_id,
                ready.status.unwrap_or(OrderStatus::Unknown),
            ),
        }
    }

    fn event_kind(event: &OrderEvent) -> &'static str {
        event.kind()
    }

    fn event_id(event: &OrderEvent) -> Option<&str> {
        event.order_id()
    }
}

fn set_status(order_id: String, status: OrderStatus) -> Patch<OrderView> {
    Patch::update(order_id, move |order: &OrderView| OrderView {
        status,
        ..order.clone()
    })
}

fn delivery_order(placed: DeliveryOrderPlaced) -> OrderView {
    OrderView {
        id: placed.order_id,
        status: OrderStatus::Placed,
        customer_info: placed.customer_info,
        address: Some(placed.address),
        delivery_mode: placed.delivery_mode,
        scheduled_for: placed.scheduled_for,
        order_lines: placed.order_lines,
        estimated_preparation_time_minutes: None,
    }
}

fn pick_up_order(placed: PickUpOrderPlaced) -> OrderView {
    OrderView {
        id: placed.order_id,
        status: OrderStatus::Placed,
        customer_info: placed.customer_info,
        address: None,
        delivery_mode: placed.delivery_mode,
        scheduled_for: placed.scheduled_for,
        order_lines: placed.order_lines,
        estimated_preparation_time_minutes: None,
    }
}
