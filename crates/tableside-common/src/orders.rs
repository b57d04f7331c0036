use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifecycle status of a remote (delivery or pick-up) order.
///
/// The backend owns the status set. Strings this client does not recognise
/// decode to [`OrderStatus::Unknown`] instead of failing the whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    PendingApproval,
    Placed,
    ApprovedByFrontDesk,
    ApprovedByKitchen,
    Approved,
    Confirmed,
    ReadyForPickup,
    ReadyForDriver,
    DeliveryStarted,
    InDelivery,
    Completed,
    Cancelled,
    Unknown,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Placed => "PLACED",
            Self::ApprovedByFrontDesk => "APPROVED_BY_FRONT_DESK",
            Self::ApprovedByKitchen => "APPROVED_BY_KITCHEN",
            Self::Approved => "APPROVED",
            Self::Confirmed => "CONFIRMED",
            Self::ReadyForPickup => "READY_FOR_PICKUP",
            Self::ReadyForDriver => "READY_FOR_DRIVER",
            Self::DeliveryStarted => "DELIVERY_STARTED",
            Self::InDelivery => "IN_DELIVERY",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_APPROVAL" => Ok(Self::PendingApproval),
            "PLACED" => Ok(Self::Placed),
            "APPROVED_BY_FRONT_DESK" => Ok(Self::ApprovedByFrontDesk),
            "APPROVED_BY_KITCHEN" => Ok(Self::ApprovedByKitchen),
            "APPROVED" => Ok(Self::Approved),
            "CONFIRMED" => Ok(Self::Confirmed),
            "READY_FOR_PICKUP" => Ok(Self::ReadyForPickup),
            "READY_FOR_DRIVER" => Ok(Self::ReadyForDriver),
            "DELIVERY_STARTED" => Ok(Self::DeliveryStarted),
            "IN_DELIVERY" => Ok(Self::InDelivery),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(format!("Invalid order status: {}", s)),
        }
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(Self::Unknown))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMode {
    /// Fulfil as soon as possible.
    #[default]
    Asap,
    /// Fulfil at `scheduledFor`.
    Scheduled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl CustomerInfo {
    /// "First Last", falling back to whichever half is known.
    pub fn display_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(name), None) | (None, Some(name)) => Some(name.clone()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub house_number: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub name: String,
    pub quantity: u32,
}

/// One row of the live order list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub customer_info: CustomerInfo,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub delivery_mode: DeliveryMode,
    #[serde(default)]
    pub scheduled_for: Option<String>,
    #[serde(default)]
    pub order_lines: Vec<OrderLine>,
    #[serde(default)]
    pub estimated_preparation_time_minutes: Option<u32>,
}

impl OrderView {
    pub fn is_delivery(&self) -> bool {
        self.address.is_some()
    }

    pub fn item_count(&self) -> u32 {
        self.order_lines.iter().map(|line| line.quantity).sum()
    }
}

// ── Wire events ──────────────────────────────────────────────────────

/// Payload of the events that only name the order they apply to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOrderPlaced {
    pub order_id: String,
    #[serde(default)]
    pub customer_info: CustomerInfo,
    pub address: Address,
    #[serde(default)]
    pub delivery_mode: DeliveryMode,
    #[serde(default)]
    pub scheduled_for: Option<String>,
    #[serde(default)]
    pub order_lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickUpOrderPlaced {
    pub order_id: String,
    #[serde(default)]
    pub customer_info: CustomerInfo,
    #[serde(default)]
    pub delivery_mode: DeliveryMode,
    #[serde(default)]
    pub scheduled_for: Option<String>,
    #[serde(default)]
    pub order_lines: Vec<OrderLine>,
}

/// Payload of `APPROVED_BY_KITCHEN` and `LINES_CHANGED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparationEstimate {
    pub order_id: String,
    #[serde(default)]
    pub estimated_preparation_time_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedAsReady {
    pub order_id: String,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// Events pushed on the order feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    InitialData(Vec<OrderView>),
    DeliveryOrderPlaced(DeliveryOrderPlaced),
    PickUpOrderPlaced(PickUpOrderPlaced),
    ApprovedByFrontDesk(OrderRef),
    ApprovedByKitchen(PreparationEstimate),
    Cancelled(OrderRef),
    Completed(OrderRef),
    DeliveryStarted(OrderRef),
    LinesChanged(PreparationEstimate),
    MarkedAsReady(MarkedAsReady),
}

impl OrderEvent {
    /// Wire name of the event, as carried in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitialData(_) => "INITIAL_DATA",
            Self::DeliveryOrderPlaced(_) => "DELIVERY_ORDER_PLACED",
            Self::PickUpOrderPlaced(_) => "PICK_UP_ORDER_PLACED",
            Self::ApprovedByFrontDesk(_) => "APPROVED_BY_FRONT_DESK",
            Self::ApprovedByKitchen(_) => "APPROVED_BY_KITCHEN",
            Self::Cancelled(_) => "CANCELLED",
            Self::Completed(_) => "COMPLETED",
            Self::DeliveryStarted(_) => "DELIVERY_STARTED",
            Self::LinesChanged(_) => "LINES_CHANGED",
            Self::MarkedAsReady(_) => "MARKED_AS_READY",
        }
    }

    /// The order this event targets; `None` for snapshots.
    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::InitialData(_) => None,
            Self::DeliveryOrderPlaced(e) => Some(&e.order_id),
            Self::PickUpOrderPlaced(e) => Some(&e.order_id),
            Self::ApprovedByFrontDesk(e)
            | Self::Cancelled(e)
            | Self::Completed(e)
            | Self::DeliveryStarted(e) => Some(&e.order_id),
            Self::ApprovedByKitchen(e) | Self::LinesChanged(e) => Some(&e.order_id),
            Self::MarkedAsReady(e) => Some(&e.order_id),
        }
    }
}
