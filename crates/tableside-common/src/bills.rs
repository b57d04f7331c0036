use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Open,
    Closed,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLine {
    pub name: String,
    pub quantity: u32,
}

/// One row of the live bill list: an in-house running tab for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillView {
    pub id: String,
    pub table_number: u32,
    pub status: BillStatus,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub bill_lines: Vec<BillLine>,
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl BillView {
    pub fn is_open(&self) -> bool {
        self.status == BillStatus::Open
    }
}

// ── Wire events ──────────────────────────────────────────────────────

/// Table numbers arrive wrapped in a value object on `OPENED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNumber {
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillOpened {
    pub bill_id: String,
    pub table_number: TableNumber,
    #[serde(default)]
    pub user_id: Option<String>,
    pub opened_at: DateTime<Utc>,
}

/// Payload of `LINES_ADDED` and `LINES_REMOVED`.
///
/// `lines` is decoded so it can be inspected and logged, but the bill
/// reducer does not merge it into the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillLinesChanged {
    pub bill_id: String,
    #[serde(default)]
    pub lines: Vec<BillLine>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillClosed {
    pub bill_id: String,
    pub closed_at: DateTime<Utc>,
}

/// Events pushed on the bill feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillEvent {
    InitialData(Vec<BillView>),
    Opened(BillOpened),
    LinesAdded(BillLinesChanged),
    LinesRemoved(BillLinesChanged),
    Closed(BillClosed),
}

impl BillEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitialData(_) => "INITIAL_DATA",
            Self::Opened(_) => "OPENED",
            Self::LinesAdded(_) => "LINES_ADDED",
            Self::LinesRemoved(_) => "LINES_REMOVED",
            Self::Closed(_) => "CLOSED",
        }
    }

    pub fn bill_id(&self) -> Option<&str> {
        match self {
            Self::InitialData(_) => None,
            Self::Opened(e) => Some(&e.bill_id),
            Self::LinesAdded(e) | Self::LinesRemoved(e) => Some(&e.bill_id),
            Self::Closed(e) => Some(&e.bill_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opened_unwraps_table_number() {
        let json = r#"{
            "type": "OPENED",
            "data": {"billId": "B1", "tableNumber": {"value": 5}, "openedAt": "2024-05-01T18:00:00Z"}
        }"#;
        let event: BillEvent = serde_json::from_str(json).unwrap();
        match event {
            BillEvent::Opened(opened) => {
                assert_eq!(opened.bill_id, "B1");
                assert_eq!(opened.table_number.value, 5);
                assert!(opened.user_id.is_none());
            }
            other => panic!("Expected Opened, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_initial_data_amounts() {
        let json = r#"{"type":"INITIAL_DATA","data":[{
            "id": "B1",
            "tableNumber": 3,
            "status": "OPEN",
            "userId": "waiter-7",
            "totalAmount": 42.50,
            "billLines": [{"name": "Cola", "quantity": 3}],
            "openedAt": "2024-05-01T18:00:00Z",
            "closedAt": null,
            "updatedAt": "2024-05-01T18:20:00Z"
        }]}"#;
        let event: BillEvent = serde_json::from_str(json).unwrap();
        let BillEvent::InitialData(bills) = event else {
            panic!("Expected InitialData");
        };
        assert_eq!(bills[0].total_amount, Decimal::new(4250, 2));
        assert_eq!(bills[0].table_number, 3);
        assert!(bills[0].is_open());
        assert_eq!(bills[0].user_id.as_deref(), Some("waiter-7"));
    }

    #[test]
    fn test_lines_added_and_removed_share_payload() {
        let added = r#"{"type":"LINES_ADDED","data":{"billId":"B1","updatedAt":"2024-05-01T18:05:00Z"}}"#;
        let removed = r#"{"type":"LINES_REMOVED","data":{"billId":"B1","lines":[{"name":"Cola","quantity":1}],"updatedAt":"2024-05-01T18:06:00Z"}}"#;
        let added: BillEvent = serde_json::from_str(added).unwrap();
        let removed: BillEvent = serde_json::from_str(removed).unwrap();
        assert_eq!(added.kind(), "LINES_ADDED");
        assert_eq!(removed.kind(), "LINES_REMOVED");
        assert_eq!(added.bill_id(), Some("B1"));
        if let BillEvent::LinesRemoved(change) = removed {
            assert_eq!(change.lines.len(), 1);
        } else {
            panic!("Expected LinesRemoved");
        }
    }

    #[test]
    fn test_closed_requires_timestamp() {
        let json = r#"{"type":"CLOSED","data":{"billId":"B1"}}"#;
        assert!(serde_json::from_str::<BillEvent>(json).is_err());
    }
}
