use serde::de::DeserializeOwned;

use crate::errors::FeedError;

/// Decode one text frame into a feed's event union.
///
/// `feed` only labels the error. Callers log and drop failures; a bad frame
/// never tears the feed down.
pub fn decode_frame<E: DeserializeOwned>(feed: &'static str, text: &str) -> Result<E, FeedError> {
    serde_json::from_str(text).map_err(|source| FeedError::Decode { feed, source })
}

/// Short prefix of a frame for log lines.
pub fn frame_excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Split a recorded frame file into frames: one JSON frame per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn split_frames(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableside_common::{BillEvent, OrderEvent};

    #[test]
    fn test_decode_order_frame() {
        let event: OrderEvent = decode_frame(
            "orders",
            r#"{"type":"APPROVED_BY_FRONT_DESK","data":{"orderId":"A"}}"#,
        )
        .unwrap();
        assert_eq!(event.order_id(), Some("A"));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode_frame::<OrderEvent>("orders", "not json").unwrap_err();
        assert!(matches!(err, FeedError::Decode { feed: "orders", .. }));
    }

    #[test]
    fn test_decode_rejects_wrong_feed_payload() {
        // An order event is not a bill event.
        let frame = r#"{"type":"DELIVERY_STARTED","data":{"orderId":"A"}}"#;
        assert!(decode_frame::<BillEvent>("bills", frame).is_err());
    }

    #[test]
    fn test_split_frames_skips_comments_and_blanks() {
        let content = "# recorded 2024-05-01\n{\"a\":1}\n\n   \n  {\"b\":2}  \n";
        let frames: Vec<&str> = split_frames(content).collect();
        assert_eq!(frames, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn test_frame_excerpt() {
        assert_eq!(frame_excerpt("short", 10), "short");
        assert_eq!(frame_excerpt("a longer frame", 8), "a longer...");
        assert_eq!(frame_excerpt("héllo wörld", 5), "héllo...");
    }
}
