//! Model Module Tests
//!
//! ## Test Scopes
//! - **Serializable**: JSON encoding of serde payloads and failure reporting.
//! - **Record**: Payload replacement through the `Entity` view.

#[cfg(test)]
mod tests {
    use crate::error::StoreError;
    use crate::model::{Entity, Record, Serializable};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
    struct Counter {
        name: String,
        hits: u64,
    }

    // ============================================================
    // SERIALIZABLE
    // ============================================================

    #[test]
    fn test_serde_payload_encodes_as_json() {
        let counter = Counter {
            name: "home".to_string(),
            hits: 3,
        };

        let bytes = counter.encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["name"], "home");
        assert_eq!(value["hits"], 3);
    }

    #[test]
    fn test_decode_garbage_is_encoding_error() {
        let result = Counter::decode(b"not json");

        assert!(matches!(result, Err(StoreError::Encoding(_))));
    }

    // ============================================================
    // RECORD
    // ============================================================

    #[test]
    fn test_record_exposes_key_kind_and_collection() {
        let record = Record::new("session", "alice", Counter::default());

        assert_eq!(record.key(), "alice");
        assert_eq!(record.kind(), "session");
        assert_eq!(record.collection().unwrap(), "Sessions");
    }

    #[test]
    fn test_decode_payload_replaces_content() {
        let record: Arc<dyn Entity> = Record::shared("counter", "c1", Counter::default());

        record
            .decode_payload(br#"{"name":"fresh","hits":42}"#)
            .unwrap();

        assert_eq!(record.encode_payload().unwrap(), br#"{"name":"fresh","hits":42}"#);
    }

    #[test]
    fn test_failed_decode_leaves_payload_untouched() {
        let record = Record::shared(
            "counter",
            "c1",
            Counter {
                name: "kept".to_string(),
                hits: 1,
            },
        );

        let result = Entity::decode_payload(&*record, b"{broken");

        assert!(result.is_err());
        assert_eq!(record.payload().name, "kept");
        assert_eq!(record.payload().hits, 1);
    }

    #[test]
    fn test_update_mutates_in_place() {
        let record = Record::new("counter", "c1", Counter::default());

        let hits = record.update(|c| {
            c.hits += 5;
            c.hits
        });

        assert_eq!(hits, 5);
        assert_eq!(record.snapshot().hits, 5);
    }
}
