//! Response envelope for applied updates
//!
//! The client expects its changed records twice: once inside a single
//! `inventory-event` hydra event, with timestamps rendered as text, and once
//! under `response.current_items` with native timestamps.

use crate::document::Record;
use chrono::NaiveDateTime;
use invemu_value::Value;
use rand::Rng;

/// Reported client build
pub const CLIENT_VERSION: &str = "0.308";

/// Reported client platform
pub const CLIENT_PLATFORM: &str = "win64";

/// Hydra event type carrying inventory changes
pub const INVENTORY_EVENT: &str = "inventory-event";

/// Success message in `metadata.msg`
pub const SUCCESS_MSG: &str = "ONLINE_RESULT_SUCCESS";

/// Text rendering of event payload timestamps (no offset, no fraction)
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const TIMESTAMP_FIELDS: [&str; 2] = ["created_at", "updated_at"];

fn mapping<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Mapping(
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

/// Render a timestamp the way event payloads carry it
#[must_use]
pub fn event_time(dt: &NaiveDateTime) -> String {
    dt.format(EVENT_TIME_FORMAT).to_string()
}

/// Copy of `record` with its timestamps rendered as event text
#[must_use]
pub fn event_record(record: &Record) -> Record {
    let mut copy = record.clone();
    for field in TIMESTAMP_FIELDS {
        let text = match copy.get(field) {
            Some(Value::DateTime(dt)) => event_time(dt),
            _ => continue,
        };
        copy.insert(field.to_string(), Value::Text(text));
    }
    copy
}

/// Build the envelope answering an applied update
///
/// Every call mints a fresh transaction id and event timestamp.
#[must_use]
pub fn build_response(changed: &[Record], account_id: &str) -> Value {
    let payload_items = changed
        .iter()
        .map(|record| Value::Mapping(event_record(record)))
        .collect();
    let native_items = changed.iter().cloned().map(Value::Mapping).collect();
    let timestamp = rand::thread_rng().gen_range(0..i64::MAX);

    let event = mapping([
        ("auto_managed", Value::Bool(true)),
        ("event_type", Value::from(INVENTORY_EVENT)),
        ("account_id", Value::from(account_id)),
        ("timestamp", Value::Int64(timestamp)),
        (
            "payload",
            mapping([
                ("current_items", Value::Sequence(payload_items)),
                ("deleted_items", Value::Sequence(Vec::new())),
            ]),
        ),
    ]);

    mapping([
        (
            "body",
            mapping([
                (
                    "transaction",
                    mapping([
                        ("transaction_id", Value::from(uuid::Uuid::new_v4().to_string())),
                        ("hydra_events", Value::Sequence(vec![event])),
                        ("client_version", Value::from(CLIENT_VERSION)),
                        ("client_platform", Value::from(CLIENT_PLATFORM)),
                    ]),
                ),
                ("account_id", Value::from(account_id)),
                (
                    "response",
                    mapping([
                        ("current_items", Value::Sequence(native_items)),
                        ("deleted_items", Value::Sequence(Vec::new())),
                    ]),
                ),
            ]),
        ),
        ("metadata", mapping([("msg", Value::from(SUCCESS_MSG))])),
        ("return_code", Value::Int32(0)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use invemu_test_utils::{favorite, fixed_time, record};
    use invemu_value::{Navigate, ValuePath};

    fn at(root: &Value, path: &str) -> Value {
        root.resolve(&path.parse::<ValuePath>().unwrap()).unwrap().clone()
    }

    #[test]
    fn envelope_constants() {
        let response = build_response(&[], "acct");
        assert_eq!(at(&response, "body.account_id"), Value::from("acct"));
        assert_eq!(at(&response, "body.transaction.client_version"), Value::from("0.308"));
        assert_eq!(at(&response, "body.transaction.client_platform"), Value::from("win64"));
        assert_eq!(at(&response, "metadata.msg"), Value::from(SUCCESS_MSG));
        assert_eq!(at(&response, "return_code"), Value::Int32(0));
        assert_eq!(
            at(&response, "body.transaction.hydra_events.0.event_type"),
            Value::from(INVENTORY_EVENT)
        );
        assert_eq!(
            at(&response, "body.transaction.hydra_events.0.auto_managed"),
            Value::Bool(true)
        );
    }

    #[test]
    fn transaction_id_is_fresh_uuid() {
        let a = build_response(&[], "acct");
        let b = build_response(&[], "acct");
        let id_a = at(&a, "body.transaction.transaction_id");
        let id_b = at(&b, "body.transaction.transaction_id");
        assert_ne!(id_a, id_b);
        assert!(uuid::Uuid::parse_str(id_a.as_str().unwrap()).is_ok());
    }

    #[test]
    fn payload_uses_text_timestamps_response_native() {
        let changed = vec![record("a", "Gear_A"), favorite("b", "Skin_B")];
        let response = build_response(&changed, "acct");

        let payload_created = at(
            &response,
            "body.transaction.hydra_events.0.payload.current_items.0.created_at",
        );
        assert_eq!(payload_created, Value::from("2023-09-19T14:03:07"));

        let native_created = at(&response, "body.response.current_items.1.created_at");
        assert_eq!(native_created, Value::DateTime(fixed_time()));
        assert_eq!(
            at(&response, "body.response.current_items.1.id"),
            Value::from("b")
        );
    }

    #[test]
    fn timestamp_is_non_negative() {
        let response = build_response(&[], "acct");
        match at(&response, "body.transaction.hydra_events.0.timestamp") {
            Value::Int64(ts) => assert!(ts >= 0),
            other => panic!("unexpected timestamp {other:?}"),
        }
    }
}
