//! Wire-frame normalization.
//!
//! The collaborator's push feed is duck-typed: the same logical event has
//! been observed with nested or flattened payloads and with several key
//! spellings per field. All of that tolerance lives here, in one mapping
//! from a raw line to a canonical [`LedgerEvent`]; nothing downstream ever
//! looks at raw keys again.

use chrono::{DateTime, Utc};
use frontdesk_core::{AppointmentId, ErrorKind, EventKind, LedgerEvent};
use serde_json::Value;
use thiserror::Error;

/// Keep-alive tokens sent outside the JSON protocol.
pub const HEARTBEAT_SENTINELS: [&str; 3] = ["heartbeat", "ping", "pong"];

/// Key spellings under which the record id has been observed.
const ID_KEYS: [&str; 3] = ["appointment_id", "appointmentId", "id"];

/// Key spellings under which the scheduled start has been observed.
const SCHEDULE_KEYS: [&str; 6] = [
    "scheduled_at",
    "scheduledAt",
    "scheduled_for",
    "scheduledFor",
    "start_time",
    "startTime",
];

/// Keys under which a nested payload object has been observed.
const PAYLOAD_KEYS: [&str; 2] = ["appointment_data", "appointmentData"];

/// A frame that could not be decoded. Logged and dropped by the channel;
/// never fatal to the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The line was neither a heartbeat nor valid JSON.
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),
    /// The message carried no usable `type` field.
    #[error("frame has no type field")]
    MissingType,
}

impl WireError {
    /// Classification of this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedEvent
    }
}

/// One decoded line of the push feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Keep-alive token; refreshes the idle deadline and nothing else.
    Heartbeat,
    /// A normalized lifecycle event.
    Event(LedgerEvent),
    /// Valid JSON with a type outside the known vocabulary.
    Unknown {
        /// The unrecognized type token, for the debug log.
        event_type: String,
    },
}

/// Decodes one line of the feed; `Ok(None)` for blank lines.
///
/// SSE framing (`data:` prefixes) is tolerated and stripped. Heartbeat
/// sentinels are recognized before any JSON parsing, so they can never
/// surface as malformed frames.
///
/// # Errors
///
/// [`WireError`] when the line is neither blank, a heartbeat, nor a JSON
/// object carrying a `type`.
pub fn decode_frame(line: &str) -> Result<Option<Frame>, WireError> {
    let mut payload = line.trim();
    if let Some(rest) = payload.strip_prefix("data:") {
        payload = rest.trim();
    }
    if payload.is_empty() {
        return Ok(None);
    }
    if is_heartbeat(payload) {
        return Ok(Some(Frame::Heartbeat));
    }

    let value: Value =
        serde_json::from_str(payload).map_err(|e| WireError::InvalidJson(e.to_string()))?;

    // A JSON-quoted heartbeat token counts as a heartbeat too.
    if let Value::String(token) = &value {
        if is_heartbeat(token) {
            return Ok(Some(Frame::Heartbeat));
        }
    }

    let event_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(WireError::MissingType)?;

    let Some(kind) = EventKind::from_wire(event_type) else {
        return Ok(Some(Frame::Unknown {
            event_type: event_type.to_string(),
        }));
    };

    let nested = PAYLOAD_KEYS
        .iter()
        .find_map(|key| value.get(*key))
        .filter(|v| v.is_object());

    let appointment_id = nested
        .and_then(extract_id)
        .or_else(|| extract_id(&value));
    let scheduled_at = nested
        .and_then(extract_timestamp)
        .or_else(|| extract_timestamp(&value));

    Ok(Some(Frame::Event(LedgerEvent {
        kind,
        appointment_id,
        scheduled_at,
    })))
}

fn is_heartbeat(token: &str) -> bool {
    HEARTBEAT_SENTINELS
        .iter()
        .any(|sentinel| token.eq_ignore_ascii_case(sentinel))
}

fn extract_id(value: &Value) -> Option<AppointmentId> {
    let raw = ID_KEYS.iter().find_map(|key| value.get(*key))?;
    match raw {
        Value::String(text) if !text.trim().is_empty() => Some(AppointmentId::new(text.trim())),
        Value::Number(number) => Some(AppointmentId::new(number.to_string())),
        _ => None,
    }
}

fn extract_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = SCHEDULE_KEYS
        .iter()
        .find_map(|key| value.get(*key))
        .and_then(Value::as_str)?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event_from(line: &str) -> LedgerEvent {
        match decode_frame(line).unwrap().unwrap() {
            Frame::Event(event) => event,
            other => panic!("expected an event frame, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_decode_to_nothing() {
        assert_eq!(decode_frame("").unwrap(), None);
        assert_eq!(decode_frame("   ").unwrap(), None);
        assert_eq!(decode_frame("data:").unwrap(), None);
    }

    #[test]
    fn heartbeats_never_reach_the_json_parser() {
        for token in ["heartbeat", "ping", "pong", "PING", " Pong ", "data: ping"] {
            assert_eq!(
                decode_frame(token).unwrap(),
                Some(Frame::Heartbeat),
                "token {token:?} should be a heartbeat"
            );
        }
        // Quoted JSON string form of the same tokens.
        assert_eq!(decode_frame("\"heartbeat\"").unwrap(), Some(Frame::Heartbeat));
    }

    #[test]
    fn decodes_a_flattened_snake_case_event() {
        let event = event_from(
            r#"{"type": "PAYMENT_CONFIRMED", "appointment_id": "apt-41", "scheduled_at": "2024-03-10T10:00:00Z"}"#,
        );
        assert_eq!(event.kind, EventKind::PaymentConfirmed);
        assert_eq!(event.appointment_id, Some(AppointmentId::new("apt-41")));
        assert_eq!(
            event.scheduled_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn decodes_a_nested_camel_case_event() {
        let event = event_from(
            r#"{"type": "APPOINTMENT_CREATED", "appointmentData": {"id": 41, "scheduledAt": "2024-03-10T10:00:00+02:00"}}"#,
        );
        assert_eq!(event.kind, EventKind::AppointmentCreated);
        assert_eq!(event.appointment_id, Some(AppointmentId::new("41")));
        assert_eq!(
            event.scheduled_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn nested_payload_wins_over_top_level_keys() {
        let event = event_from(
            r#"{"type": "APPOINTMENT_UPDATED", "id": "outer", "appointment_data": {"id": "inner"}}"#,
        );
        assert_eq!(event.appointment_id, Some(AppointmentId::new("inner")));
    }

    #[test]
    fn missing_id_still_yields_an_event() {
        let event = event_from(r#"{"type": "SESSION_COMPLETED"}"#);
        assert_eq!(event.kind, EventKind::SessionCompleted);
        assert_eq!(event.appointment_id, None);
        assert_eq!(event.scheduled_at, None);
    }

    #[test]
    fn unparseable_timestamps_degrade_to_none() {
        let event = event_from(
            r#"{"type": "APPOINTMENT_CREATED", "id": 7, "scheduledAt": "tomorrow-ish"}"#,
        );
        assert_eq!(event.appointment_id, Some(AppointmentId::new("7")));
        assert_eq!(event.scheduled_at, None);
    }

    #[test]
    fn unknown_types_are_reported_not_failed() {
        let frame = decode_frame(r#"{"type": "STAFF_CLOCKED_IN", "id": 1}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            frame,
            Frame::Unknown {
                event_type: "STAFF_CLOCKED_IN".to_string()
            }
        );
    }

    #[test]
    fn garbage_and_typeless_frames_are_malformed() {
        let garbage = decode_frame("{not json").unwrap_err();
        assert!(matches!(garbage, WireError::InvalidJson(_)));
        assert_eq!(garbage.kind(), ErrorKind::MalformedEvent);

        let typeless = decode_frame(r#"{"appointment_id": 41}"#).unwrap_err();
        assert_eq!(typeless, WireError::MissingType);
    }

    #[test]
    fn sse_framing_is_stripped_before_parsing() {
        let event = event_from(r#"data: {"type": "PAYMENT_RECEIVED", "id": "apt-2"}"#);
        assert_eq!(event.kind, EventKind::PaymentReceived);
        assert_eq!(event.appointment_id, Some(AppointmentId::new("apt-2")));
    }
}
