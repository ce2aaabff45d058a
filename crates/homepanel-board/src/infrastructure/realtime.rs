//! Realtime push subscriber.
//!
//! The backend broadcasts authoritative state after every write.  This module
//! connects to its WebSocket endpoint, decodes the board events and forwards
//! them on an mpsc channel; the binary feeds them to
//! [`EditSessionManager::apply_event`](crate::application::EditSessionManager::apply_event).
//!
//! # Frame formats
//!
//! Two text framings are understood:
//!
//! ```text
//! {"event": "update_rooms", "data": [...]}     plain JSON envelope
//! 42["update_rooms", [...]]                    Socket.IO event packet
//! ```
//!
//! For Socket.IO the subscriber also answers the engine handshake (`0{...}`
//! with `40`) and heartbeat pings (`2` with `3`).  Events the board does not
//! care about (presence, automations, ...) are ignored.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use homepanel_core::ServerEvent;

/// Event names that map onto [`ServerEvent`].
const BOARD_EVENTS: [&str; 3] = [
    "update_rooms",
    "update_buttons",
    "update_temperature_controls",
];

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed {event} payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One decoded text frame.
#[derive(Debug, PartialEq)]
pub enum Frame {
    Event(ServerEvent),
    /// Socket.IO engine handshake; answer with a namespace connect.
    Open,
    /// Socket.IO heartbeat; answer with a pong.
    Ping,
    /// Anything the board does not react to.
    Ignored,
}

/// Decodes one text frame.
///
/// # Errors
///
/// [`RealtimeError::Payload`] when a board event carries data of the wrong
/// shape.  Unknown events and non-JSON frames are [`Frame::Ignored`].
pub fn decode_frame(text: &str) -> Result<Frame, RealtimeError> {
    if text == "2" {
        return Ok(Frame::Ping);
    }
    if text.starts_with('0') && text[1..].trim_start().starts_with('{') {
        return Ok(Frame::Open);
    }
    if let Some(packet) = text.strip_prefix("42") {
        let Ok(Value::Array(mut parts)) = serde_json::from_str::<Value>(packet) else {
            return Ok(Frame::Ignored);
        };
        if parts.is_empty() {
            return Ok(Frame::Ignored);
        }
        let data = if parts.len() > 1 {
            parts.swap_remove(1)
        } else {
            Value::Null
        };
        let Value::String(event) = parts.swap_remove(0) else {
            return Ok(Frame::Ignored);
        };
        return board_event(event, data);
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(mut envelope)) => match envelope.remove("event") {
            Some(Value::String(event)) => {
                let data = envelope.remove("data").unwrap_or(Value::Null);
                board_event(event, data)
            }
            _ => Ok(Frame::Ignored),
        },
        _ => Ok(Frame::Ignored),
    }
}

fn board_event(event: String, data: Value) -> Result<Frame, RealtimeError> {
    if !BOARD_EVENTS.contains(&event.as_str()) {
        return Ok(Frame::Ignored);
    }
    let envelope = serde_json::json!({ "event": event, "data": data });
    serde_json::from_value(envelope)
        .map(Frame::Event)
        .map_err(|source| RealtimeError::Payload { event, source })
}

/// Connects to `url` and forwards board events to `tx` until the server
/// closes the connection or the receiver is dropped.
///
/// Malformed payloads are logged and skipped.
///
/// # Errors
///
/// [`RealtimeError::WebSocket`] when connecting or reading fails.
pub async fn subscribe(url: &str, tx: mpsc::Sender<ServerEvent>) -> Result<(), RealtimeError> {
    let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
    info!(%url, "realtime channel connected");
    let (mut sink, mut source) = stream.split();

    while let Some(message) = source.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Close(frame) => {
                debug!(?frame, "realtime channel closed by server");
                break;
            }
            // Control frames are answered by tungstenite itself.
            _ => continue,
        };

        match decode_frame(&text) {
            Ok(Frame::Event(event)) => {
                debug!(event = event.name(), "realtime event received");
                if tx.send(event).await.is_err() {
                    debug!("event receiver dropped, leaving realtime channel");
                    break;
                }
            }
            Ok(Frame::Open) => sink.send(Message::Text("40".into())).await?,
            Ok(Frame::Ping) => sink.send(Message::Text("3".into())).await?,
            Ok(Frame::Ignored) => {}
            Err(e) => warn!("skipping realtime frame: {e}"),
        }
    }

    info!(%url, "realtime channel finished");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use homepanel_core::DeviceKind;

    #[test]
    fn test_plain_envelope_decodes() {
        let frame = decode_frame(r#"{"event": "update_rooms", "data": ["Kitchen"]}"#).unwrap();
        let Frame::Event(ServerEvent::UpdateRooms(rooms)) = frame else {
            panic!("expected update_rooms, got {frame:?}");
        };
        assert_eq!(rooms[0].name, "Kitchen");
    }

    #[test]
    fn test_socketio_event_decodes() {
        let frame =
            decode_frame(r#"42["update_buttons",[{"id":1,"name":"Lamp","room":null}]]"#).unwrap();
        let Frame::Event(event) = frame else {
            panic!("expected an event, got {frame:?}");
        };
        assert_eq!(event.device_kind(), Some(DeviceKind::Light));
    }

    #[test]
    fn test_socketio_control_packets() {
        assert_eq!(decode_frame("2").unwrap(), Frame::Ping);
        assert_eq!(
            decode_frame(r#"0{"sid":"abc","pingInterval":25000}"#).unwrap(),
            Frame::Open
        );
        assert_eq!(decode_frame("40").unwrap(), Frame::Ignored);
    }

    #[test]
    fn test_unrelated_events_are_ignored() {
        assert_eq!(
            decode_frame(r#"42["user_joined",{"user":"x"}]"#).unwrap(),
            Frame::Ignored
        );
        assert_eq!(
            decode_frame(r#"{"event":"update_automations","data":[]}"#).unwrap(),
            Frame::Ignored
        );
        assert_eq!(decode_frame("not json").unwrap(), Frame::Ignored);
    }

    #[test]
    fn test_malformed_board_payload_is_an_error() {
        let err = decode_frame(r#"{"event":"update_buttons","data":{"oops":true}}"#).unwrap_err();
        assert!(matches!(err, RealtimeError::Payload { ref event, .. } if event == "update_buttons"));
    }
}
