//! Realtime push events.
//!
//! After any write, the backend broadcasts the authoritative state of the
//! affected collection to every connected client.  Clients re-render from
//! these events instead of from their own optimistic state, which is why the
//! save path never re-fetches.
//!
//! # JSON representation
//!
//! ```json
//! {"event":"update_rooms","data":[{"id":"r1","name":"Kitchen","display_order":0}]}
//! {"event":"update_buttons","data":[{"id":"l1","name":"Lamp","room_id":"r1"}]}
//! {"event":"update_temperature_controls","data":[]}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::device::{Device, DeviceKind};
use crate::domain::room::Room;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    UpdateRooms(Vec<Room>),
    /// Lights.  The backend still calls them "buttons".
    UpdateButtons(Vec<Device>),
    UpdateTemperatureControls(Vec<Device>),
}

impl ServerEvent {
    /// Device kind carried by a device event, `None` for room events.
    pub fn device_kind(&self) -> Option<DeviceKind> {
        match self {
            ServerEvent::UpdateRooms(_) => None,
            ServerEvent::UpdateButtons(_) => Some(DeviceKind::Light),
            ServerEvent::UpdateTemperatureControls(_) => Some(DeviceKind::Thermostat),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::UpdateRooms(_) => "update_rooms",
            ServerEvent::UpdateButtons(_) => "update_buttons",
            ServerEvent::UpdateTemperatureControls(_) => "update_temperature_controls",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rooms_event() {
        let ev: ServerEvent = serde_json::from_str(
            r#"{"event":"update_rooms","data":[{"id":"r1","name":"Kitchen"}]}"#,
        )
        .unwrap();
        assert_eq!(ev, ServerEvent::UpdateRooms(vec![Room::new("r1", "Kitchen")]));
        assert_eq!(ev.device_kind(), None);
    }

    #[test]
    fn test_decode_thermostat_event_reports_kind() {
        let ev: ServerEvent =
            serde_json::from_str(r#"{"event":"update_temperature_controls","data":[{"id":5}]}"#)
                .unwrap();
        assert_eq!(ev.device_kind(), Some(DeviceKind::Thermostat));
        assert_eq!(ev.name(), "update_temperature_controls");
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result: Result<ServerEvent, _> =
            serde_json::from_str(r#"{"event":"update_automations","data":[]}"#);
        assert!(result.is_err());
    }
}
