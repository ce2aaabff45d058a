//! JSON bodies of the REST endpoints.
//!
//! | Endpoint                                 | Body                     |
//! |------------------------------------------|--------------------------|
//! | `POST /api/rooms/order`                  | [`RoomOrderRequest`]     |
//! | `POST /api/devices/batch-update`         | [`BatchUpdateRequest`]   |
//! | `PUT  /api/buttons/{id}`                 | [`DeviceUpdateRequest`]  |
//! | `PUT  /api/temperature_controls/{id}`    | [`DeviceUpdateRequest`]  |
//! | `POST /api/rooms`, `PUT /api/rooms/{id}` | [`RoomNameRequest`]      |

use serde::{Deserialize, Serialize};

use crate::domain::device::DeviceId;
use crate::domain::room::{ColumnEntry, RoomId};

/// New ordering of the reorderable rooms.
///
/// The backend resolves `room_ids` first (durable ids, or names for legacy
/// rooms) and may fall back to the raw `rooms` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOrderRequest {
    pub room_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rooms: Vec<ColumnEntry>,
}

impl RoomOrderRequest {
    pub fn from_entries(entries: &[ColumnEntry]) -> Self {
        Self {
            room_ids: entries.iter().map(|e| e.identifier().to_string()).collect(),
            rooms: entries.to_vec(),
        }
    }
}

/// One device in a batch update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePlacement {
    pub id: DeviceId,
    /// `null` moves the device to Unassigned.
    pub room_id: Option<RoomId>,
    pub display_order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpdateRequest {
    pub devices: Vec<DevicePlacement>,
}

/// Outcome reported by the batch endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    PartialSuccess,
    Error,
}

impl BatchStatus {
    /// `success` and `partial_success` both end the save; anything else
    /// triggers the per-device fallback.
    pub fn is_accepted(self) -> bool {
        matches!(self, BatchStatus::Success | BatchStatus::PartialSuccess)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateResponse {
    pub status: BatchStatus,
    #[serde(default)]
    pub updated: Option<u32>,
    #[serde(default)]
    pub total: Option<u32>,
    /// Per-device failure details, shape left to the backend.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of a single-device update (the batch fallback path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUpdateRequest {
    /// Room display name, `null` for Unassigned.
    pub room: Option<String>,
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<u32>,
}

/// `POST /api/rooms` body.  The create endpoint names its field `room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub room: String,
}

/// `PUT /api/rooms/{id}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomNameRequest {
    pub name: String,
}

/// Generic `{status, message}` envelope used by most endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
