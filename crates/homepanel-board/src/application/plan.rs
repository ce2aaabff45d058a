//! Scripted edit sessions.
//!
//! A plan lists drops the way a user would perform them, so one edit session
//! can be replayed from the command line:
//!
//! ```toml
//! [[column]]
//! room = "kitchen-id"
//! index = 0
//!
//! [[device]]
//! id = "12"
//! room = "Living Room"   # id or name; omit for Unassigned
//! index = 0
//! ```
//!
//! Column drops run before device drops, each group in file order.

use serde::Deserialize;

use homepanel_core::{Board, ColumnKey, DeviceId, RoomKey, UNASSIGNED_LABEL};

use super::edit_session::DragEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EditPlan {
    #[serde(default, rename = "column")]
    pub columns: Vec<PlannedColumnDrop>,
    #[serde(default, rename = "device")]
    pub devices: Vec<PlannedDeviceDrop>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlannedColumnDrop {
    pub room: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlannedDeviceDrop {
    pub id: String,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub index: usize,
}

impl EditPlan {
    /// # Errors
    ///
    /// The TOML parse error.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.devices.is_empty()
    }

    /// Drag events for this plan, with room references resolved on `board`.
    pub fn events(&self, board: &Board) -> Vec<DragEvent> {
        let columns = self.columns.iter().map(|c| DragEvent::ColumnDropped {
            room: resolve_room(board, &c.room),
            index: c.index,
        });
        let devices = self.devices.iter().map(|d| DragEvent::DeviceDropped {
            device_id: DeviceId::new(d.id.clone()),
            target: match d.room.as_deref() {
                None | Some(UNASSIGNED_LABEL) => ColumnKey::Unassigned,
                Some(room) => ColumnKey::Room(resolve_room(board, room)),
            },
            index: d.index,
        });
        columns.chain(devices).collect()
    }
}

/// An identifier if some room has it, else a name.
fn resolve_room(board: &Board, reference: &str) -> RoomKey {
    board
        .rooms()
        .find(|r| r.id.as_ref().is_some_and(|id| id.as_str() == reference))
        .map(|r| r.key())
        .unwrap_or_else(|| RoomKey::Name(reference.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
