//! The pending-change buffer of one edit session.
//!
//! Nothing in here talks to the backend.  The buffer only remembers the
//! *final* intent of the user for each device and for the column order; the
//! save path in `homepanel-board` turns that into requests.
//!
//! # Last write wins
//!
//! A device dragged three times during one session produces a single entry
//! describing its last drop.  Column reorderings are likewise replaced
//! wholesale, never merged.

use std::collections::BTreeMap;

use super::board::Placement;
use super::device::{DeviceId, DeviceKind};
use super::room::{ColumnEntry, RoomKey};
use crate::protocol::api::{DevicePlacement, DeviceUpdateRequest};

/// The final placement of one device within the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMove {
    pub device_id: DeviceId,
    pub kind: DeviceKind,
    /// Destination room, `None` for Unassigned.
    pub room: Option<ColumnEntry>,
    /// Zero-based position among same-kind devices in the destination.
    pub position: u32,
}

impl DeviceMove {
    pub fn target_key(&self) -> Option<RoomKey> {
        self.room.as_ref().map(ColumnEntry::key)
    }

    /// Entry of the batch payload: `{id, room_id, display_order}`.
    pub fn to_batch_entry(&self) -> DevicePlacement {
        DevicePlacement {
            id: self.device_id.clone(),
            room_id: self.room.as_ref().and_then(|r| r.id.clone()),
            display_order: self.position,
        }
    }

    /// Body of the per-device fallback request.
    pub fn to_update_request(&self) -> DeviceUpdateRequest {
        DeviceUpdateRequest {
            room: self.room.as_ref().map(|r| r.name.clone()),
            room_id: self.room.as_ref().and_then(|r| r.id.clone()),
            display_order: Some(self.position),
        }
    }
}

impl From<Placement> for DeviceMove {
    fn from(p: Placement) -> Self {
        Self {
            device_id: p.device_id,
            kind: p.kind,
            room: p.room,
            position: p.position,
        }
    }
}

/// Unsaved changes accumulated during one edit session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChangeSet {
    device_moves: BTreeMap<DeviceId, DeviceMove>,
    column_order: Option<Vec<ColumnEntry>>,
}

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts the move for `mv.device_id`, replacing any earlier one.
    pub fn record_device_move(&mut self, mv: DeviceMove) {
        self.device_moves.insert(mv.device_id.clone(), mv);
    }

    /// Replaces the stored column order.
    pub fn record_column_move(&mut self, order: Vec<ColumnEntry>) {
        self.column_order = Some(order);
    }

    pub fn device_move(&self, id: &DeviceId) -> Option<&DeviceMove> {
        self.device_moves.get(id)
    }

    pub fn device_move_mut(&mut self, id: &DeviceId) -> Option<&mut DeviceMove> {
        self.device_moves.get_mut(id)
    }

    /// Pending moves ordered by device id.
    pub fn device_moves(&self) -> impl Iterator<Item = &DeviceMove> {
        self.device_moves.values()
    }

    pub fn column_order(&self) -> Option<&[ColumnEntry]> {
        self.column_order.as_deref()
    }

    /// Drops `key` from the stored column order, if any.
    pub fn forget_room(&mut self, key: &RoomKey) {
        if let Some(order) = &mut self.column_order {
            order.retain(|e| &e.key() != key && !entry_named(e, key));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.device_moves.is_empty() && self.column_order.as_ref().map_or(true, Vec::is_empty)
    }

    /// Moves the buffer out, leaving an empty one behind.
    pub fn take(&mut self) -> PendingChangeSet {
        std::mem::take(self)
    }

    /// Splits into the column order and the device moves.
    pub fn into_parts(self) -> (Option<Vec<ColumnEntry>>, Vec<DeviceMove>) {
        (self.column_order, self.device_moves.into_values().collect())
    }
}

fn entry_named(entry: &ColumnEntry, key: &RoomKey) -> bool {
    matches!(key, RoomKey::Name(name) if &entry.name == name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
