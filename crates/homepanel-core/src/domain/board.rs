//! The device/room board: explicit, in-memory column and device ordering.
//!
//! The board is the single source of truth for "what is where" on the client.
//! Drag handlers mutate it directly ([`Board::move_device`],
//! [`Board::move_column`]) and read back the resulting per-kind position, so
//! persistence never has to inspect rendered output to learn an ordering.
//!
//! # Layout invariants
//!
//! ```text
//! columns[0]        columns[1..]
//! ┌────────────┐    ┌────────┐ ┌────────┐ ┌────────┐
//! │ Unassigned │    │ Room A │ │ Room B │ │ Room C │   ← reorderable
//! │  (fixed)   │    │        │ │        │ │        │
//! └────────────┘    └────────┘ └────────┘ └────────┘
//! ```
//!
//! - `columns[0]` is always the Unassigned column; nothing can move it.
//! - Every device id appears in exactly one column.
//! - A column's `devices` vector mixes kinds; positions are counted per kind.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::device::{Device, DeviceId, DeviceKind};
use super::room::{ColumnEntry, ColumnKey, Room, RoomKey, UNASSIGNED_LABEL};

/// Errors raised by board mutations.
#[derive(Debug, Error, PartialEq)]
pub enum BoardError {
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),

    #[error("unknown room: {0}")]
    UnknownRoom(RoomKey),

    /// The Unassigned column cannot be reordered, renamed or deleted.
    #[error("the {UNASSIGNED_LABEL} column is fixed")]
    FixedColumn,
}

/// One column of the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// `None` for the Unassigned column.
    room: Option<Room>,
    devices: Vec<DeviceId>,
}

impl Column {
    fn unassigned() -> Self {
        Self {
            room: None,
            devices: Vec::new(),
        }
    }

    fn for_room(room: Room) -> Self {
        Self {
            room: Some(room),
            devices: Vec::new(),
        }
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub fn is_fixed(&self) -> bool {
        self.room.is_none()
    }

    pub fn title(&self) -> &str {
        self.room.as_ref().map_or(UNASSIGNED_LABEL, |r| r.name.as_str())
    }

    pub fn key(&self) -> ColumnKey {
        match &self.room {
            Some(room) => ColumnKey::Room(room.key()),
            None => ColumnKey::Unassigned,
        }
    }
}

/// Where a device ended up after a drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub device_id: DeviceId,
    pub kind: DeviceKind,
    /// Destination room, `None` for Unassigned.
    pub room: Option<ColumnEntry>,
    /// Zero-based position among devices of the same kind in the destination.
    pub position: u32,
}

/// The board model.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    columns: Vec<Column>,
    devices: HashMap<DeviceId, Device>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// An empty board holding only the Unassigned column.
    pub fn new() -> Self {
        Self {
            columns: vec![Column::unassigned()],
            devices: HashMap::new(),
        }
    }

    /// Builds a board from the backend's authoritative state.
    ///
    /// Rooms are ordered by `display_order` (falling back to their position in
    /// `rooms`), ties broken by case-insensitive name.  Devices land in the
    /// room matching their `room_id`, else their `room` name, else Unassigned,
    /// and are ordered by kind, then `display_order`, then name.
    pub fn from_snapshot(rooms: Vec<Room>, devices: impl IntoIterator<Item = Device>) -> Self {
        let mut indexed: Vec<(i64, String, Room)> = rooms
            .into_iter()
            .enumerate()
            .map(|(i, r)| (r.display_order.unwrap_or(i as i64), r.name.to_lowercase(), r))
            .collect();
        indexed.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

        let mut columns = vec![Column::unassigned()];
        for (_, _, room) in indexed {
            if columns.iter().any(|c| c.room.as_ref() == Some(&room)) {
                continue;
            }
            columns.push(Column::for_room(room));
        }

        let mut devices: Vec<Device> = devices.into_iter().collect();
        devices.sort_by(|a, b| {
            let ka = (kind_rank(a.kind), a.display_order.unwrap_or(u32::MAX), a.name.to_lowercase());
            let kb = (kind_rank(b.kind), b.display_order.unwrap_or(u32::MAX), b.name.to_lowercase());
            ka.cmp(&kb)
        });

        let mut by_id = HashMap::with_capacity(devices.len());
        for device in devices {
            let idx = Self::home_column(&columns, &device);
            columns[idx].devices.push(device.id.clone());
            by_id.insert(device.id.clone(), device);
        }

        Self {
            columns,
            devices: by_id,
        }
    }

    /// Column index a backend device record belongs to.
    fn home_column(columns: &[Column], device: &Device) -> usize {
        let by_id = device.room_id.as_ref().and_then(|rid| {
            columns
                .iter()
                .position(|c| c.room.as_ref().and_then(|r| r.id.as_ref()) == Some(rid))
        });
        let by_name = || {
            device.room.as_ref().and_then(|name| {
                columns
                    .iter()
                    .position(|c| c.room.as_ref().map(|r| &r.name) == Some(name))
            })
        };
        by_id.or_else(by_name).unwrap_or(0)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.columns.iter().filter_map(|c| c.room.as_ref())
    }

    pub fn has_room(&self, key: &RoomKey) -> bool {
        self.rooms().any(|r| r.matches(key))
    }

    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn column(&self, key: &ColumnKey) -> Option<&Column> {
        self.column_index(key).map(|i| &self.columns[i])
    }

    fn column_index(&self, key: &ColumnKey) -> Option<usize> {
        match key {
            ColumnKey::Unassigned => Some(0),
            ColumnKey::Room(rk) => self
                .columns
                .iter()
                .position(|c| c.room.as_ref().is_some_and(|r| r.matches(rk))),
        }
    }

    fn column_of(&self, id: &DeviceId) -> Option<usize> {
        self.columns.iter().position(|c| c.devices.contains(id))
    }

    /// Zero-based position of `id` among devices of its kind in its column.
    pub fn position_among_kind(&self, id: &DeviceId) -> Option<u32> {
        let kind = self.devices.get(id)?.kind;
        let column = &self.columns[self.column_of(id)?];
        let before = column
            .devices
            .iter()
            .take_while(|d| *d != id)
            .filter(|d| self.devices.get(*d).is_some_and(|dev| dev.kind == kind))
            .count();
        Some(before as u32)
    }

    /// Current placement of a device.
    pub fn placement(&self, id: &DeviceId) -> Option<Placement> {
        let device = self.devices.get(id)?;
        let column = &self.columns[self.column_of(id)?];
        Some(Placement {
            device_id: id.clone(),
            kind: device.kind,
            room: column.room.as_ref().map(Room::entry),
            position: self.position_among_kind(id)?,
        })
    }

    /// Moves a device to `target`, inserting it at `index` among all of the
    /// column's devices (clamped to the end), and returns its new placement.
    ///
    /// # Errors
    ///
    /// [`BoardError::UnknownDevice`] or [`BoardError::UnknownRoom`]; the board
    /// is unchanged on error.
    pub fn move_device(
        &mut self,
        id: &DeviceId,
        target: &ColumnKey,
        index: usize,
    ) -> Result<Placement, BoardError> {
        let from = self
            .column_of(id)
            .ok_or_else(|| BoardError::UnknownDevice(id.clone()))?;
        let to = self.column_index(target).ok_or_else(|| match target {
            ColumnKey::Room(rk) => BoardError::UnknownRoom(rk.clone()),
            ColumnKey::Unassigned => BoardError::FixedColumn,
        })?;

        self.columns[from].devices.retain(|d| d != id);
        let slot = index.min(self.columns[to].devices.len());
        self.columns[to].devices.insert(slot, id.clone());

        let room = self.columns[to].room.clone();
        let position = self.position_among_kind(id).unwrap_or(0);
        if let Some(device) = self.devices.get_mut(id) {
            device.room = room.as_ref().map(|r| r.name.clone());
            device.room_id = room.as_ref().and_then(|r| r.id.clone());
            device.display_order = Some(position);
        }
        debug!(device = %id, column = self.columns[to].title(), position, "device moved");

        self.placement(id)
            .ok_or_else(|| BoardError::UnknownDevice(id.clone()))
    }

    /// Moves a room column to `index` among the reorderable columns (clamped).
    ///
    /// # Errors
    ///
    /// [`BoardError::UnknownRoom`] if no column matches `key`.
    pub fn move_column(&mut self, key: &RoomKey, index: usize) -> Result<(), BoardError> {
        let from = self
            .column_index(&ColumnKey::Room(key.clone()))
            .ok_or_else(|| BoardError::UnknownRoom(key.clone()))?;
        let column = self.columns.remove(from);
        let slot = 1 + index.min(self.columns.len() - 1);
        self.columns.insert(slot, column);
        Ok(())
    }

    /// Reorders room columns to follow `order`.
    ///
    /// Rooms missing from `order` keep their relative order after the listed
    /// ones; keys matching no room are ignored.
    pub fn apply_room_order(&mut self, order: &[RoomKey]) {
        let mut rest: Vec<Column> = self.columns.drain(1..).collect();
        let mut sorted = Vec::with_capacity(rest.len());
        for key in order {
            let found = rest
                .iter()
                .position(|c| c.room.as_ref().is_some_and(|r| r.matches(key)));
            if let Some(i) = found {
                sorted.push(rest.remove(i));
            }
        }
        sorted.extend(rest);
        self.columns.extend(sorted);
    }

    /// Full order of the reorderable columns; Unassigned is never included.
    pub fn room_order(&self) -> Vec<ColumnEntry> {
        self.rooms().map(Room::entry).collect()
    }

    /// Removes a room column; its devices are appended to Unassigned.
    ///
    /// # Errors
    ///
    /// [`BoardError::UnknownRoom`] if no column matches `key`.
    pub fn remove_room(&mut self, key: &RoomKey) -> Result<Room, BoardError> {
        let idx = self
            .column_index(&ColumnKey::Room(key.clone()))
            .ok_or_else(|| BoardError::UnknownRoom(key.clone()))?;
        let column = self.columns.remove(idx);
        for id in &column.devices {
            if let Some(device) = self.devices.get_mut(id) {
                device.room = None;
                device.room_id = None;
            }
        }
        self.columns[0].devices.extend(column.devices);
        column.room.ok_or(BoardError::FixedColumn)
    }

    /// Replaces the room list, keeping current device records.
    pub fn replace_rooms(&mut self, rooms: Vec<Room>) {
        let devices: Vec<Device> = self.devices.values().cloned().collect();
        *self = Self::from_snapshot(rooms, devices);
    }

    /// Replaces every device of `kind`, keeping rooms and the other kind.
    pub fn replace_devices(&mut self, kind: DeviceKind, incoming: Vec<Device>) {
        let rooms: Vec<Room> = self.rooms().cloned().collect();
        let rooms = rooms
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                // Keep the current column order when rebuilding.
                r.display_order = Some(i as i64);
                r
            })
            .collect();
        let devices: Vec<Device> = self
            .devices
            .values()
            .filter(|d| d.kind != kind)
            .cloned()
            .chain(Device::stamp_kind(incoming, kind))
            .collect();
        *self = Self::from_snapshot(rooms, devices);
    }
}

fn kind_rank(kind: DeviceKind) -> u8 {
    match kind {
        DeviceKind::Light => 0,
        DeviceKind::Thermostat => 1,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn light(id: &str, room: Option<&str>, order: u32) -> Device {
        let mut d = Device::new(id, id, DeviceKind::Light);
        d.room_id = room.map(Into::into);
        d.display_order = Some(order);
        d
    }

    fn thermostat(id: &str, room: Option<&str>, order: u32) -> Device {
        let mut d = Device::new(id, id, DeviceKind::Thermostat);
        d.room_id = room.map(Into::into);
        d.display_order = Some(order);
        d
    }

    fn sample() -> Board {
        let rooms = vec![Room::new("a", "Room A"), Room::new("b", "Room B")];
        let devices = vec![
            light("l1", Some("a"), 0),
            light("l2", Some("b"), 0),
            light("l3", Some("b"), 1),
            thermostat("t1", Some("b"), 0),
            light("l4", None, 0),
        ];
        Board::from_snapshot(rooms, devices)
    }

    fn key(id: &str) -> RoomKey {
        RoomKey::Id(id.into())
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn test_new_board_has_only_unassigned_column() {
        let board = Board::new();
        assert_eq!(board.columns().len(), 1);
        assert!(board.columns()[0].is_fixed());
        assert_eq!(board.columns()[0].title(), UNASSIGNED_LABEL);
    }

    #[test]
    fn test_snapshot_places_unassigned_first() {
        let board = sample();
        assert!(board.columns()[0].is_fixed());
        assert_eq!(board.columns()[0].devices(), &[DeviceId::from("l4")]);
    }

    #[test]
    fn test_snapshot_orders_rooms_by_display_order_then_name() {
        let mut c = Room::new("c", "charlie");
        c.display_order = Some(0);
        let mut a = Room::new("a", "Alpha");
        a.display_order = Some(1);
        let mut b = Room::new("b", "bravo");
        b.display_order = Some(1);

        let board = Board::from_snapshot(vec![b, a, c], Vec::new());

        let names: Vec<_> = board.rooms().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["charlie", "Alpha", "bravo"]);
    }

    #[test]
    fn test_snapshot_matches_legacy_room_by_name() {
        let mut d = Device::new("l1", "Lamp", DeviceKind::Light);
        d.room = Some("Den".to_string());
        let board = Board::from_snapshot(vec![Room::legacy("Den")], vec![d]);
        let den = board
            .column(&ColumnKey::Room(RoomKey::Name("Den".into())))
            .unwrap();
        assert_eq!(den.devices(), &[DeviceId::from("l1")]);
    }

    #[test]
    fn test_snapshot_sends_unknown_room_to_unassigned() {
        let board = Board::from_snapshot(vec![], vec![light("l1", Some("gone"), 0)]);
        assert_eq!(board.columns()[0].devices(), &[DeviceId::from("l1")]);
    }

    // ── Positions ─────────────────────────────────────────────────────────────

    #[test]
    fn test_position_counts_only_same_kind() {
        let board = sample();
        // Room B holds l2, l3, t1: the thermostat is first of its kind.
        assert_eq!(board.position_among_kind(&"l3".into()), Some(1));
        assert_eq!(board.position_among_kind(&"t1".into()), Some(0));
    }

    #[test]
    fn test_move_device_returns_per_kind_position() {
        // Arrange
        let mut board = sample();

        // Act: drop l1 at the very end of Room B (after l2, l3, t1)
        let placement = board
            .move_device(&"l1".into(), &ColumnKey::Room(key("b")), 99)
            .unwrap();

        // Assert
        assert_eq!(placement.position, 2);
        assert_eq!(placement.room.unwrap().name, "Room B");
        assert!(board.column(&ColumnKey::Room(key("a"))).unwrap().devices().is_empty());
    }

    #[test]
    fn test_move_device_to_unassigned_has_no_room() {
        let mut board = sample();
        let placement = board
            .move_device(&"l2".into(), &ColumnKey::Unassigned, 0)
            .unwrap();
        assert_eq!(placement.room, None);
        assert_eq!(placement.position, 0);
        assert_eq!(board.device(&"l2".into()).unwrap().room_id, None);
    }

    #[test]
    fn test_move_device_within_same_column_reorders() {
        let mut board = sample();
        let placement = board
            .move_device(&"l3".into(), &ColumnKey::Room(key("b")), 0)
            .unwrap();
        assert_eq!(placement.position, 0);
        assert_eq!(board.position_among_kind(&"l2".into()), Some(1));
    }

    #[test]
    fn test_move_unknown_device_fails_without_change() {
        let mut board = sample();
        let before = board.clone();
        let err = board
            .move_device(&"nope".into(), &ColumnKey::Unassigned, 0)
            .unwrap_err();
        assert_eq!(err, BoardError::UnknownDevice("nope".into()));
        assert_eq!(board, before);
    }

    #[test]
    fn test_move_device_to_unknown_room_fails_without_change() {
        let mut board = sample();
        let before = board.clone();
        let err = board
            .move_device(&"l1".into(), &ColumnKey::Room(key("zzz")), 0)
            .unwrap_err();
        assert!(matches!(err, BoardError::UnknownRoom(_)));
        assert_eq!(board, before);
    }

    // ── Columns ───────────────────────────────────────────────────────────────

    #[test]
    fn test_move_column_keeps_unassigned_first() {
        let mut board = sample();
        board.move_column(&key("b"), 0).unwrap();
        assert!(board.columns()[0].is_fixed());
        let order: Vec<_> = board.room_order().into_iter().map(|e| e.name).collect();
        assert_eq!(order, vec!["Room B", "Room A"]);
    }

    #[test]
    fn test_move_column_clamps_index() {
        let mut board = sample();
        board.move_column(&key("a"), 50).unwrap();
        let order: Vec<_> = board.room_order().into_iter().map(|e| e.name).collect();
        assert_eq!(order, vec!["Room B", "Room A"]);
    }

    #[test]
    fn test_apply_room_order_puts_unlisted_rooms_last() {
        let mut board = Board::from_snapshot(
            vec![
                Room::new("a", "A"),
                Room::new("b", "B"),
                Room::new("c", "C"),
            ],
            Vec::new(),
        );
        board.apply_room_order(&[key("c"), key("missing"), key("a")]);
        let order: Vec<_> = board.room_order().into_iter().map(|e| e.name).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
        assert!(board.columns()[0].is_fixed());
    }

    #[test]
    fn test_room_order_excludes_unassigned() {
        let board = sample();
        assert_eq!(board.room_order().len(), 2);
    }

    #[test]
    fn test_remove_room_moves_devices_to_unassigned() {
        let mut board = sample();
        let removed = board.remove_room(&key("b")).unwrap();
        assert_eq!(removed.name, "Room B");
        assert!(!board.has_room(&key("b")));
        assert_eq!(board.columns()[0].devices().len(), 4);
        assert_eq!(board.device(&"t1".into()).unwrap().room, None);
    }

    // ── Realtime replacement ──────────────────────────────────────────────────

    #[test]
    fn test_replace_devices_keeps_other_kind() {
        let mut board = sample();
        board.replace_devices(DeviceKind::Thermostat, vec![]);
        assert!(board.device(&"t1".into()).is_none());
        assert!(board.device(&"l1".into()).is_some());
        assert_eq!(board.room_order().len(), 2);
    }

    #[test]
    fn test_replace_rooms_rehomes_orphaned_devices() {
        let mut board = sample();
        board.replace_rooms(vec![Room::new("a", "Room A")]);
        assert!(!board.has_room(&key("b")));
        // l2, l3, t1 pointed at room b and now fall back to Unassigned.
        assert_eq!(board.columns()[0].devices().len(), 4);
    }
}
