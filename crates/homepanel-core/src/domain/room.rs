//! Room entities and the keys used to address board columns.
//!
//! Rooms created by the multi-home backend have a durable identifier.  Legacy
//! single-home installations store rooms as a bare list of names, so a room's
//! name doubles as its identifier there.  [`RoomKey`] captures both cases.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::device::deserialize_ident;

/// Display label of the fixed column holding devices with no room.
pub const UNASSIGNED_LABEL: &str = "Unassigned";

/// Durable identifier of a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_ident(deserializer).map(Self)
    }
}

/// How a room is addressed: by identifier, or by name for legacy rooms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Id(RoomId),
    Name(String),
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKey::Id(id) => write!(f, "#{id}"),
            RoomKey::Name(name) => write!(f, "{name:?}"),
        }
    }
}

/// Addresses one board column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    /// The fixed, non-reorderable, non-deletable column.
    Unassigned,
    Room(RoomKey),
}

/// A room as served by `/api/rooms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    pub id: Option<RoomId>,
    pub name: String,
    pub display_order: Option<i64>,
}

impl Room {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(RoomId::new(id)),
            name: name.into(),
            display_order: None,
        }
    }

    /// A legacy room with no durable identifier.
    pub fn legacy(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            display_order: None,
        }
    }

    pub fn key(&self) -> RoomKey {
        match &self.id {
            Some(id) => RoomKey::Id(id.clone()),
            None => RoomKey::Name(self.name.clone()),
        }
    }

    /// `true` when `key` addresses this room.
    ///
    /// A name key also matches a room that has since gained an identifier,
    /// so legacy references keep resolving after a migration.
    pub fn matches(&self, key: &RoomKey) -> bool {
        match key {
            RoomKey::Id(id) => self.id.as_ref() == Some(id),
            RoomKey::Name(name) => &self.name == name,
        }
    }

    pub fn entry(&self) -> ColumnEntry {
        ColumnEntry {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for Room {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Record {
            #[serde(default)]
            id: Option<RoomId>,
            name: String,
            #[serde(default)]
            display_order: Option<i64>,
        }

        // Legacy backends answer `/api/rooms` with a bare list of names.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Name(String),
            Record(Record),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Name(name) => Room::legacy(name),
            Wire::Record(r) => Room {
                id: r.id,
                name: r.name,
                display_order: r.display_order,
            },
        })
    }
}

/// One entry of a column reordering: identifier when known, name always.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub id: Option<RoomId>,
    pub name: String,
}

impl ColumnEntry {
    /// The identifier sent in `room_ids`: the id when present, the name otherwise.
    pub fn identifier(&self) -> &str {
        self.id.as_ref().map(RoomId::as_str).unwrap_or(&self.name)
    }

    pub fn key(&self) -> RoomKey {
        match &self.id {
            Some(id) => RoomKey::Id(id.clone()),
            None => RoomKey::Name(self.name.clone()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
