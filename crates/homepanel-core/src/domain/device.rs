//! Device entities: lights and thermostats.
//!
//! The backend serves the two device families from separate collections
//! (`/api/buttons` for lights, `/api/temperature_controls` for thermostats),
//! and neither record carries an explicit kind.  The kind is therefore
//! stamped onto each [`Device`] at the boundary where the collection is known
//! (see [`Device::stamp_kind`]).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a device.
///
/// The backend has used both numeric and string identifiers over time, so
/// deserialization accepts either and normalises to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_ident(deserializer).map(Self)
    }
}

/// Accepts a JSON string or number and returns it as a `String`.
///
/// Shared by [`DeviceId`] and [`crate::RoomId`].
pub(crate) fn deserialize_ident<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ident {
        Text(String),
        Int(i64),
    }

    Ok(match Ident::deserialize(deserializer)? {
        Ident::Text(s) => s,
        Ident::Int(n) => n.to_string(),
    })
}

/// The device family.
///
/// Lights and thermostats are ordered independently within a room: a light's
/// display position counts only the lights before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Light,
    Thermostat,
}

impl DeviceKind {
    /// REST collection segment serving this kind, e.g. `/api/buttons/{id}`.
    pub fn collection(self) -> &'static str {
        match self {
            DeviceKind::Light => "buttons",
            DeviceKind::Thermostat => "temperature_controls",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Light => f.write_str("light"),
            DeviceKind::Thermostat => f.write_str("thermostat"),
        }
    }
}

/// A light or thermostat as the board sees it.
///
/// Fields the board does not use (brightness, temperature, state, ...) are
/// ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,

    #[serde(default)]
    pub name: String,

    /// Stamped at the collection boundary; absent from backend records.
    #[serde(default, rename = "type")]
    pub kind: DeviceKind,

    /// Display name of the owning room.  `None` means Unassigned.
    #[serde(default)]
    pub room: Option<String>,

    /// Durable identifier of the owning room, when the backend has one.
    #[serde(default)]
    pub room_id: Option<crate::RoomId>,

    /// Position among devices of the same kind in the owning room.
    #[serde(default)]
    pub display_order: Option<u32>,
}

impl Device {
    /// Creates an unassigned device.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: DeviceId::new(id),
            name: name.into(),
            kind,
            room: None,
            room_id: None,
            display_order: None,
        }
    }

    /// Sets the kind on every device of a collection fetched from one endpoint.
    pub fn stamp_kind(devices: Vec<Device>, kind: DeviceKind) -> Vec<Device> {
        devices
            .into_iter()
            .map(|mut d| {
                d.kind = kind;
                d
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
