//! # homepanel-core
//!
//! Shared library for the HomePanel board client containing the device/room
//! domain model, the edit-mode pending-change buffer, and the JSON wire types
//! exchanged with the smart-home backend.
//!
//! This crate has zero dependencies on async runtimes, HTTP clients, or
//! sockets.  Everything here can be unit-tested without a backend.
//!
//! # Architecture overview (for beginners)
//!
//! The smart-home panel shows a "kanban" board: one column per room, plus a
//! fixed **Unassigned** column on the left for devices that belong to no room.
//! In *edit mode* the user drags devices between columns and drags columns
//! into a new order.  Those drags are buffered locally and only persisted
//! when the user presses *save*.
//!
//! This crate (`homepanel-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Pure business logic.  The [`Board`] holds the explicit,
//!   in-memory ordering of columns and devices; the [`PendingChangeSet`]
//!   holds the unsaved moves of one edit session.
//!
//! - **`protocol`** – The JSON bodies of the REST endpoints and the realtime
//!   push events, as typed Rust structs with `serde` derives.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `homepanel_core::Board` instead of `homepanel_core::domain::board::Board`.
pub use domain::board::{Board, BoardError, Column, Placement};
pub use domain::device::{Device, DeviceId, DeviceKind};
pub use domain::pending::{DeviceMove, PendingChangeSet};
pub use domain::room::{ColumnEntry, ColumnKey, Room, RoomId, RoomKey, UNASSIGNED_LABEL};
pub use protocol::api::{
    BatchStatus, BatchUpdateRequest, BatchUpdateResponse, CreateRoomRequest, DevicePlacement,
    DeviceUpdateRequest, RoomNameRequest, RoomOrderRequest, StatusResponse,
};
pub use protocol::events::ServerEvent;
