//! Domain entities for the HomePanel board.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of a clean architecture holds the core business rules.
//! Domain code never imports HTTP clients, sockets, or UI frameworks, so it
//! compiles and tests anywhere.  Here the business rules are:
//!
//! - Devices live in exactly one column (a room, or Unassigned).
//! - Lights and thermostats are ordered independently inside a room.
//! - The Unassigned column is fixed: always first, never reordered, never deleted.
//! - One edit session keeps at most one pending move per device.

pub mod board;
pub mod device;
pub mod pending;
pub mod room;
