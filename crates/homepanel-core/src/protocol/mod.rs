//! Wire types exchanged with the smart-home backend.
//!
//! - **`api`** – JSON bodies of the REST endpoints the board writes to.
//! - **`events`** – Realtime push notifications broadcast to every client.
//!
//! Both are plain `serde` structs: the HTTP and WebSocket plumbing lives in
//! `homepanel-board`.

pub mod api;
pub mod events;
