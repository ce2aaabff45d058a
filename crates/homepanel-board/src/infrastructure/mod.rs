//! Infrastructure layer for the board client.
//!
//! Contains the I/O adapters: the reqwest backend client, the realtime
//! WebSocket subscriber, CSRF token resolution, config file storage, and a
//! recording backend for tests.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `homepanel_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod config_file;
pub mod csrf;
pub mod http_api;
pub mod mock;
pub mod realtime;
