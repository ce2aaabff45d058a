//! homepanel-board library crate.
//!
//! A headless client for the smart-home control panel's device/room board.
//! It owns the edit-mode workflow: buffering drag-and-drop changes, saving
//! them in as few requests as possible, and re-syncing from the backend's
//! realtime channel.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! gesture layer (DragEvent)
//!         ↓
//! [homepanel-board]
//!   ├── domain/           PanelConfig
//!   ├── application/      EditSessionManager, persistence strategies,
//!   │                     confirm gate, room admin, TOML edit plans,
//!   │                     PanelApi port
//!   └── infrastructure/
//!         ├── http_api/   reqwest implementation of PanelApi
//!         ├── realtime/   WebSocket subscriber (tokio-tungstenite)
//!         ├── csrf/       CSRF token sources
//!         ├── config_file/ TOML persistence of PanelConfig
//!         └── mock/       recording PanelApi for tests
//!         ↓
//! smart-home backend (REST + realtime push)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `homepanel-core` and the [`PanelApi`]
//!   trait only; it never names reqwest or tungstenite.
//! - `infrastructure` depends on everything else.
//!
//! [`PanelApi`]: application::api::PanelApi

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: edit sessions, persistence, room administration.
pub mod application;

/// Infrastructure layer: HTTP, WebSocket, CSRF and config file adapters.
pub mod infrastructure;
