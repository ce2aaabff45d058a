//! Application layer use cases for the board client.
//!
//! # What is the "application" layer? (for beginners)
//!
//! Use cases in this layer orchestrate domain objects to fulfil a user goal,
//! and depend on abstractions (the [`api::PanelApi`] trait) rather than on
//! concrete HTTP clients, so every use case is testable without a backend.
//!
//! # Sub-modules
//!
//! - **`api`**          – The backend port: the REST operations the board
//!   needs, as an async trait, plus [`api::ApiError`].
//!
//! - **`edit_session`** – The Edit-Session Manager: edit mode, the pending
//!   change buffer, save and cancel.
//!
//! - **`persistence`**  – Interchangeable strategies for writing device
//!   placements (one batch request, or one request per device) with
//!   automatic fallback.
//!
//! - **`confirm`**      – The two-step "click to arm, click again to confirm"
//!   gate for destructive actions.
//!
//! - **`room_admin`**   – Create, rename and delete rooms.
//!
//! - **`plan`**         – Scripted edit sessions (a TOML list of drops).

pub mod api;
pub mod confirm;
pub mod edit_session;
pub mod persistence;
pub mod plan;
pub mod room_admin;

pub use api::{fetch_board, ApiError, PanelApi};
pub use confirm::{ConfirmGate, ConfirmState};
pub use edit_session::{
    Affordances, DragEffect, DragEvent, EditError, EditSessionManager, SaveOutcome, SaveReport,
    StepStatus,
};
pub use persistence::{
    persist_with_fallback, BatchStrategy, OneByOneStrategy, PersistError, PersistReport,
    PlacementStrategy,
};
pub use plan::EditPlan;
pub use room_admin::{AdminError, AdminOutcome, RoomAdmin};
