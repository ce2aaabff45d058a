//! Room administration: create, rename, delete.
//!
//! Rename and delete are destructive enough to sit behind a [`ConfirmGate`]:
//! the first request arms the action, a repeat within the window runs it.
//! The Unassigned column is not a room and cannot be renamed or deleted.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use homepanel_core::{ColumnKey, RoomKey};

use super::api::{ApiError, PanelApi};
use super::confirm::{ConfirmGate, ConfirmState};
use super::edit_session::EditSessionManager;

#[derive(Debug, Error, PartialEq)]
pub enum AdminError {
    #[error("room name must not be empty")]
    EmptyName,

    #[error("the Unassigned column cannot be renamed or deleted")]
    FixedColumn,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Action identity for the confirm gate.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AdminAction {
    Rename { room: RoomKey, name: String },
    Delete(RoomKey),
}

/// Result of a gated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    /// First press; repeat before `expires_at` to go ahead.
    Armed { expires_at: Instant },
    /// The backend accepted the change.
    Done,
    /// Nothing to do (rename to the current name).
    Unchanged,
}

pub struct RoomAdmin {
    api: Arc<dyn PanelApi>,
    sessions: Arc<EditSessionManager>,
    gate: Mutex<ConfirmGate<AdminAction>>,
}

impl RoomAdmin {
    pub fn new(
        api: Arc<dyn PanelApi>,
        sessions: Arc<EditSessionManager>,
        confirm_window: Duration,
    ) -> Self {
        Self {
            api,
            sessions,
            gate: Mutex::new(ConfirmGate::new(confirm_window)),
        }
    }

    fn press(&self, action: AdminAction, now: Instant) -> ConfirmState {
        self.gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .press(action, now)
    }

    /// Creates a room.  Not gated.
    ///
    /// # Errors
    ///
    /// [`AdminError::EmptyName`] for a blank name, [`AdminError::Api`] when
    /// the backend refuses.
    pub async fn create_room(&self, name: &str) -> Result<(), AdminError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AdminError::EmptyName);
        }
        self.api.create_room(name).await?;
        info!(room = name, "room created");
        Ok(())
    }

    /// Renames a room once confirmed.
    ///
    /// # Errors
    ///
    /// [`AdminError::FixedColumn`] for Unassigned, [`AdminError::EmptyName`]
    /// for a blank name, [`AdminError::Api`] when the backend refuses.
    pub async fn request_rename(
        &self,
        column: &ColumnKey,
        new_name: &str,
        now: Instant,
    ) -> Result<AdminOutcome, AdminError> {
        let ColumnKey::Room(room) = column else {
            return Err(AdminError::FixedColumn);
        };
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(AdminError::EmptyName);
        }
        let current = self
            .sessions
            .board()
            .rooms()
            .find(|r| r.matches(room))
            .map(|r| r.name.clone());
        if current.as_deref() == Some(new_name) {
            return Ok(AdminOutcome::Unchanged);
        }

        let action = AdminAction::Rename {
            room: room.clone(),
            name: new_name.to_string(),
        };
        match self.press(action, now) {
            ConfirmState::Armed { expires_at } => Ok(AdminOutcome::Armed { expires_at }),
            ConfirmState::Confirmed => {
                self.api.rename_room(room, new_name).await.map_err(|e| {
                    warn!(room = %room, "rename failed: {e}");
                    e
                })?;
                info!(room = %room, name = new_name, "room renamed");
                Ok(AdminOutcome::Done)
            }
        }
    }

    /// Deletes a room once confirmed.  Its devices fall back to Unassigned and
    /// it is dropped from any pending column order.
    ///
    /// # Errors
    ///
    /// [`AdminError::FixedColumn`] for Unassigned, [`AdminError::Api`] when
    /// the backend refuses.
    pub async fn request_delete(
        &self,
        column: &ColumnKey,
        now: Instant,
    ) -> Result<AdminOutcome, AdminError> {
        let ColumnKey::Room(room) = column else {
            return Err(AdminError::FixedColumn);
        };
        match self.press(AdminAction::Delete(room.clone()), now) {
            ConfirmState::Armed { expires_at } => Ok(AdminOutcome::Armed { expires_at }),
            ConfirmState::Confirmed => {
                self.api.delete_room(room).await.map_err(|e| {
                    warn!(room = %room, "delete failed: {e}");
                    e
                })?;
                self.sessions.forget_room(room);
                info!(room = %room, "room deleted");
                Ok(AdminOutcome::Done)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
