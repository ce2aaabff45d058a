//! EditSessionManager: edit mode, pending changes, save and cancel.
//!
//! The manager owns the board view model and, while edit mode is active, one
//! [`EditSession`] holding the [`PendingChangeSet`].  Drag handlers feed it
//! [`DragEvent`]s; the save path turns the buffer into as few requests as
//! possible.
//!
//! # Session lifecycle (for beginners)
//!
//! ```text
//!            enter_edit_mode()             save()
//!   Idle ───────────────────────► Editing ───────► Saving ──┐
//!    ▲                               │                       │
//!    │          cancel()             │                       │
//!    ├───────────────────────────────┘                       │
//!    └───────────────── session always ends ─────────────────┘
//! ```
//!
//! - `Idle`: realtime events re-render the board directly.
//! - `Editing`: drops mutate the board optimistically and are buffered.
//!   Realtime events are deferred until the session ends.
//! - `Saving`: one save is in flight.  A second `save()` or an
//!   `enter_edit_mode()` is rejected, not queued.
//!
//! # Why no re-fetch after save?
//!
//! Every successful write makes the backend broadcast the new authoritative
//! state on the realtime channel.  Re-fetching locally as well would race that
//! broadcast, so the manager simply ends the session and lets the events
//! arrive.  `cancel()` is different: nothing was written, so nothing will be
//! broadcast.  The board the session started from is restored on the spot,
//! then a full read refreshes it.  Reloads are numbered; a result older than
//! one already applied is dropped, and one landing inside a later session
//! becomes that session's baseline.
//!
//! # Locking
//!
//! State sits behind a `std::sync::Mutex` that is never held across an
//! `.await`; the save path takes what it needs, releases the lock, and comes
//! back to finish.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use homepanel_core::{
    Board, BoardError, ColumnEntry, ColumnKey, Device, DeviceId, DeviceKind, DeviceMove,
    PendingChangeSet, Room, RoomKey, ServerEvent, UNASSIGNED_LABEL,
};

use super::api::{fetch_board, ApiError, PanelApi};
use super::persistence::{
    persist_with_fallback, BatchStrategy, OneByOneStrategy, PersistReport, PlacementStrategy,
};

/// Errors returned by edit-mode operations.
#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("cannot enter edit mode while saving")]
    SaveInFlight,

    #[error("edit mode is not active")]
    NotEditing,

    #[error(transparent)]
    Board(#[from] BoardError),

    /// The session ended, but reloading server state afterwards failed.
    #[error("reload after cancel failed: {0}")]
    Reload(#[source] ApiError),
}

/// A gesture completed by the drag-and-drop layer.
///
/// Any gesture source (a drag library or a native-events fallback) produces
/// the same events, so the manager never cares which one is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    /// A device was dropped at `index` among all devices of `target`.
    DeviceDropped {
        device_id: DeviceId,
        target: ColumnKey,
        index: usize,
    },
    /// A room column was dropped at `index` among the reorderable columns.
    ColumnDropped { room: RoomKey, index: usize },
    /// The gesture was abandoned; nothing moved.
    Cancelled,
}

/// What a [`DragEvent`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEffect {
    DeviceMoved(DeviceMove),
    ColumnsReordered(Vec<ColumnEntry>),
    Ignored,
}

/// Which controls the view should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    /// Devices and room columns can be dragged.
    pub draggable: bool,
    /// The "edit" entry control is shown.
    pub edit_entry_visible: bool,
    /// The "save" and "cancel" controls are shown.
    pub save_cancel_visible: bool,
    /// Controls accept input (false while a save is in flight).
    pub controls_enabled: bool,
}

/// Status of the room-order step of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Skipped,
    Saved,
    Failed(String),
}

/// Everything that happened during one save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub session_id: Uuid,
    pub room_order: StepStatus,
    /// `None` when there were no device moves to write.
    pub devices: Option<PersistReport>,
    /// Moves not sent because their target room no longer exists.
    pub rejected_moves: Vec<DeviceId>,
    /// Column-order entries dropped because the room no longer exists.
    pub dropped_columns: Vec<ColumnEntry>,
}

impl SaveReport {
    /// `true` when every write went through and nothing was rejected.
    pub fn is_clean(&self) -> bool {
        !matches!(self.room_order, StepStatus::Failed(_))
            && self.devices.as_ref().map_or(true, |d| d.failed.is_empty())
            && self.rejected_moves.is_empty()
            && self.dropped_columns.is_empty()
    }

    /// Short, user-facing messages for a transient notification.
    pub fn notices(&self) -> Vec<String> {
        let mut notices = Vec::new();
        if let StepStatus::Failed(e) = &self.room_order {
            notices.push(format!("Room order was not saved: {e}"));
        }
        if let Some(devices) = &self.devices {
            if devices.failed.is_empty() {
                notices.push(format!("Saved {} device placement(s)", devices.attempted));
            } else {
                notices.push(format!(
                    "{} of {} device placement(s) were not saved",
                    devices.failed.len(),
                    devices.attempted
                ));
            }
        }
        if !self.rejected_moves.is_empty() {
            notices.push(format!(
                "{} move(s) skipped: target room was removed",
                self.rejected_moves.len()
            ));
        }
        notices
    }
}

/// Result of [`EditSessionManager::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Completed(SaveReport),
    /// Another save is running; nothing was done.
    AlreadyInFlight,
    /// Edit mode was not active; nothing was done.
    NotEditing,
}

/// One edit-mode session.
#[derive(Debug)]
struct EditSession {
    id: Uuid,
    pending: PendingChangeSet,
    /// The board as it was before the first drop; restored on cancel.
    baseline: Board,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Editing(EditSession),
    Saving { session_id: Uuid },
}

/// Realtime state received while a session was active.
#[derive(Debug, Default)]
struct Deferred {
    rooms: Option<Vec<Room>>,
    lights: Option<Vec<Device>>,
    thermostats: Option<Vec<Device>>,
}

impl Deferred {
    fn from_board(board: &Board) -> Self {
        Self {
            rooms: Some(board.rooms().cloned().collect()),
            lights: Some(devices_of(board, DeviceKind::Light)),
            thermostats: Some(devices_of(board, DeviceKind::Thermostat)),
        }
    }
}

#[derive(Debug)]
struct State {
    phase: Phase,
    board: Board,
    deferred: Deferred,
    /// Sequence number handed to the latest reload.
    reloads_issued: u64,
    /// Sequence number of the newest reload whose result was kept.
    reloads_applied: u64,
}

impl State {
    /// Whether `key` still names a room the backend knows about.
    fn is_live(&self, key: &RoomKey) -> bool {
        match &self.deferred.rooms {
            Some(rooms) => rooms.iter().any(|r| r.matches(key)),
            None => self.board.has_room(key),
        }
    }

    fn apply_deferred(&mut self) {
        let deferred = std::mem::take(&mut self.deferred);
        if let Some(rooms) = deferred.rooms {
            self.board.replace_rooms(rooms);
        }
        if let Some(lights) = deferred.lights {
            self.board.replace_devices(DeviceKind::Light, lights);
        }
        if let Some(thermostats) = deferred.thermostats {
            self.board.replace_devices(DeviceKind::Thermostat, thermostats);
        }
    }
}

fn session_mut(phase: &mut Phase) -> Result<&mut EditSession, EditError> {
    match phase {
        Phase::Editing(session) => Ok(session),
        Phase::Saving { .. } => Err(EditError::SaveInFlight),
        Phase::Idle => Err(EditError::NotEditing),
    }
}

/// The Edit-Session Manager.
///
/// Cheap to share: wrap it in an `Arc` and call it from any task.
pub struct EditSessionManager {
    api: Arc<dyn PanelApi>,
    state: Mutex<State>,
}

impl EditSessionManager {
    /// Creates a manager with an empty board.  Call [`Self::reload`] to fill it.
    pub fn new(api: Arc<dyn PanelApi>) -> Self {
        Self::with_board(api, Board::new())
    }

    pub fn with_board(api: Arc<dyn PanelApi>, board: Board) -> Self {
        Self {
            api,
            state: Mutex::new(State {
                phase: Phase::Idle,
                board,
                deferred: Deferred::default(),
                reloads_issued: 0,
                reloads_applied: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn is_edit_mode_active(&self) -> bool {
        !matches!(self.state().phase, Phase::Idle)
    }

    pub fn is_save_in_flight(&self) -> bool {
        matches!(self.state().phase, Phase::Saving { .. })
    }

    /// Snapshot of the pending buffer, `None` outside an editing session.
    pub fn pending(&self) -> Option<PendingChangeSet> {
        match &self.state().phase {
            Phase::Editing(s) => Some(s.pending.clone()),
            _ => None,
        }
    }

    /// Snapshot of the board as currently rendered.
    pub fn board(&self) -> Board {
        self.state().board.clone()
    }

    /// Drags are honoured only while editing.
    pub fn can_drag(&self) -> bool {
        matches!(self.state().phase, Phase::Editing(_))
    }

    pub fn affordances(&self) -> Affordances {
        match self.state().phase {
            Phase::Idle => Affordances {
                draggable: false,
                edit_entry_visible: true,
                save_cancel_visible: false,
                controls_enabled: true,
            },
            Phase::Editing(_) => Affordances {
                draggable: true,
                edit_entry_visible: false,
                save_cancel_visible: true,
                controls_enabled: true,
            },
            Phase::Saving { .. } => Affordances {
                draggable: false,
                edit_entry_visible: false,
                save_cancel_visible: true,
                controls_enabled: false,
            },
        }
    }

    // ── Edit mode ─────────────────────────────────────────────────────────────

    /// Starts a new session with an empty buffer.
    ///
    /// Entering while already editing restarts the session: the buffer is
    /// discarded and the board goes back to the previous session's baseline.
    ///
    /// # Errors
    ///
    /// [`EditError::SaveInFlight`] while a save is running.
    pub fn enter_edit_mode(&self) -> Result<Uuid, EditError> {
        let mut guard = self.state();
        let state = &mut *guard;
        if matches!(state.phase, Phase::Saving { .. }) {
            warn!("cannot enter edit mode while saving");
            return Err(EditError::SaveInFlight);
        }
        if let Phase::Editing(previous) = std::mem::replace(&mut state.phase, Phase::Idle) {
            debug!(session = %previous.id, "edit session restarted");
            state.board = previous.baseline;
        }
        let id = Uuid::new_v4();
        state.phase = Phase::Editing(EditSession {
            id,
            pending: PendingChangeSet::new(),
            baseline: state.board.clone(),
        });
        info!(session = %id, "edit mode entered");
        Ok(id)
    }

    /// Dispatches one gesture.
    ///
    /// # Errors
    ///
    /// As [`Self::record_device_drop`] and [`Self::record_column_drop`].
    pub fn handle_drag(&self, event: DragEvent) -> Result<DragEffect, EditError> {
        match event {
            DragEvent::DeviceDropped {
                device_id,
                target,
                index,
            } => self
                .record_device_drop(&device_id, &target, index)
                .map(DragEffect::DeviceMoved),
            DragEvent::ColumnDropped { room, index } => self
                .record_column_drop(&room, index)
                .map(DragEffect::ColumnsReordered),
            DragEvent::Cancelled => Ok(DragEffect::Ignored),
        }
    }

    /// Moves a device on the board and records its final placement.
    ///
    /// The per-kind position is read from the board at drop time.  Other
    /// pending moves whose position shifted because of this drop are
    /// refreshed as well.
    ///
    /// # Errors
    ///
    /// [`EditError::NotEditing`] / [`EditError::SaveInFlight`] outside an
    /// editing session, [`EditError::Board`] for unknown devices or rooms.
    pub fn record_device_drop(
        &self,
        device_id: &DeviceId,
        target: &ColumnKey,
        index: usize,
    ) -> Result<DeviceMove, EditError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let session = session_mut(&mut state.phase)?;

        let placement = state.board.move_device(device_id, target, index)?;
        let mv = DeviceMove::from(placement);
        session.pending.record_device_move(mv.clone());

        let others: Vec<DeviceId> = session
            .pending
            .device_moves()
            .filter(|m| &m.device_id != device_id)
            .map(|m| m.device_id.clone())
            .collect();
        for id in others {
            let Some(current) = state.board.placement(&id) else {
                continue;
            };
            if let Some(pending) = session.pending.device_move_mut(&id) {
                if pending.room == current.room {
                    pending.position = current.position;
                }
            }
        }

        debug!(
            session = %session.id,
            device = %mv.device_id,
            room = mv.room.as_ref().map_or(UNASSIGNED_LABEL, |r| r.name.as_str()),
            position = mv.position,
            "device move recorded"
        );
        Ok(mv)
    }

    /// Moves a room column and records the resulting full order.
    ///
    /// # Errors
    ///
    /// As [`Self::record_device_drop`].
    pub fn record_column_drop(
        &self,
        room: &RoomKey,
        index: usize,
    ) -> Result<Vec<ColumnEntry>, EditError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let session = session_mut(&mut state.phase)?;
        state.board.move_column(room, index)?;
        let order = state.board.room_order();
        session.pending.record_column_move(order.clone());
        debug!(session = %session.id, room = %room, index, "column move recorded");
        Ok(order)
    }

    /// Replaces the pending column order wholesale and mirrors it on the board.
    ///
    /// An entry without an identifier is a legacy room carried by name.  The
    /// Unassigned pseudo-column is never part of the order.
    ///
    /// # Errors
    ///
    /// [`EditError::NotEditing`] / [`EditError::SaveInFlight`] outside an
    /// editing session.
    pub fn record_column_move(&self, order: Vec<ColumnEntry>) -> Result<(), EditError> {
        let order: Vec<ColumnEntry> = order
            .into_iter()
            .filter(|e| !(e.id.is_none() && e.name == UNASSIGNED_LABEL))
            .collect();
        let mut guard = self.state();
        let state = &mut *guard;
        let session = session_mut(&mut state.phase)?;
        let keys: Vec<RoomKey> = order.iter().map(ColumnEntry::key).collect();
        state.board.apply_room_order(&keys);
        session.pending.record_column_move(order);
        Ok(())
    }

    /// Forgets a room that was deleted: drops it from the board and from the
    /// pending column order.  Its devices fall back to Unassigned.
    pub fn forget_room(&self, key: &RoomKey) {
        let mut guard = self.state();
        let state = &mut *guard;
        if let Err(e) = state.board.remove_room(key) {
            debug!("forget_room: {e}");
        }
        if let Some(rooms) = &mut state.deferred.rooms {
            rooms.retain(|r| !r.matches(key));
        }
        if let Phase::Editing(session) = &mut state.phase {
            session.pending.forget_room(key);
            let _ = session.baseline.remove_room(key);
        }
    }

    // ── Save ──────────────────────────────────────────────────────────────────

    /// Persists the pending changes and ends the session.
    ///
    /// 1. Room order, if columns were reordered (failure is logged, not fatal).
    /// 2. Device moves, batched with per-device fallback.
    /// 3. Buffer cleared, edit mode left, deferred realtime state applied.
    ///
    /// Step 3 happens whatever steps 1 and 2 did.
    pub async fn save(&self) -> SaveOutcome {
        self.save_with(&BatchStrategy, &OneByOneStrategy).await
    }

    /// [`Self::save`] with explicit placement strategies.
    pub async fn save_with(
        &self,
        primary: &dyn PlacementStrategy,
        fallback: &dyn PlacementStrategy,
    ) -> SaveOutcome {
        let (session_id, room_order, moves, rejected_moves, dropped_columns) = {
            let mut guard = self.state();
            let state = &mut *guard;
            let session_id = match &state.phase {
                Phase::Saving { .. } => {
                    debug!("save ignored: already in flight");
                    return SaveOutcome::AlreadyInFlight;
                }
                Phase::Idle => return SaveOutcome::NotEditing,
                Phase::Editing(s) => s.id,
            };
            let taken = match std::mem::replace(&mut state.phase, Phase::Saving { session_id }) {
                Phase::Editing(mut s) => s.pending.take(),
                _ => PendingChangeSet::new(),
            };
            let (order, moves) = taken.into_parts();

            let (moves, rejected): (Vec<_>, Vec<_>) = moves
                .into_iter()
                .partition(|m| m.target_key().map_or(true, |k| state.is_live(&k)));
            let (order, dropped): (Vec<_>, Vec<_>) = order
                .unwrap_or_default()
                .into_iter()
                .partition(|e| state.is_live(&e.key()));

            (
                session_id,
                order,
                moves,
                rejected.into_iter().map(|m| m.device_id).collect::<Vec<_>>(),
                dropped,
            )
        };
        let _reset = SaveGuard { manager: self };

        for id in &rejected_moves {
            warn!(session = %session_id, device = %id, "move rejected: target room no longer exists");
        }
        info!(
            session = %session_id,
            columns = room_order.len(),
            devices = moves.len(),
            "saving edit session"
        );

        let room_order_status = if room_order.is_empty() {
            StepStatus::Skipped
        } else {
            let request = homepanel_core::RoomOrderRequest::from_entries(&room_order);
            match self.api.save_room_order(&request).await {
                Ok(()) => StepStatus::Saved,
                Err(e) => {
                    warn!(session = %session_id, "room order not saved: {e}");
                    StepStatus::Failed(e.to_string())
                }
            }
        };

        let devices = if moves.is_empty() {
            None
        } else {
            Some(persist_with_fallback(self.api.as_ref(), primary, fallback, &moves).await)
        };

        let report = SaveReport {
            session_id,
            room_order: room_order_status,
            devices,
            rejected_moves,
            dropped_columns,
        };
        info!(session = %session_id, clean = report.is_clean(), "edit session saved");
        SaveOutcome::Completed(report)
    }

    // ── Cancel ────────────────────────────────────────────────────────────────

    /// Discards the buffer, leaves edit mode and reloads the board.
    ///
    /// The session's baseline board is restored before the reload starts, so
    /// the optimistic moves are gone even if the reload fails.  Realtime state
    /// deferred during the session is applied on top of it.  No write request
    /// is issued.
    ///
    /// # Errors
    ///
    /// [`EditError::NotEditing`] / [`EditError::SaveInFlight`] outside an
    /// editing session; [`EditError::Reload`] if the session ended but the
    /// reload failed.
    pub async fn cancel(&self) -> Result<(), EditError> {
        {
            let mut guard = self.state();
            let state = &mut *guard;
            session_mut(&mut state.phase)?;
            if let Phase::Editing(session) = std::mem::replace(&mut state.phase, Phase::Idle) {
                info!(
                    session = %session.id,
                    discarded = session.pending.device_moves().count(),
                    "edit session cancelled"
                );
                state.board = session.baseline;
            }
            state.apply_deferred();
        }
        self.reload().await.map_err(EditError::Reload)
    }

    // ── Server state ──────────────────────────────────────────────────────────

    /// Full read of rooms, lights and thermostats.
    ///
    /// Replaces the board when idle.  While editing, the result becomes the
    /// session's baseline and is deferred for the live board; while saving it
    /// is only deferred.  A result older than one already applied is dropped.
    ///
    /// # Errors
    ///
    /// The first [`ApiError`] among the three reads.
    pub async fn reload(&self) -> Result<(), ApiError> {
        let seq = {
            let mut state = self.state();
            state.reloads_issued += 1;
            state.reloads_issued
        };
        let board = fetch_board(self.api.as_ref()).await.map_err(|e| {
            warn!(reload = seq, "board reload failed: {e}");
            e
        })?;

        let mut guard = self.state();
        let state = &mut *guard;
        if seq < state.reloads_applied {
            debug!(reload = seq, newest = state.reloads_applied, "stale reload dropped");
            return Ok(());
        }
        state.reloads_applied = seq;
        match &mut state.phase {
            Phase::Idle => state.board = board,
            Phase::Editing(session) => {
                debug!(session = %session.id, reload = seq, "reload landed mid-session");
                state.deferred = Deferred::from_board(&board);
                session.baseline = board;
            }
            Phase::Saving { .. } => state.deferred = Deferred::from_board(&board),
        }
        Ok(())
    }

    /// Applies a realtime push event.
    ///
    /// While a session is active the event is deferred (latest per kind wins)
    /// so optimistic changes are not clobbered mid-edit.
    pub fn apply_event(&self, event: ServerEvent) {
        let mut guard = self.state();
        let state = &mut *guard;
        let idle = matches!(state.phase, Phase::Idle);
        debug!(event = event.name(), deferred = !idle, "realtime event");
        match event {
            ServerEvent::UpdateRooms(rooms) if idle => state.board.replace_rooms(rooms),
            ServerEvent::UpdateRooms(rooms) => state.deferred.rooms = Some(rooms),
            ServerEvent::UpdateButtons(devices) if idle => {
                state.board.replace_devices(DeviceKind::Light, devices)
            }
            ServerEvent::UpdateButtons(devices) => state.deferred.lights = Some(devices),
            ServerEvent::UpdateTemperatureControls(devices) if idle => {
                state.board.replace_devices(DeviceKind::Thermostat, devices)
            }
            ServerEvent::UpdateTemperatureControls(devices) => {
                state.deferred.thermostats = Some(devices)
            }
        }
    }
}

fn devices_of(board: &Board, kind: DeviceKind) -> Vec<Device> {
    board.devices().filter(|d| d.kind == kind).cloned().collect()
}

/// Ends the save on every exit path, including a dropped future.
struct SaveGuard<'a> {
    manager: &'a EditSessionManager,
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.manager.state();
        if let Phase::Saving { session_id } = state.phase {
            debug!(session = %session_id, "edit mode left");
            state.phase = Phase::Idle;
            state.apply_deferred();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
