//! Integration tests for the edit-session workflow.
//!
//! These tests drive `EditSessionManager` end-to-end against the recording
//! backend: drops, save with batch/fallback persistence, cancel, realtime
//! events arriving mid-session.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

use homepanel_board::application::{
    fetch_board, EditError, EditSessionManager, SaveOutcome, SaveReport, StepStatus,
};
use homepanel_board::infrastructure::mock::{ApiCall, BatchMode, RecordingPanelApi};
use homepanel_core::{
    ColumnKey, Device, DeviceId, DeviceKind, Room, RoomId, RoomKey, ServerEvent,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn rooms() -> Vec<Room> {
    vec![
        Room::new("a", "Room A"),
        Room::new("b", "Room B"),
        Room::new("c", "Room C"),
    ]
}

fn devices() -> Vec<Device> {
    let placed = |id: &str, kind, room: &str, order| {
        let mut d = Device::new(id, id.to_uppercase(), kind);
        d.room_id = Some(room.into());
        d.display_order = Some(order);
        d
    };
    vec![
        placed("l1", DeviceKind::Light, "a", 0),
        placed("l2", DeviceKind::Light, "a", 1),
        placed("l3", DeviceKind::Light, "b", 0),
        placed("t1", DeviceKind::Thermostat, "a", 0),
    ]
}

fn backend() -> RecordingPanelApi {
    RecordingPanelApi::new()
        .with_rooms(rooms())
        .with_devices(devices())
}

async fn manager(api: Arc<RecordingPanelApi>) -> Arc<EditSessionManager> {
    let board = fetch_board(api.as_ref()).await.expect("fixture board loads");
    // Only what the session itself sends matters below.
    api.calls.lock().unwrap().clear();
    Arc::new(EditSessionManager::with_board(api, board))
}

/// A manager whose board was loaded from a healthy backend but which talks
/// to `api` from now on.
async fn manager_over(api: Arc<RecordingPanelApi>) -> Arc<EditSessionManager> {
    let board = fetch_board(&backend()).await.expect("fixture board loads");
    Arc::new(EditSessionManager::with_board(api, board))
}

fn room(id: &str) -> ColumnKey {
    ColumnKey::Room(RoomKey::Id(id.into()))
}

fn completed(outcome: SaveOutcome) -> SaveReport {
    match outcome {
        SaveOutcome::Completed(report) => report,
        other => panic!("expected a completed save, got {other:?}"),
    }
}

fn batches(api: &RecordingPanelApi) -> Vec<homepanel_core::BatchUpdateRequest> {
    api.calls()
        .into_iter()
        .filter_map(|c| match c {
            ApiCall::BatchUpdate(req) => Some(req),
            _ => None,
        })
        .collect()
}

// ── Save ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_device_dragged_twice_is_saved_once_with_final_room() {
    // Arrange
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());

    // Act: L1 from Room A to Room B, then to Room C
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("b"), 0));
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("c"), 0));
    let report = completed(mgr.save().await);

    // Assert
    let batches = batches(&api);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].devices.len(), 1);
    let entry = &batches[0].devices[0];
    assert_eq!(entry.id, DeviceId::new("l1"));
    assert_eq!(entry.room_id, Some(RoomId::new("c")));
    assert_eq!(entry.display_order, 0);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_save_ends_session_and_clears_buffer() {
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_device_drop(&"l3".into(), &ColumnKey::Unassigned, 0));

    completed(mgr.save().await);

    assert!(!mgr.is_edit_mode_active());
    assert!(mgr.pending().is_none());
    assert!(mgr.affordances().edit_entry_visible);
    // No local re-fetch: the backend broadcast does that.
    assert!(!api.calls().iter().any(|c| !c.is_write()));
}

#[tokio::test]
async fn test_thermostat_position_counts_only_thermostats() {
    // Arrange: Room A holds two lights before t1
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());

    // Act: t1 dropped at the very end of Room B (after l3)
    let mv = mgr.record_device_drop(&"t1".into(), &room("b"), 10).unwrap();

    // Assert
    assert_eq!(mv.kind, DeviceKind::Thermostat);
    assert_eq!(mv.position, 0);
}

#[tokio::test]
async fn test_column_reorder_is_saved_before_device_moves() {
    // Arrange
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());

    // Act: Room C dragged to the front, then a device move
    assert_ok!(mgr.record_column_drop(&RoomKey::Id("c".into()), 0));
    assert_ok!(mgr.record_device_drop(&"l2".into(), &room("c"), 0));
    let report = completed(mgr.save().await);

    // Assert
    let writes = api.writes();
    assert_eq!(writes.len(), 2);
    let ApiCall::SaveRoomOrder(order) = &writes[0] else {
        panic!("room order must be written first, got {:?}", writes[0]);
    };
    assert_eq!(order.room_ids, vec!["c", "a", "b"]);
    assert!(matches!(writes[1], ApiCall::BatchUpdate(_)));
    assert_eq!(report.room_order, StepStatus::Saved);
}

#[tokio::test]
async fn test_column_only_session_sends_no_device_request() {
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_column_drop(&RoomKey::Id("a".into()), 2));

    let report = completed(mgr.save().await);

    assert_eq!(api.writes().len(), 1);
    assert!(report.devices.is_none());
}

#[tokio::test]
async fn test_empty_session_sends_nothing() {
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());

    completed(mgr.save().await);

    assert!(api.calls().is_empty());
    assert!(!mgr.is_edit_mode_active());
}

// ── Fallback ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_failure_falls_back_to_one_request_per_device() {
    // Arrange: the batch endpoint answers with an error status
    let api = Arc::new(backend().with_batch_mode(BatchMode::ErrorStatus));
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("c"), 0));
    assert_ok!(mgr.record_device_drop(&"l3".into(), &room("c"), 0));
    assert_ok!(mgr.record_device_drop(&"t1".into(), &room("b"), 0));

    // Act
    let report = completed(mgr.save().await);

    // Assert
    let individual = api.count(|c| matches!(c, ApiCall::UpdateDevice { .. }));
    assert_eq!(individual, 3);
    let devices = report.devices.expect("device step ran");
    assert!(devices.fell_back);
    assert!(devices.failed.is_empty());
    // Thermostats go to their own collection.
    assert_eq!(
        api.count(|c| matches!(
            c,
            ApiCall::UpdateDevice { kind: DeviceKind::Thermostat, .. }
        )),
        1
    );
}

#[tokio::test]
async fn test_fallback_failures_are_independent() {
    let api = Arc::new(
        backend()
            .with_batch_mode(BatchMode::Transport)
            .with_failing_device("l3"),
    );
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("b"), 0));
    assert_ok!(mgr.record_device_drop(&"l3".into(), &room("c"), 0));
    assert_ok!(mgr.record_device_drop(&"l2".into(), &room("c"), 0));

    let report = completed(mgr.save().await);

    assert_eq!(api.count(|c| matches!(c, ApiCall::UpdateDevice { .. })), 3);
    let devices = report.devices.as_ref().unwrap();
    assert_eq!(devices.failed, vec![DeviceId::new("l3")]);
    assert!(!report.notices().is_empty());
    // The session ends regardless.
    assert!(!mgr.is_edit_mode_active());
}

#[tokio::test]
async fn test_room_order_failure_still_saves_devices() {
    let api = Arc::new(backend().with_room_order_failure());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_column_drop(&RoomKey::Id("b".into()), 0));
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("b"), 0));

    let report = completed(mgr.save().await);

    assert!(matches!(report.room_order, StepStatus::Failed(_)));
    assert_eq!(batches(&api).len(), 1);
    assert!(!mgr.is_edit_mode_active());
}

// ── Concurrency ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_second_save_while_in_flight_is_a_no_op() {
    // Arrange: the batch request blocks until released
    let gate = Arc::new(Notify::new());
    let api = Arc::new(backend().with_batch_gate(gate.clone()));
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("b"), 0));

    let first = tokio::spawn({
        let mgr = mgr.clone();
        async move { mgr.save().await }
    });
    while !mgr.is_save_in_flight() {
        tokio::task::yield_now().await;
    }

    // Act
    let second = mgr.save().await;
    let reenter = mgr.enter_edit_mode();
    let affordances = mgr.affordances();
    gate.notify_one();
    let first = first.await.unwrap();

    // Assert
    assert_eq!(second, SaveOutcome::AlreadyInFlight);
    assert_eq!(assert_err!(reenter), EditError::SaveInFlight);
    assert!(!affordances.controls_enabled);
    assert!(!affordances.draggable);
    assert!(matches!(first, SaveOutcome::Completed(_)));
    assert_eq!(batches(&api).len(), 1);
    assert!(!mgr.is_save_in_flight());
}

#[tokio::test]
async fn test_drops_are_refused_while_saving() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(backend().with_batch_gate(gate.clone()));
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("b"), 0));

    let save = tokio::spawn({
        let mgr = mgr.clone();
        async move { mgr.save().await }
    });
    while !mgr.is_save_in_flight() {
        tokio::task::yield_now().await;
    }

    let refused = mgr.record_device_drop(&"l2".into(), &room("c"), 0);
    gate.notify_one();
    save.await.unwrap();

    assert_eq!(refused.unwrap_err(), EditError::SaveInFlight);
    assert!(!mgr.can_drag());
}

// ── Cancel ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_reloads_without_writing() {
    // Arrange
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    let before = mgr.board();
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_column_drop(&RoomKey::Id("c".into()), 0));
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("c"), 0));
    assert_ne!(mgr.board(), before);

    // Act
    assert_ok!(mgr.cancel().await);

    // Assert
    assert!(api.writes().is_empty());
    assert_eq!(api.count(|c| matches!(c, ApiCall::FetchRooms)), 1);
    assert_eq!(api.count(|c| matches!(c, ApiCall::FetchDevices(_))), 2);
    assert!(!mgr.is_edit_mode_active());
    assert_eq!(mgr.board(), before);
}

#[tokio::test]
async fn test_cancel_with_unreachable_backend_discards_moves() {
    // Arrange
    let api = Arc::new(backend().with_read_failure());
    let mgr = manager_over(api.clone()).await;
    let before = mgr.board();
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("c"), 0));

    // Act
    let result = mgr.cancel().await;

    // Assert
    assert!(matches!(assert_err!(result), EditError::Reload(_)));
    assert_eq!(mgr.board(), before);
    let placement = mgr.board().placement(&"l1".into()).unwrap();
    assert_eq!(placement.room.unwrap().name, "Room A");
    assert!(api.writes().is_empty());
}

#[tokio::test]
async fn test_new_session_during_cancel_reload_starts_from_restored_board() {
    // Arrange: the reload triggered by cancel blocks on fetch_rooms
    let gate = Arc::new(Notify::new());
    let api = Arc::new(backend().with_read_gate(gate.clone()));
    let mgr = manager_over(api.clone()).await;
    let before = mgr.board();
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("c"), 0));

    let cancel = tokio::spawn({
        let mgr = mgr.clone();
        async move { mgr.cancel().await }
    });
    while api.count(|c| matches!(c, ApiCall::FetchRooms)) == 0 {
        tokio::task::yield_now().await;
    }

    // Act: edit mode re-entered before the reload answers
    assert_ok!(mgr.enter_edit_mode());
    let fresh = mgr.board();
    gate.notify_one();
    assert_ok!(cancel.await.unwrap());

    // Assert
    assert_eq!(fresh, before);
    assert!(mgr.is_edit_mode_active());
    let mv = mgr.record_device_drop(&"l2".into(), &room("c"), 0).unwrap();
    assert_eq!(mv.position, 0);
    assert_eq!(mgr.board().column(&room("c")).unwrap().devices().len(), 1);
}

#[tokio::test]
async fn test_cancel_then_save_sends_nothing() {
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("c"), 0));
    assert_ok!(mgr.cancel().await);

    assert_eq!(mgr.save().await, SaveOutcome::NotEditing);
    assert!(api.writes().is_empty());
}

// ── Realtime ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_move_into_room_deleted_elsewhere_is_rejected() {
    // Arrange
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_device_drop(&"l1".into(), &room("c"), 0));
    assert_ok!(mgr.record_device_drop(&"l3".into(), &room("a"), 0));

    // Act: another client removes Room C mid-session
    mgr.apply_event(ServerEvent::UpdateRooms(vec![
        Room::new("a", "Room A"),
        Room::new("b", "Room B"),
    ]));
    let report = completed(mgr.save().await);

    // Assert: only the move into a live room is sent
    assert_eq!(report.rejected_moves, vec![DeviceId::new("l1")]);
    let batches = batches(&api);
    assert_eq!(batches[0].devices.len(), 1);
    assert_eq!(batches[0].devices[0].id, DeviceId::new("l3"));
}

#[tokio::test]
async fn test_column_order_drops_deleted_rooms() {
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_column_drop(&RoomKey::Id("c".into()), 0));

    mgr.apply_event(ServerEvent::UpdateRooms(vec![
        Room::new("a", "Room A"),
        Room::new("c", "Room C"),
    ]));
    let report = completed(mgr.save().await);

    let ApiCall::SaveRoomOrder(order) = &api.writes()[0] else {
        panic!("expected a room order write");
    };
    assert_eq!(order.room_ids, vec!["c", "a"]);
    assert_eq!(report.dropped_columns.len(), 1);
    assert_eq!(report.dropped_columns[0].name, "Room B");
}

#[tokio::test]
async fn test_events_during_session_apply_after_save() {
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());

    let mut renamed = Device::new("l3", "Desk Lamp", DeviceKind::Light);
    renamed.room_id = Some("b".into());
    mgr.apply_event(ServerEvent::UpdateButtons(vec![renamed]));
    // Not yet: the optimistic board stays put while editing.
    assert_eq!(mgr.board().device(&"l3".into()).unwrap().name, "L3");

    completed(mgr.save().await);

    let board = mgr.board();
    assert_eq!(board.device(&"l3".into()).unwrap().name, "Desk Lamp");
    assert!(board.device(&"l1".into()).is_none());
    // Thermostats were untouched by a buttons event.
    assert!(board.device(&"t1".into()).is_some());
}

#[tokio::test]
async fn test_room_deleted_during_session_leaves_pending_order() {
    let api = Arc::new(backend());
    let mgr = manager(api.clone()).await;
    assert_ok!(mgr.enter_edit_mode());
    assert_ok!(mgr.record_column_drop(&RoomKey::Id("c".into()), 0));

    mgr.forget_room(&RoomKey::Id("a".into()));

    let pending = mgr.pending().unwrap();
    let ids: Vec<_> = pending
        .column_order()
        .unwrap()
        .iter()
        .map(|e| e.identifier().to_string())
        .collect();
    assert_eq!(ids, vec!["c", "b"]);
    // Room A's devices fell back to Unassigned.
    let board = mgr.board();
    assert_eq!(board.columns()[0].devices().len(), 3);
}
