//! In-memory recording [`PanelApi`] for tests.
//!
//! `mockall`'s generated `MockPanelApi` is great for call-count expectations
//! inside one module, but scenario tests want a backend that serves data,
//! fails on demand and lets them inspect every request afterwards.
//! [`RecordingPanelApi`] does exactly that:
//!
//! ```ignore
//! let api = Arc::new(RecordingPanelApi::new().with_batch_mode(BatchMode::ErrorStatus));
//! let manager = EditSessionManager::with_board(api.clone(), board);
//! // ... drops, save ...
//! assert_eq!(api.count(|c| matches!(c, ApiCall::UpdateDevice { .. })), 3);
//! ```
//!
//! # Pausing a save
//!
//! [`RecordingPanelApi::with_batch_gate`] makes the batch call wait on a
//! `tokio::sync::Notify` after recording itself, so a test can observe the
//! manager while a save is in flight.  [`RecordingPanelApi::with_read_gate`]
//! does the same for `fetch_rooms`, which holds a reload open.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use homepanel_core::{
    BatchStatus, BatchUpdateRequest, BatchUpdateResponse, Device, DeviceId, DeviceKind,
    DeviceUpdateRequest, Room, RoomKey, RoomOrderRequest,
};

use crate::application::api::{ApiError, PanelApi};

/// One request received by the recording backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    FetchRooms,
    FetchDevices(DeviceKind),
    SaveRoomOrder(RoomOrderRequest),
    BatchUpdate(BatchUpdateRequest),
    UpdateDevice {
        kind: DeviceKind,
        id: DeviceId,
        request: DeviceUpdateRequest,
    },
    CreateRoom(String),
    RenameRoom { room: RoomKey, name: String },
    DeleteRoom(RoomKey),
}

impl ApiCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::FetchRooms | Self::FetchDevices(_))
    }
}

/// How the batch endpoint answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
    #[default]
    Accept,
    /// 2xx with `"status": "error"`.
    ErrorStatus,
    /// Connection failure.
    Transport,
}

/// A scriptable backend that records every call.
#[derive(Default)]
pub struct RecordingPanelApi {
    pub calls: Mutex<Vec<ApiCall>>,
    pub rooms: Mutex<Vec<Room>>,
    pub lights: Mutex<Vec<Device>>,
    pub thermostats: Mutex<Vec<Device>>,
    pub batch_mode: BatchMode,
    /// Devices whose individual update fails.
    pub failing_devices: Vec<DeviceId>,
    pub fail_room_order: bool,
    pub fail_reads: bool,
    batch_gate: Option<Arc<Notify>>,
    read_gate: Option<Arc<Notify>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingPanelApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rooms(self, rooms: Vec<Room>) -> Self {
        *lock(&self.rooms) = rooms;
        self
    }

    /// Serves `devices`, split by kind.
    pub fn with_devices(self, devices: Vec<Device>) -> Self {
        let (lights, thermostats): (Vec<Device>, Vec<Device>) = devices
            .into_iter()
            .partition(|d| d.kind == DeviceKind::Light);
        *lock(&self.lights) = lights;
        *lock(&self.thermostats) = thermostats;
        self
    }

    pub fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    pub fn with_failing_device(mut self, id: impl Into<DeviceId>) -> Self {
        self.failing_devices.push(id.into());
        self
    }

    pub fn with_room_order_failure(mut self) -> Self {
        self.fail_room_order = true;
        self
    }

    pub fn with_read_failure(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// The batch call waits for one `notify_one()` on `gate`.
    pub fn with_batch_gate(mut self, gate: Arc<Notify>) -> Self {
        self.batch_gate = Some(gate);
        self
    }

    /// `fetch_rooms` waits for one `notify_one()` on `gate`.
    pub fn with_read_gate(mut self, gate: Arc<Notify>) -> Self {
        self.read_gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        lock(&self.calls).clone()
    }

    pub fn writes(&self) -> Vec<ApiCall> {
        self.calls().into_iter().filter(ApiCall::is_write).collect()
    }

    pub fn count(&self, pred: impl Fn(&ApiCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: ApiCall) {
        lock(&self.calls).push(call);
    }

    fn read_result<T>(&self, value: T) -> Result<T, ApiError> {
        if self.fail_reads {
            Err(ApiError::Transport("connection refused".to_string()))
        } else {
            Ok(value)
        }
    }
}

#[async_trait]
impl PanelApi for RecordingPanelApi {
    async fn fetch_rooms(&self) -> Result<Vec<Room>, ApiError> {
        self.record(ApiCall::FetchRooms);
        if let Some(gate) = &self.read_gate {
            gate.notified().await;
        }
        self.read_result(lock(&self.rooms).clone())
    }

    async fn fetch_devices(&self, kind: DeviceKind) -> Result<Vec<Device>, ApiError> {
        self.record(ApiCall::FetchDevices(kind));
        let devices = match kind {
            DeviceKind::Light => lock(&self.lights).clone(),
            DeviceKind::Thermostat => lock(&self.thermostats).clone(),
        };
        self.read_result(devices)
    }

    async fn save_room_order(&self, request: &RoomOrderRequest) -> Result<(), ApiError> {
        self.record(ApiCall::SaveRoomOrder(request.clone()));
        if self.fail_room_order {
            return Err(ApiError::Status {
                status: 500,
                body: "room order failed".to_string(),
            });
        }
        Ok(())
    }

    async fn batch_update_devices(
        &self,
        request: &BatchUpdateRequest,
    ) -> Result<BatchUpdateResponse, ApiError> {
        self.record(ApiCall::BatchUpdate(request.clone()));
        if let Some(gate) = &self.batch_gate {
            gate.notified().await;
        }
        let status = match self.batch_mode {
            BatchMode::Accept => BatchStatus::Success,
            BatchMode::ErrorStatus => BatchStatus::Error,
            BatchMode::Transport => {
                return Err(ApiError::Transport("connection reset".to_string()))
            }
        };
        Ok(BatchUpdateResponse {
            status,
            updated: Some(request.devices.len() as u32),
            total: Some(request.devices.len() as u32),
            failed: Vec::new(),
            message: None,
        })
    }

    async fn update_device(
        &self,
        kind: DeviceKind,
        id: &DeviceId,
        request: &DeviceUpdateRequest,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::UpdateDevice {
            kind,
            id: id.clone(),
            request: request.clone(),
        });
        if self.failing_devices.contains(id) {
            return Err(ApiError::Status {
                status: 404,
                body: format!("device {id} not found"),
            });
        }
        Ok(())
    }

    async fn create_room(&self, name: &str) -> Result<(), ApiError> {
        self.record(ApiCall::CreateRoom(name.to_string()));
        Ok(())
    }

    async fn rename_room(&self, room: &RoomKey, name: &str) -> Result<(), ApiError> {
        self.record(ApiCall::RenameRoom {
            room: room.clone(),
            name: name.to_string(),
        });
        Ok(())
    }

    async fn delete_room(&self, room: &RoomKey) -> Result<(), ApiError> {
        self.record(ApiCall::DeleteRoom(room.clone()));
        lock(&self.rooms).retain(|r| !r.matches(room));
        Ok(())
    }
}
