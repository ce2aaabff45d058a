//! The backend port.
//!
//! [`PanelApi`] lists every REST operation the board client performs.  The
//! production implementation is `infrastructure::http_api::HttpPanelApi`;
//! tests use `infrastructure::mock::RecordingPanelApi` or the `mockall`
//! generated `MockPanelApi`.

use async_trait::async_trait;
use thiserror::Error;

use homepanel_core::{
    Board, BatchUpdateRequest, BatchUpdateResponse, Device, DeviceId, DeviceKind,
    DeviceUpdateRequest, Room, RoomKey, RoomOrderRequest,
};

/// Failures talking to the backend.
///
/// Carries strings rather than transport error types so the application layer
/// stays independent of the HTTP client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (connection refused, reset, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// A 2xx response whose body reported `"status": "error"`.
    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

/// REST operations used by the board.
///
/// Every mutating call is expected to carry the CSRF token; that is the
/// implementation's concern, not the caller's.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PanelApi: Send + Sync {
    /// `GET /api/rooms`
    async fn fetch_rooms(&self) -> Result<Vec<Room>, ApiError>;

    /// `GET /api/buttons` or `GET /api/temperature_controls`, kind stamped.
    async fn fetch_devices(&self, kind: DeviceKind) -> Result<Vec<Device>, ApiError>;

    /// `POST /api/rooms/order`
    async fn save_room_order(&self, request: &RoomOrderRequest) -> Result<(), ApiError>;

    /// `POST /api/devices/batch-update`
    ///
    /// Returns the decoded body for any 2xx answer, including a body whose
    /// status is `error`; the caller decides what counts as accepted.
    async fn batch_update_devices(
        &self,
        request: &BatchUpdateRequest,
    ) -> Result<BatchUpdateResponse, ApiError>;

    /// `PUT /api/buttons/{id}` or `PUT /api/temperature_controls/{id}`
    async fn update_device(
        &self,
        kind: DeviceKind,
        id: &DeviceId,
        request: &DeviceUpdateRequest,
    ) -> Result<(), ApiError>;

    /// `POST /api/rooms`
    async fn create_room(&self, name: &str) -> Result<(), ApiError>;

    /// `PUT /api/rooms/{id}`
    async fn rename_room(&self, room: &RoomKey, name: &str) -> Result<(), ApiError>;

    /// `DELETE /api/rooms/{id}`
    async fn delete_room(&self, room: &RoomKey) -> Result<(), ApiError>;
}

/// Full read of rooms, lights and thermostats, assembled into a board.
///
/// # Errors
///
/// The first [`ApiError`] among the three reads.
pub async fn fetch_board(api: &dyn PanelApi) -> Result<Board, ApiError> {
    let (rooms, lights, thermostats) = tokio::try_join!(
        api.fetch_rooms(),
        api.fetch_devices(DeviceKind::Light),
        api.fetch_devices(DeviceKind::Thermostat),
    )?;
    Ok(Board::from_snapshot(
        rooms,
        lights.into_iter().chain(thermostats),
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
