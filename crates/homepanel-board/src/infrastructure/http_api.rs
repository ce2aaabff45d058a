//! reqwest implementation of [`PanelApi`].
//!
//! Every request builder is a separate method so tests can inspect the
//! finished `reqwest::Request` (URL, method, headers, body) without a server.
//! Mutating requests go through [`HttpPanelApi::mutating`], which attaches the
//! `X-CSRFToken` header.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use homepanel_core::{
    BatchUpdateRequest, BatchUpdateResponse, CreateRoomRequest, Device, DeviceId, DeviceKind,
    DeviceUpdateRequest, Room, RoomKey, RoomNameRequest, RoomOrderRequest, StatusResponse,
};

use super::csrf::{CsrfToken, CSRF_HEADER};
use crate::application::api::{ApiError, PanelApi};
use crate::domain::PanelConfig;

pub struct HttpPanelApi {
    client: Client,
    base_url: String,
    csrf: Option<CsrfToken>,
}

impl HttpPanelApi {
    pub fn new(client: Client, config: &PanelConfig, csrf: Option<CsrfToken>) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            csrf,
        }
    }

    /// `base_url` plus percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Transport(format!("invalid base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport(format!("base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn mutating(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.csrf {
            Some(token) => builder.header(CSRF_HEADER, token.as_str()),
            None => builder,
        }
    }

    // ── Request builders ──────────────────────────────────────────────────────

    fn rooms_request(&self) -> Result<RequestBuilder, ApiError> {
        Ok(self.client.get(self.endpoint(&["api", "rooms"])?))
    }

    fn devices_request(&self, kind: DeviceKind) -> Result<RequestBuilder, ApiError> {
        Ok(self.client.get(self.endpoint(&["api", kind.collection()])?))
    }

    fn room_order_request(&self, body: &RoomOrderRequest) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(&["api", "rooms", "order"])?;
        Ok(self.mutating(Method::POST, url).json(body))
    }

    fn batch_request(&self, body: &BatchUpdateRequest) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(&["api", "devices", "batch-update"])?;
        Ok(self.mutating(Method::POST, url).json(body))
    }

    fn device_request(
        &self,
        kind: DeviceKind,
        id: &DeviceId,
        body: &DeviceUpdateRequest,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(&["api", kind.collection(), id.as_str()])?;
        Ok(self.mutating(Method::PUT, url).json(body))
    }

    fn create_room_request(&self, name: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(&["api", "rooms"])?;
        let body = CreateRoomRequest {
            room: name.to_string(),
        };
        Ok(self.mutating(Method::POST, url).json(&body))
    }

    fn rename_room_request(&self, room: &RoomKey, name: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(&["api", "rooms", room_segment(room)])?;
        let body = RoomNameRequest {
            name: name.to_string(),
        };
        Ok(self.mutating(Method::PUT, url).json(&body))
    }

    fn delete_room_request(&self, room: &RoomKey) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(&["api", "rooms", room_segment(room)])?;
        Ok(self.mutating(Method::DELETE, url))
    }
}

fn room_segment(room: &RoomKey) -> &str {
    match room {
        RoomKey::Id(id) => id.as_str(),
        RoomKey::Name(name) => name,
    }
}

/// Sends and returns the body of a 2xx response.
async fn send(builder: RequestBuilder) -> Result<String, ApiError> {
    let response = builder
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    let status = response.status();
    let url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    debug!(%url, status = status.as_u16(), "backend response");
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
    let body = send(builder).await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Sends a write and checks the `{status, message}` envelope, if any.
async fn send_write(builder: RequestBuilder) -> Result<(), ApiError> {
    let body = send(builder).await?;
    check_envelope(&body)
}

fn check_envelope(body: &str) -> Result<(), ApiError> {
    // Bodies that are empty or not an envelope carry no verdict.
    match serde_json::from_str::<StatusResponse>(body) {
        Ok(envelope) if envelope.is_error() => Err(ApiError::Rejected(
            envelope.message.unwrap_or_else(|| "no message".to_string()),
        )),
        _ => Ok(()),
    }
}

#[async_trait]
impl PanelApi for HttpPanelApi {
    async fn fetch_rooms(&self) -> Result<Vec<Room>, ApiError> {
        send_json(self.rooms_request()?).await
    }

    async fn fetch_devices(&self, kind: DeviceKind) -> Result<Vec<Device>, ApiError> {
        let devices = send_json(self.devices_request(kind)?).await?;
        Ok(Device::stamp_kind(devices, kind))
    }

    async fn save_room_order(&self, request: &RoomOrderRequest) -> Result<(), ApiError> {
        send_write(self.room_order_request(request)?).await
    }

    async fn batch_update_devices(
        &self,
        request: &BatchUpdateRequest,
    ) -> Result<BatchUpdateResponse, ApiError> {
        send_json(self.batch_request(request)?).await
    }

    async fn update_device(
        &self,
        kind: DeviceKind,
        id: &DeviceId,
        request: &DeviceUpdateRequest,
    ) -> Result<(), ApiError> {
        send_write(self.device_request(kind, id, request)?).await
    }

    async fn create_room(&self, name: &str) -> Result<(), ApiError> {
        send_write(self.create_room_request(name)?).await
    }

    async fn rename_room(&self, room: &RoomKey, name: &str) -> Result<(), ApiError> {
        send_write(self.rename_room_request(room, name)?).await
    }

    async fn delete_room(&self, room: &RoomKey) -> Result<(), ApiError> {
        send_write(self.delete_room_request(room)?).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
