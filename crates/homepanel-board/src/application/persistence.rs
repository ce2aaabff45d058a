//! Device placement persistence strategies.
//!
//! Saving an edit session ends with a list of [`DeviceMove`]s to persist.
//! There are two ways to write them:
//!
//! - [`BatchStrategy`]    – one `POST /api/devices/batch-update` carrying every
//!   move.  Fast, but all-or-nothing from the client's point of view.
//! - [`OneByOneStrategy`] – one `PUT` per device, best-effort: a failed device
//!   is logged and skipped, the rest still go out.
//!
//! Both implement [`PlacementStrategy`], and [`persist_with_fallback`] runs a
//! primary strategy and switches to the fallback when the primary fails.
//!
//! # Fallback rule
//!
//! ```text
//! batch → Ok(success | partial_success)  → done
//! batch → transport error / non-2xx      → one-by-one
//! batch → 2xx with status "error"        → one-by-one
//! ```

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use homepanel_core::{BatchStatus, BatchUpdateRequest, DeviceId, DeviceMove};

use super::api::{ApiError, PanelApi};

/// Why a strategy gave up as a whole.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistError {
    #[error("batch request failed: {0}")]
    BatchFailed(#[source] ApiError),

    #[error("batch rejected with status {status:?}: {message}")]
    BatchRejected { status: BatchStatus, message: String },
}

/// What a strategy managed to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReport {
    /// Name of the strategy that produced this report.
    pub strategy: &'static str,
    /// Number of moves handed to the strategy.
    pub attempted: usize,
    /// Devices the backend did not update.
    pub failed: Vec<DeviceId>,
    /// `true` when the primary strategy failed and this came from the fallback.
    pub fell_back: bool,
}

impl PersistReport {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed.len()
    }
}

/// A way of writing device placements to the backend.
#[async_trait]
pub trait PlacementStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Writes `moves`.
    ///
    /// # Errors
    ///
    /// [`PersistError`] when the strategy as a whole failed and nothing can be
    /// assumed written.  Per-device failures are reported in
    /// [`PersistReport::failed`] instead.
    async fn persist(
        &self,
        api: &dyn PanelApi,
        moves: &[DeviceMove],
    ) -> Result<PersistReport, PersistError>;
}

/// All moves in one batch request.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchStrategy;

#[async_trait]
impl PlacementStrategy for BatchStrategy {
    fn name(&self) -> &'static str {
        "batch"
    }

    async fn persist(
        &self,
        api: &dyn PanelApi,
        moves: &[DeviceMove],
    ) -> Result<PersistReport, PersistError> {
        let request = BatchUpdateRequest {
            devices: moves.iter().map(DeviceMove::to_batch_entry).collect(),
        };
        let response = api
            .batch_update_devices(&request)
            .await
            .map_err(PersistError::BatchFailed)?;

        if !response.status.is_accepted() {
            return Err(PersistError::BatchRejected {
                status: response.status,
                message: response.message.unwrap_or_default(),
            });
        }

        // Partial success lists the devices the backend skipped; the entry
        // shape is loose, so only entries with an `id` are attributed.
        let failed = response
            .failed
            .iter()
            .filter_map(|f| f.get("id"))
            .filter_map(|id| match id {
                serde_json::Value::String(s) => Some(DeviceId::new(s.clone())),
                serde_json::Value::Number(n) => Some(DeviceId::new(n.to_string())),
                _ => None,
            })
            .collect();

        Ok(PersistReport {
            strategy: self.name(),
            attempted: moves.len(),
            failed,
            fell_back: false,
        })
    }
}

/// One request per move, continuing past individual failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct OneByOneStrategy;

#[async_trait]
impl PlacementStrategy for OneByOneStrategy {
    fn name(&self) -> &'static str {
        "one-by-one"
    }

    async fn persist(
        &self,
        api: &dyn PanelApi,
        moves: &[DeviceMove],
    ) -> Result<PersistReport, PersistError> {
        let mut failed = Vec::new();
        for mv in moves {
            let body = mv.to_update_request();
            if let Err(e) = api.update_device(mv.kind, &mv.device_id, &body).await {
                warn!(device = %mv.device_id, kind = %mv.kind, "device update failed: {e}");
                failed.push(mv.device_id.clone());
            }
        }
        Ok(PersistReport {
            strategy: self.name(),
            attempted: moves.len(),
            failed,
            fell_back: false,
        })
    }
}

/// Runs `primary`, and `fallback` if the primary fails as a whole.
///
/// Never fails: if the fallback also gives up, every move is reported as
/// failed.
pub async fn persist_with_fallback(
    api: &dyn PanelApi,
    primary: &dyn PlacementStrategy,
    fallback: &dyn PlacementStrategy,
    moves: &[DeviceMove],
) -> PersistReport {
    match primary.persist(api, moves).await {
        Ok(report) => {
            info!(
                strategy = report.strategy,
                updated = report.succeeded(),
                total = report.attempted,
                "device placements saved"
            );
            report
        }
        Err(e) => {
            warn!(
                "{} strategy failed ({e}); falling back to {}",
                primary.name(),
                fallback.name()
            );
            match fallback.persist(api, moves).await {
                Ok(report) => PersistReport {
                    fell_back: true,
                    ..report
                },
                Err(e) => {
                    warn!("{} strategy failed as well: {e}", fallback.name());
                    PersistReport {
                        strategy: fallback.name(),
                        attempted: moves.len(),
                        failed: moves.iter().map(|m| m.device_id.clone()).collect(),
                        fell_back: true,
                    }
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
