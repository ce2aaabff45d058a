//! Board client configuration types.
//!
//! [`PanelConfig`] is the single source of truth for runtime settings.  It is
//! built once at startup (config file, then CLI overrides) and shared behind
//! an `Arc`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the CSRF token attached to every mutating request comes from.
///
/// The panel page exposes the token in a `<meta name="csrf-token">` tag, a
/// hidden `_csrf_token` form field, or a `window.csrf_token` global; any one
/// of them is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CsrfSource {
    /// Send no token (backends with CSRF protection disabled).
    #[default]
    None,
    /// A fixed token value.
    Static { token: String },
    /// Read the token from an environment variable at startup.
    Env { var: String },
    /// Fetch a panel page (path relative to `base_url`) and scrape it.
    Page { path: String },
}

/// All runtime configuration for the board client.
///
/// # Example
///
/// ```rust
/// use homepanel_board::domain::PanelConfig;
///
/// let cfg = PanelConfig::default();
/// assert_eq!(cfg.base_url, "http://127.0.0.1:5000");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PanelConfig {
    /// Root URL of the REST backend, without a trailing slash.
    pub base_url: String,

    /// URL of the realtime push WebSocket.
    pub realtime_url: String,

    pub csrf: CsrfSource,

    /// How long an armed destructive action (delete, rename) stays armed.
    pub confirm_window: Duration,

    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for PanelConfig {
    /// | Field          | Default                         |
    /// |----------------|---------------------------------|
    /// | base_url       | `http://127.0.0.1:5000`         |
    /// | realtime_url   | `ws://127.0.0.1:5000/ws`        |
    /// | csrf           | `None`                          |
    /// | confirm_window | 5 seconds                       |
    /// | log_level      | `info`                          |
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            realtime_url: "ws://127.0.0.1:5000/ws".to_string(),
            csrf: CsrfSource::None,
            confirm_window: Duration::from_secs(5),
            log_level: "info".to_string(),
        }
    }
}

impl PanelConfig {
    /// `base_url` joined with an absolute API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
