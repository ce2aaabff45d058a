//! TOML persistence for [`PanelConfig`].
//!
//! The file lives in the platform config directory:
//! - Windows:  `%APPDATA%\HomePanel\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/homepanel/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/HomePanel/config.toml`
//!
//! ```toml
//! base_url = "http://192.168.1.20:5000"
//! realtime_url = "ws://192.168.1.20:5000/socket.io/?EIO=4&transport=websocket"
//! confirm_window_secs = 5
//! log_level = "info"
//!
//! [csrf]
//! source = "page"
//! path = "/"
//! ```
//!
//! A missing file means defaults; a missing field takes its default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CsrfSource, PanelConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// On-disk shape of [`PanelConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_realtime_url")]
    pub realtime_url: String,
    #[serde(default = "default_confirm_window_secs")]
    pub confirm_window_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub csrf: CsrfSource,
}

fn default_base_url() -> String {
    PanelConfig::default().base_url
}
fn default_realtime_url() -> String {
    PanelConfig::default().realtime_url
}
fn default_confirm_window_secs() -> u64 {
    PanelConfig::default().confirm_window.as_secs()
}
fn default_log_level() -> String {
    PanelConfig::default().log_level
}

impl Default for ConfigFile {
    fn default() -> Self {
        PanelConfig::default().into()
    }
}

impl From<ConfigFile> for PanelConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            base_url: file.base_url,
            realtime_url: file.realtime_url,
            csrf: file.csrf,
            confirm_window: Duration::from_secs(file.confirm_window_secs),
            log_level: file.log_level,
        }
    }
}

impl From<PanelConfig> for ConfigFile {
    fn from(config: PanelConfig) -> Self {
        Self {
            base_url: config.base_url,
            realtime_url: config.realtime_url,
            confirm_window_secs: config.confirm_window.as_secs(),
            log_level: config.log_level,
            csrf: config.csrf,
        }
    }
}

/// Full path of the default config file.
///
/// # Errors
///
/// [`ConfigError::NoPlatformConfigDir`] when the platform base directory
/// cannot be determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config at `path`, or defaults if the file does not exist.
///
/// # Errors
///
/// [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] for malformed TOML.
pub fn load_config(path: &Path) -> Result<PanelConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let file: ConfigFile = toml::from_str(&content)?;
            Ok(file.into())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PanelConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories.
///
/// # Errors
///
/// [`ConfigError::Io`] or [`ConfigError::Serialize`].
pub fn save_config(path: &Path, config: &PanelConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(&ConfigFile::from(config.clone()))?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("HomePanel"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("homepanel"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("HomePanel")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("homepanel-test-{}-{name}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        // Arrange
        let toml_str = r#"base_url = "http://10.0.0.2:8000""#;

        // Act
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        let config = PanelConfig::from(file);

        // Assert
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.confirm_window, Duration::from_secs(5));
        assert_eq!(config.csrf, CsrfSource::None);
    }

    #[test]
    fn test_csrf_table_is_parsed() {
        let toml_str = "[csrf]\nsource = \"env\"\nvar = \"PANEL_CSRF\"\n";
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(
            file.csrf,
            CsrfSource::Env {
                var: "PANEL_CSRF".to_string()
            }
        );
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = temp_path("missing");
        assert_eq!(load_config(&path).unwrap(), PanelConfig::default());
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        // Arrange
        let path = temp_path("save");
        let config = PanelConfig {
            base_url: "http://panel.lan".to_string(),
            confirm_window: Duration::from_secs(9),
            csrf: CsrfSource::Static {
                token: "t".to_string(),
            },
            ..PanelConfig::default()
        };

        // Act
        save_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();

        // Assert
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = toml::from_str::<ConfigFile>("base_url = [").unwrap_err();
        assert!(matches!(ConfigError::from(err), ConfigError::Parse(_)));
    }
}
