//! Client configuration loaded from a TOML file.
//!
//! A missing file yields the defaults; a malformed file is an error. Every
//! section has serde defaults so partial files stay valid.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML in {path}: {message}")]
    InvalidToml { path: PathBuf, message: String },

    #[error("no platform config directory available")]
    NoConfigDir,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_websocket_url")]
    pub websocket_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            websocket_url: default_websocket_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Override for the identity file location; platform data dir when unset.
    pub store_path: Option<PathBuf>,
}

fn default_websocket_url() -> String {
    "ws://localhost:3030/ws".to_string()
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(error) => return Err(error.into()),
        };

        toml::from_str(&contents).map_err(|error| ConfigError::InvalidToml {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }

    /// Default location, e.g. `~/.config/inklet/config.toml` on Linux.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = crate::project_dirs().ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&Self::default_path()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_local_server() {
        let config = ClientConfig::default();
        assert_eq!(config.server.websocket_url, "ws://localhost:3030/ws");
        assert!(config.identity.store_path.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.websocket_url, "ws://localhost:3030/ws");
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nwebsocket_url = \"wss://chat.example.com/ws\"\n",
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.server.websocket_url, "wss://chat.example.com/ws");
        assert!(config.identity.store_path.is_none());
    }

    #[test]
    fn identity_store_path_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[identity]\nstore_path = \"/tmp/inklet-id\"\n").unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(
            config.identity.store_path,
            Some(PathBuf::from("/tmp/inklet-id"))
        );
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nwebsocket_url = ").unwrap();

        let error = ClientConfig::load(&path).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidToml { .. }));
    }
}
