use anyhow::{Context, Result};
use board_core::model::{Role, Viewer};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Client configuration, read from `<config_dir>/taskboard/config.toml`.
///
/// Environment variables override the file: `TASKBOARD_SERVER`,
/// `TASKBOARD_SOCKET`, `TASKBOARD_TOKEN`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST task service.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Push channel URL. Derived from `server_url` when unset.
    #[serde(default)]
    pub socket_url: Option<String>,
    /// Bearer token attached to authenticated requests. The client treats
    /// it as opaque; viewer identity is configured separately.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            socket_url: None,
            token: None,
            viewer: ViewerConfig::default(),
        }
    }
}

/// Who is looking at the board. The backend derives this from the session
/// token; the CLI takes it from config or flags instead of parsing
/// credentials itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub id: i64,
    #[serde(default = "default_viewer_name")]
    pub username: String,
    #[serde(default = "default_viewer_role")]
    pub role: Role,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            id: 0,
            username: default_viewer_name(),
            role: default_viewer_role(),
        }
    }
}

impl ClientConfig {
    /// The push channel endpoint, deriving `ws(s)://` from the server URL
    /// when no explicit socket URL is configured.
    #[must_use]
    pub fn socket_endpoint(&self) -> String {
        self.socket_url.clone().unwrap_or_else(|| {
            if let Some(rest) = self.server_url.strip_prefix("https://") {
                format!("wss://{rest}")
            } else if let Some(rest) = self.server_url.strip_prefix("http://") {
                format!("ws://{rest}")
            } else {
                self.server_url.clone()
            }
        })
    }

    #[must_use]
    pub fn viewer(&self) -> Viewer {
        Viewer {
            id: self.viewer.id,
            username: self.viewer.username.clone(),
            role: self.viewer.role,
        }
    }
}

pub fn load_config() -> Result<ClientConfig> {
    let mut config = match dirs::config_dir() {
        Some(config_dir) => load_from_file(&config_dir.join("taskboard/config.toml"))?,
        None => ClientConfig::default(),
    };
    apply_env_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}

fn load_from_file(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ClientConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn apply_env_overrides(config: &mut ClientConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(server) = get("TASKBOARD_SERVER") {
        config.server_url = server;
    }
    if let Some(socket) = get("TASKBOARD_SOCKET") {
        config.socket_url = Some(socket);
    }
    if let Some(token) = get("TASKBOARD_TOKEN") {
        config.token = Some(token);
    }
}

fn default_server_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_viewer_name() -> String {
    "anonymous".to_string()
}

const fn default_viewer_role() -> Role {
    Role::User
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_from_file(&dir.path().join("config.toml")).expect("load should succeed");
        assert_eq!(cfg.server_url, "http://localhost:4000");
        assert!(cfg.socket_url.is_none());
        assert!(cfg.token.is_none());
        assert_eq!(cfg.viewer.role, Role::User);
    }

    #[test]
    fn file_values_parse() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
server_url = "https://tasks.example.com"
token = "abc123"

[viewer]
id = 7
username = "bob"
role = "admin"
"#,
        )
        .expect("write config");

        let cfg = load_from_file(&path).expect("load should succeed");
        assert_eq!(cfg.server_url, "https://tasks.example.com");
        assert_eq!(cfg.token.as_deref(), Some("abc123"));
        assert_eq!(cfg.viewer.username, "bob");
        assert_eq!(cfg.viewer.role, Role::Admin);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server_url = [not toml").expect("write config");
        assert!(load_from_file(&path).is_err());
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let mut cfg = ClientConfig {
            server_url: "http://localhost:4000".to_string(),
            ..ClientConfig::default()
        };
        apply_env_overrides(&mut cfg, |key| match key {
            "TASKBOARD_SERVER" => Some("https://prod.example.com".to_string()),
            "TASKBOARD_TOKEN" => Some("tok".to_string()),
            _ => None,
        });
        assert_eq!(cfg.server_url, "https://prod.example.com");
        assert_eq!(cfg.token.as_deref(), Some("tok"));
        assert!(cfg.socket_url.is_none());
    }

    #[test]
    fn socket_endpoint_derives_scheme() {
        let mut cfg = ClientConfig::default();
        assert_eq!(cfg.socket_endpoint(), "ws://localhost:4000");

        cfg.server_url = "https://tasks.example.com".to_string();
        assert_eq!(cfg.socket_endpoint(), "wss://tasks.example.com");

        cfg.socket_url = Some("wss://push.example.com".to_string());
        assert_eq!(cfg.socket_endpoint(), "wss://push.example.com");
    }

    #[test]
    fn viewer_conversion_carries_identity() {
        let cfg = ClientConfig {
            viewer: ViewerConfig {
                id: 3,
                username: "carol".to_string(),
                role: Role::Admin,
            },
            ..ClientConfig::default()
        };
        let viewer = cfg.viewer();
        assert_eq!(viewer.id, 3);
        assert_eq!(viewer.username, "carol");
        assert_eq!(viewer.role, Role::Admin);
    }
}
