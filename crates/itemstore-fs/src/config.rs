//! Workspace configuration.

use serde::{Deserialize, Serialize};

/// Workspace configuration stored in `.itemstore/config.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace settings.
    #[serde(default)]
    pub workspace: WorkspaceSettings,

    /// Settings for `itemstore serve`.
    #[serde(default)]
    pub server: ServerSettings,
}

fn default_version() -> u32 {
    1
}

/// Workspace-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Workspace name.
    #[serde(default)]
    pub name: Option<String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deadline for a single repository call, in milliseconds. 0 disables it.
    #[serde(default = "default_repository_timeout_ms")]
    pub repository_timeout_ms: u64,

    /// Include the cause of internal failures in error responses.
    #[serde(default)]
    pub expose_internal_errors: bool,

    /// Allow cross-origin requests from anywhere.
    #[serde(default)]
    pub cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    17380
}

const fn default_repository_timeout_ms() -> u64 {
    5000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            repository_timeout_ms: default_repository_timeout_ms(),
            expose_internal_errors: false,
            cors: false,
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            workspace: WorkspaceSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl WorkspaceConfig {
    /// Create a new config with the given workspace name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            workspace: WorkspaceSettings {
                name: Some(name.into()),
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: WorkspaceConfig = serde_yaml::from_str("server:\n  port: 9000\n").unwrap();

        assert_eq!(config.version, 1);
        assert!(config.workspace.name.is_none());
        assert_eq!(
            config.server,
            ServerSettings {
                port: 9000,
                ..ServerSettings::default()
            }
        );
    }

    #[test]
    fn test_named_config_round_trips_through_yaml() {
        let config = WorkspaceConfig::new("inventory");
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: WorkspaceConfig = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.workspace.name.as_deref(), Some("inventory"));
        assert_eq!(parsed.server, ServerSettings::default());
    }
}
