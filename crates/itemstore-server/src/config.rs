//! Runtime settings for the HTTP server.

use std::time::Duration;

/// How the server binds and behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline applied to every repository call.
    pub repository_timeout: Option<Duration>,
    /// Include internal failure causes in problem bodies.
    pub expose_internal_errors: bool,
    /// Permissive CORS.
    pub cors: bool,
}

impl ServerConfig {
    /// `host:port` to bind.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 17380,
            repository_timeout: Some(Duration::from_secs(5)),
            expose_internal_errors: false,
            cors: false,
        }
    }
}
