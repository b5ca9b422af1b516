//! Configuration management for mcp-sse-bridge.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::handlers::{
    DEFAULT_KEEP_ALIVE, DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_STREAM_PATH,
};
use crate::api::{DispatchConfig, ServerConfig};
use crate::cli::Args;
use crate::session::DEFAULT_MESSAGE_PATH;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Route configuration.
    pub routes: RoutesSection,
    /// Streaming transport configuration.
    pub transport: TransportSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
        }
    }
}

/// Route configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesSection {
    /// Path that opens an event stream.
    pub stream_path: String,
    /// Base path for message posts.
    pub message_path: String,
}

impl Default for RoutesSection {
    fn default() -> Self {
        Self {
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            message_path: DEFAULT_MESSAGE_PATH.to_string(),
        }
    }
}

/// Transport configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    /// Seconds between keep-alive comments on idle streams.
    pub keep_alive_secs: u64,
    /// Largest accepted message body, in bytes.
    pub max_message_bytes: usize,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            keep_alive_secs: DEFAULT_KEEP_ALIVE.as_secs(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level or filter directive (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("MCP_BRIDGE_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("MCP_BRIDGE_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(level) = std::env::var("MCP_BRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides. Only options given on the command line
    /// take effect.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if args.no_graceful_shutdown {
            self.server.graceful_shutdown = false;
        }
        if let Some(ref path) = args.stream_path {
            self.routes.stream_path = path.clone();
        }
        if let Some(ref path) = args.message_path {
            self.routes.message_path = path.clone();
        }
        if let Some(secs) = args.keep_alive_secs {
            self.transport.keep_alive_secs = secs;
        }
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Validate and convert to the server's runtime configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        for path in [&self.routes.stream_path, &self.routes.message_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidRoute(path.clone()));
            }
        }
        if self.routes.stream_path == self.routes.message_path {
            return Err(ConfigError::RouteConflict(self.routes.stream_path.clone()));
        }
        if self.transport.keep_alive_secs == 0 {
            return Err(ConfigError::InvalidKeepAlive);
        }

        let dispatch = DispatchConfig {
            stream_path: self.routes.stream_path.clone(),
            message_path: self.routes.message_path.clone(),
            keep_alive: Duration::from_secs(self.transport.keep_alive_secs),
            max_message_bytes: self.transport.max_message_bytes,
        };

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port)
            .with_dispatch(dispatch);
        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid host address.
    #[error("invalid host address: {0}")]
    InvalidHost(String),
    /// Route path not starting with `/`.
    #[error("invalid route path: '{0}' (must start with '/')")]
    InvalidRoute(String),
    /// Stream and message routes are the same path.
    #[error("stream and message paths must differ: '{0}'")]
    RouteConflict(String),
    /// Zero keep-alive interval.
    #[error("keep-alive interval must be at least one second")]
    InvalidKeepAlive,
}
