// toolgate-config/src/config.rs
// ============================================================================
// Module: Gateway Configuration
// Description: TOML configuration model for the toolgate gateway.
// Purpose: Parse and validate every knob the gateway exposes.
// Dependencies: serde, toml, toolgate-core
// ============================================================================

//! ## Overview
//! One TOML file configures the backend target, the optional offline
//! descriptor set, reconnect and keep-alive behavior, message size caps, and
//! the serving surface. Loading resolves the path from an explicit argument,
//! the `TOOLGATE_CONFIG` environment variable, or the default file name, in
//! that order, and validation rejects out-of-bounds values instead of
//! clamping them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use toolgate_core::ConnectionConfig;
use toolgate_core::DiscoveryConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "toolgate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "TOOLGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Default bind address for the HTTP transport.
pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:50052";
/// Default maximum request body size in bytes.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default per-tool-call deadline in milliseconds.
pub(crate) const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;
/// Minimum per-tool-call deadline in milliseconds.
pub(crate) const MIN_CALL_TIMEOUT_MS: u64 = 100;
/// Maximum per-tool-call deadline in milliseconds.
pub(crate) const MAX_CALL_TIMEOUT_MS: u64 = 300_000;
/// Default reconnect interval in milliseconds.
pub(crate) const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5_000;
/// Minimum reconnect interval in milliseconds.
pub(crate) const MIN_RECONNECT_INTERVAL_MS: u64 = 100;
/// Maximum reconnect interval in milliseconds.
pub(crate) const MAX_RECONNECT_INTERVAL_MS: u64 = 60_000;
/// Default reconnect attempt limit.
pub(crate) const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
/// Maximum reconnect attempt limit.
pub(crate) const MAX_RECONNECT_ATTEMPTS: u32 = 20;
/// Default keep-alive ping interval in milliseconds.
pub(crate) const DEFAULT_KEEPALIVE_TIME_MS: u64 = 10_000;
/// Default keep-alive ack deadline in milliseconds.
pub(crate) const DEFAULT_KEEPALIVE_TIMEOUT_MS: u64 = 5_000;
/// Minimum keep-alive timing in milliseconds.
pub(crate) const MIN_KEEPALIVE_MS: u64 = 1_000;
/// Maximum keep-alive timing in milliseconds.
pub(crate) const MAX_KEEPALIVE_MS: u64 = 300_000;
/// Default maximum message size in bytes (4 MiB).
pub(crate) const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;
/// Minimum maximum-message size in bytes.
pub(crate) const MIN_MAX_MESSAGE_BYTES: usize = 1024;
/// Maximum maximum-message size in bytes.
pub(crate) const MAX_MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;
/// Maximum number of forwarded header names.
pub(crate) const MAX_FORWARD_HEADERS: usize = 64;
/// Maximum length of a forwarded header name.
pub(crate) const MAX_HEADER_NAME_LENGTH: usize = 128;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem failure while reading the config file.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML syntax or shape failure.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Semantically invalid configuration.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GatewayConfig {
    /// Serving surface configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Backend endpoint configuration.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Offline descriptor-set configuration.
    #[serde(default)]
    pub descriptor: DescriptorConfig,
    /// Reconnect behavior configuration.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Channel keep-alive configuration.
    #[serde(default)]
    pub keepalive: KeepAliveConfig,
    /// Message size configuration.
    #[serde(default)]
    pub message: MessageConfig,
}

/// Transports the JSON-RPC surface can serve on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerTransport {
    /// HTTP POST endpoint.
    #[default]
    Http,
    /// Newline-delimited JSON over stdin/stdout.
    Stdio,
}

/// Serving surface configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Transport to serve on.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Per-tool-call deadline in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Header names forwarded to the backend as call metadata.
    #[serde(default)]
    pub forward_headers: Vec<String>,
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Backend host name or address.
    #[serde(default = "default_backend_host")]
    pub host: String,
    /// Backend port.
    #[serde(default = "default_backend_port")]
    pub port: u16,
}

/// Offline descriptor-set configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DescriptorConfig {
    /// Whether the offline descriptor path is attempted first.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the descriptor-set file; ignored unless enabled.
    #[serde(default)]
    pub path: Option<String>,
}

/// Reconnect behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Interval between reconnect attempts in milliseconds.
    #[serde(default = "default_reconnect_interval_ms")]
    pub interval_ms: u64,
    /// Maximum reconnect attempts per reconnect operation.
    #[serde(default = "default_reconnect_attempts")]
    pub max_attempts: u32,
}

/// Channel keep-alive configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct KeepAliveConfig {
    /// Interval between keep-alive pings in milliseconds.
    #[serde(default = "default_keepalive_time_ms")]
    pub time_ms: u64,
    /// Deadline for keep-alive acknowledgements in milliseconds.
    #[serde(default = "default_keepalive_timeout_ms")]
    pub timeout_ms: u64,
    /// Whether pings are sent while no call is in flight.
    #[serde(default = "default_true")]
    pub permit_without_stream: bool,
}

/// Message size configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageConfig {
    /// Maximum per-message size in bytes, either direction.
    #[serde(default = "default_max_message_bytes")]
    pub max_bytes: usize,
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_call_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

fn default_backend_host() -> String {
    "localhost".to_string()
}

fn default_backend_port() -> u16 {
    50051
}

fn default_reconnect_interval_ms() -> u64 {
    DEFAULT_RECONNECT_INTERVAL_MS
}

fn default_reconnect_attempts() -> u32 {
    DEFAULT_RECONNECT_ATTEMPTS
}

fn default_keepalive_time_ms() -> u64 {
    DEFAULT_KEEPALIVE_TIME_MS
}

fn default_keepalive_timeout_ms() -> u64 {
    DEFAULT_KEEPALIVE_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Http,
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            call_timeout_ms: default_call_timeout_ms(),
            forward_headers: Vec::new(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_backend_host(),
            port: default_backend_port(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_reconnect_interval_ms(),
            max_attempts: default_reconnect_attempts(),
        }
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            time_ms: default_keepalive_time_ms(),
            timeout_ms: default_keepalive_timeout_ms(),
            permit_without_stream: true,
        }
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_message_bytes(),
        }
    }
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl GatewayConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.backend.validate()?;
        self.descriptor.validate()?;
        self.reconnect.validate()?;
        self.keepalive.validate()?;
        self.message.validate()?;
        Ok(())
    }

    /// Builds the connection configuration for the core.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(self.backend.host.clone(), self.backend.port);
        config.keepalive_time = Duration::from_millis(self.keepalive.time_ms);
        config.keepalive_timeout = Duration::from_millis(self.keepalive.timeout_ms);
        config.keepalive_while_idle = self.keepalive.permit_without_stream;
        config.max_message_bytes = self.message.max_bytes;
        config
    }

    /// Builds the discovery configuration for the core.
    #[must_use]
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            descriptor_enabled: self.descriptor.enabled,
            descriptor_path: self.descriptor.path.as_ref().map(PathBuf::from),
            reconnect_interval: Duration::from_millis(self.reconnect.interval_ms),
            reconnect_max_attempts: self.reconnect.max_attempts,
            call_deadline: Duration::from_millis(self.server.call_timeout_ms),
            ..DiscoveryConfig::default()
        }
    }
}

impl ServerConfig {
    /// Validates the serving surface configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.transport == ServerTransport::Http {
            self.bind
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::Invalid("server bind must be host:port".to_string()))?;
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("server max_body_bytes must be positive".to_string()));
        }
        if !(MIN_CALL_TIMEOUT_MS..=MAX_CALL_TIMEOUT_MS).contains(&self.call_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "server call_timeout_ms must be within {MIN_CALL_TIMEOUT_MS}..={MAX_CALL_TIMEOUT_MS}"
            )));
        }
        if self.forward_headers.len() > MAX_FORWARD_HEADERS {
            return Err(ConfigError::Invalid("too many forward_headers entries".to_string()));
        }
        for name in &self.forward_headers {
            if name.is_empty() || name.len() > MAX_HEADER_NAME_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "forward header name {name:?} has invalid length"
                )));
            }
            if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
                return Err(ConfigError::Invalid(format!(
                    "forward header name {name:?} has invalid characters"
                )));
            }
        }
        Ok(())
    }
}

impl BackendConfig {
    /// Validates the backend endpoint.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("backend host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("backend port must not be zero".to_string()));
        }
        Ok(())
    }
}

impl DescriptorConfig {
    /// Validates the descriptor-set configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Invalid(
                "descriptor path required when descriptor loading is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl ReconnectConfig {
    /// Validates reconnect timings.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_RECONNECT_INTERVAL_MS..=MAX_RECONNECT_INTERVAL_MS).contains(&self.interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "reconnect interval_ms must be within \
                 {MIN_RECONNECT_INTERVAL_MS}..={MAX_RECONNECT_INTERVAL_MS}"
            )));
        }
        if self.max_attempts == 0 || self.max_attempts > MAX_RECONNECT_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "reconnect max_attempts must be within 1..={MAX_RECONNECT_ATTEMPTS}"
            )));
        }
        Ok(())
    }
}

impl KeepAliveConfig {
    /// Validates keep-alive timings.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("time_ms", self.time_ms), ("timeout_ms", self.timeout_ms)] {
            if !(MIN_KEEPALIVE_MS..=MAX_KEEPALIVE_MS).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "keepalive {name} must be within {MIN_KEEPALIVE_MS}..={MAX_KEEPALIVE_MS}"
                )));
            }
        }
        Ok(())
    }
}

impl MessageConfig {
    /// Validates message size caps.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_MAX_MESSAGE_BYTES..=MAX_MAX_MESSAGE_BYTES).contains(&self.max_bytes) {
            return Err(ConfigError::Invalid(format!(
                "message max_bytes must be within {MIN_MAX_MESSAGE_BYTES}..={MAX_MAX_MESSAGE_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Resolves the config path from the argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Ok(value) = env::var(CONFIG_ENV_VAR) {
        if !value.is_empty() {
            return PathBuf::from(value);
        }
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}
