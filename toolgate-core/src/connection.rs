// toolgate-core/src/connection.rs
// ============================================================================
// Module: Connection Manager
// Description: Lifecycle management for the single backend channel.
// Purpose: Own channel open/close/reopen with keep-alive and timeouts.
// Dependencies: tokio, tonic
// ============================================================================

//! ## Overview
//! The gateway holds exactly one long-lived HTTP/2 channel to the backend.
//! Dispatchers clone the channel handle through the read side of a
//! readers-writer lock; open, reopen, and close serialize on the write side.
//! The channel multiplexes concurrent RPCs internally, so cloning is cheap
//! and never blocks in-flight calls.
//!
//! Liveness here is structural (a channel handle is present). The RPC-level
//! health probe piggy-backs on a trivial reflection request and is driven by
//! the discoverer right after open, releasing the half-open channel when the
//! probe fails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::RwLock;
use tonic::transport::Channel;
use tonic::transport::Endpoint;

use crate::error::GatewayError;
use crate::error::Result;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default deadline for establishing the backend connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default interval between HTTP/2 keep-alive pings.
pub const DEFAULT_KEEPALIVE_TIME: Duration = Duration::from_secs(10);
/// Default deadline for a keep-alive ping acknowledgement.
pub const DEFAULT_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default maximum message size in either direction (4 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Connection parameters for the backend channel.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Backend host name or address.
    pub host: String,
    /// Backend port.
    pub port: u16,
    /// Deadline for establishing the connection.
    pub connect_timeout: Duration,
    /// Interval between keep-alive pings.
    pub keepalive_time: Duration,
    /// Deadline for keep-alive acknowledgements.
    pub keepalive_timeout: Duration,
    /// Whether pings are sent while no call is in flight.
    pub keepalive_while_idle: bool,
    /// Maximum per-message size in either direction.
    pub max_message_bytes: usize,
}

impl ConnectionConfig {
    /// Creates a configuration with default timings for the given target.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive_time: DEFAULT_KEEPALIVE_TIME,
            keepalive_timeout: DEFAULT_KEEPALIVE_TIMEOUT,
            keepalive_while_idle: true,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

// ============================================================================
// SECTION: Connection Manager
// ============================================================================

/// Owns the single channel to the backend.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection parameters.
    config: ConnectionConfig,
    /// Current channel, guarded for concurrent dispatch.
    channel: RwLock<Option<Channel>>,
}

impl ConnectionManager {
    /// Creates a manager with no open channel.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            channel: RwLock::new(None),
        }
    }

    /// Returns the configured maximum message size.
    #[must_use]
    pub const fn max_message_bytes(&self) -> usize {
        self.config.max_message_bytes
    }

    /// Opens the channel, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the connection cannot be
    /// established within the connect deadline.
    pub async fn open(&self) -> Result<Channel> {
        let mut guard = self.channel.write().await;
        // Drop any previous channel before dialing so a failed open never
        // leaves a stale handle behind.
        guard.take();
        let endpoint = self.endpoint()?;
        let channel = endpoint
            .connect()
            .await
            .map_err(|_| GatewayError::Transport("backend connection failed".to_string()))?;
        *guard = Some(channel.clone());
        tracing::info!(host = %self.config.host, port = self.config.port, "connected to backend");
        Ok(channel)
    }

    /// Returns a clone of the current channel, if one is open.
    pub async fn channel(&self) -> Option<Channel> {
        self.channel.read().await.clone()
    }

    /// Returns whether a channel is currently open.
    pub async fn is_live(&self) -> bool {
        self.channel.read().await.is_some()
    }

    /// Closes the channel if one is open.
    pub async fn close(&self) {
        let mut guard = self.channel.write().await;
        if guard.take().is_some() {
            tracing::info!("backend channel closed");
        }
    }

    /// Closes and reopens the channel.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the new connection fails.
    pub async fn reopen(&self) -> Result<Channel> {
        self.close().await;
        self.open().await
    }

    /// Verifies that a channel is present.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotConnected`] when no channel is open.
    pub async fn require_live(&self) -> Result<Channel> {
        self.channel().await.ok_or(GatewayError::NotConnected)
    }

    /// Builds the endpoint with connect and keep-alive parameters applied.
    fn endpoint(&self) -> Result<Endpoint> {
        let target = format!("http://{}:{}", self.config.host, self.config.port);
        let endpoint = Endpoint::from_shared(target)
            .map_err(|_| GatewayError::InvalidArgument("invalid backend address".to_string()))?
            .connect_timeout(self.config.connect_timeout)
            .http2_keep_alive_interval(self.config.keepalive_time)
            .keep_alive_timeout(self.config.keepalive_timeout)
            .keep_alive_while_idle(self.config.keepalive_while_idle);
        Ok(endpoint)
    }
}
