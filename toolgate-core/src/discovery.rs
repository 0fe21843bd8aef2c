// toolgate-core/src/discovery.rs
// ============================================================================
// Module: Service Discoverer
// Description: Two-path discovery orchestration and the published catalog.
// Purpose: Turn backend schema metadata into an invokable tool catalog.
// Dependencies: tokio, tokio-util, prost-types
// ============================================================================

//! ## Overview
//! The discoverer owns the connection manager, the reflection client, and
//! the published catalog. Discovery prefers a configured offline
//! descriptor set (which carries source comments); when the offline path is
//! absent or fails to load, it falls back to the reflection sub-protocol.
//! The offline fallthrough is a logged warning, not an error; exhausting
//! both paths fails the operation. A successful round publishes the catalog
//! in a single atomic store.
//!
//! Reconnection reopens the channel, rebuilds the reflection client (which
//! discards its descriptor cache), and reruns discovery, bounded by the
//! configured attempt count and cancellable between attempts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use prost_types::FileDescriptorProto;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogHandle;
use crate::catalog::MethodRecord;
use crate::catalog::ToolCatalog;
use crate::connection::ConnectionConfig;
use crate::connection::ConnectionManager;
use crate::descriptor;
use crate::descriptor::CommentIndex;
use crate::error::GatewayError;
use crate::error::Result;
use crate::invoke::DEFAULT_CALL_DEADLINE;
use crate::invoke::DynamicInvoker;
use crate::reflection::DEFAULT_EXCHANGE_DEADLINE;
use crate::reflection::ReflectionClient;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default interval between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
/// Default number of reconnect attempts before giving up.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;

/// Service name prefixes that are never exposed as tools.
pub const INTERNAL_SERVICE_PREFIXES: [&str; 4] =
    ["grpc.reflection.", "grpc.health.", "grpc.channelz.", "grpc.testing."];

/// Discovery behavior configuration.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Whether the offline descriptor path is attempted first.
    pub descriptor_enabled: bool,
    /// Path to the descriptor-set file; ignored unless enabled.
    pub descriptor_path: Option<PathBuf>,
    /// Interval between reconnect attempts.
    pub reconnect_interval: Duration,
    /// Maximum reconnect attempts per reconnect operation.
    pub reconnect_max_attempts: u32,
    /// Deadline for health probes and reflection exchanges.
    pub probe_deadline: Duration,
    /// Default per-tool-call deadline.
    pub call_deadline: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            descriptor_enabled: false,
            descriptor_path: None,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            reconnect_max_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            probe_deadline: DEFAULT_EXCHANGE_DEADLINE,
            call_deadline: DEFAULT_CALL_DEADLINE,
        }
    }
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Connection lifecycle states for the discoverer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No connection has been attempted.
    Idle,
    /// A connection attempt is in flight.
    Connecting,
    /// Connected with no catalog published yet.
    ConnectedUndiscovered,
    /// Connected with a published catalog; invocation is permitted.
    Ready,
    /// A reconnect loop is in flight.
    Reconnecting,
    /// Explicitly closed or reconnect attempts exhausted.
    Closed,
}

/// Snapshot of discovery statistics for the health surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    /// Number of distinct services in the published catalog.
    pub service_count: usize,
    /// Total number of catalogued methods.
    pub method_count: usize,
    /// Whether the backend channel is live.
    pub connected: bool,
    /// Sorted service names.
    pub services: Vec<String>,
}

// ============================================================================
// SECTION: Discoverer
// ============================================================================

/// Orchestrates connection, discovery, and invocation.
#[derive(Debug)]
pub struct ServiceDiscoverer {
    /// Discovery behavior configuration.
    config: DiscoveryConfig,
    /// Backend channel owner.
    connection: ConnectionManager,
    /// Reflection client for the current connection generation.
    reflection: RwLock<Option<Arc<ReflectionClient>>>,
    /// Atomically-published tool catalog.
    catalog: CatalogHandle,
    /// Current lifecycle state.
    state: Mutex<LifecycleState>,
}

impl ServiceDiscoverer {
    /// Creates a discoverer for the given backend.
    #[must_use]
    pub fn new(connection: ConnectionConfig, config: DiscoveryConfig) -> Self {
        Self {
            config,
            connection: ConnectionManager::new(connection),
            reflection: RwLock::new(None),
            catalog: CatalogHandle::new(),
            state: Mutex::new(LifecycleState::Idle),
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the channel, builds the reflection client, and probes health.
    ///
    /// # Errors
    ///
    /// Returns the underlying connect or probe error; a failed probe
    /// releases the half-open channel.
    pub async fn connect(&self) -> Result<()> {
        self.set_state(LifecycleState::Connecting);
        let channel = match self.connection.open().await {
            Ok(channel) => channel,
            Err(error) => {
                self.set_state(LifecycleState::Idle);
                return Err(error);
            }
        };
        let client = Arc::new(ReflectionClient::new(channel, self.connection.max_message_bytes()));
        if let Err(error) = client.health_probe(self.config.probe_deadline).await {
            self.connection.close().await;
            self.set_state(LifecycleState::Idle);
            return Err(error);
        }
        *self.reflection.write().await = Some(client);
        self.set_state(LifecycleState::ConnectedUndiscovered);
        Ok(())
    }

    /// Runs discovery and publishes the resulting catalog.
    ///
    /// # Errors
    ///
    /// Returns an error only when every discovery path fails.
    pub async fn discover(&self) -> Result<()> {
        let (records, comments) = match self.discover_offline() {
            Some(Ok(result)) => result,
            Some(Err(error)) => {
                tracing::warn!(
                    %error,
                    "offline descriptor discovery failed, falling back to reflection"
                );
                self.discover_via_reflection().await?
            }
            None => self.discover_via_reflection().await?,
        };
        let records: Vec<MethodRecord> = records
            .into_iter()
            .filter(|record| !is_internal_service(record.declared_service()))
            .collect();
        let catalog = ToolCatalog::from_records(records, comments);
        tracing::info!(
            services = catalog.service_names().len(),
            methods = catalog.method_count(),
            "published tool catalog"
        );
        self.catalog.publish(catalog);
        self.set_state(LifecycleState::Ready);
        Ok(())
    }

    /// Loads the offline descriptor set when one is configured.
    fn discover_offline(&self) -> Option<Result<(Vec<MethodRecord>, CommentIndex)>> {
        if !self.config.descriptor_enabled {
            return None;
        }
        let path = self.config.descriptor_path.as_ref()?;
        Some(descriptor::load_descriptor_file(path).map(|registry| {
            let records = descriptor::methods_from_registry(&registry);
            (records, registry.into_comments())
        }))
    }

    /// Discovers methods through the reflection sub-protocol.
    async fn discover_via_reflection(&self) -> Result<(Vec<MethodRecord>, CommentIndex)> {
        let client = self.reflection_client().await?;
        let services = client.list_services(self.config.probe_deadline).await?;
        let survivors: BTreeSet<String> =
            services.into_iter().filter(|name| !is_internal_service(name)).collect();
        let mut files: Vec<FileDescriptorProto> = Vec::new();
        let mut seen_files: BTreeSet<String> = BTreeSet::new();
        for symbol in &survivors {
            let fetched = match client.file_for_symbol(symbol, self.config.probe_deadline).await {
                Ok(files) => files,
                Err(error) => {
                    tracing::warn!(service = %symbol, %error, "failed to fetch service descriptor");
                    continue;
                }
            };
            for file in fetched {
                if seen_files.insert(file.name().to_string()) {
                    files.push(file);
                }
            }
        }
        if files.is_empty() {
            return Err(GatewayError::NotFound(
                "no service descriptors available via reflection".to_string(),
            ));
        }
        let registry = descriptor::registry_from_files(files)?;
        let records = descriptor::methods_from_registry(&registry)
            .into_iter()
            .filter(|record| survivors.contains(record.declared_service()))
            .collect();
        Ok((records, registry.into_comments()))
    }

    /// Reconnects with bounded retries and reruns discovery.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Cancelled`] when the token fires, or the last
    /// underlying error after exhausting every attempt.
    pub async fn reconnect(&self, cancel: &CancellationToken) -> Result<()> {
        self.set_state(LifecycleState::Reconnecting);
        let mut last_error = GatewayError::NotConnected;
        for attempt in 1..=self.config.reconnect_max_attempts {
            if attempt > 1 {
                tokio::select! {
                    () = cancel.cancelled() => return Err(GatewayError::Cancelled),
                    () = tokio::time::sleep(self.config.reconnect_interval) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }
            match self.reconnect_attempt().await {
                Ok(()) => {
                    tracing::info!(attempt, "reconnected to backend");
                    return Ok(());
                }
                Err(error) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.config.reconnect_max_attempts,
                        %error,
                        "reconnect attempt failed"
                    );
                    last_error = error;
                }
            }
        }
        self.set_state(LifecycleState::Closed);
        Err(last_error)
    }

    /// Runs one reconnect attempt: reopen, rebuild reflection, rediscover.
    async fn reconnect_attempt(&self) -> Result<()> {
        let channel = self.connection.reopen().await?;
        let client = Arc::new(ReflectionClient::new(channel, self.connection.max_message_bytes()));
        client.health_probe(self.config.probe_deadline).await?;
        *self.reflection.write().await = Some(client);
        self.discover().await
    }

    /// Invokes a catalogued tool with JSON arguments.
    ///
    /// The catalog snapshot is captured once at entry; a rediscovery that
    /// publishes mid-call does not affect this invocation.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotConnected`] outside the ready state,
    /// [`GatewayError::NotFound`] for unknown tools, and
    /// [`GatewayError::Unsupported`] for streaming methods before any
    /// backend traffic is sent.
    pub async fn invoke(
        &self,
        tool_id: &str,
        input_json: &str,
        metadata: &BTreeMap<String, String>,
        deadline: Option<Duration>,
    ) -> Result<String> {
        if self.state() != LifecycleState::Ready {
            return Err(GatewayError::NotConnected);
        }
        let catalog = self.catalog.load();
        let record = catalog
            .get(tool_id)
            .ok_or_else(|| GatewayError::NotFound(format!("tool {tool_id}")))?;
        if record.is_streaming() {
            return Err(GatewayError::Unsupported(format!(
                "tool {tool_id} maps to a streaming method"
            )));
        }
        let channel = self.connection.require_live().await?;
        let invoker = DynamicInvoker::new(channel, self.connection.max_message_bytes());
        let deadline = deadline.unwrap_or(self.config.call_deadline);
        invoker.invoke(record, input_json, metadata, deadline).await
    }

    /// Probes backend health through the reflection sub-protocol.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotConnected`] when no connection generation
    /// is active, or the probe's underlying error.
    pub async fn health_probe(&self) -> Result<()> {
        self.connection.require_live().await?;
        let client = self.reflection_client().await?;
        client.health_probe(self.config.probe_deadline).await
    }

    /// Returns the current catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> Arc<ToolCatalog> {
        self.catalog.load()
    }

    /// Returns discovery statistics for the health surface.
    pub async fn stats(&self) -> ServiceStats {
        let catalog = self.catalog.load();
        let services: Vec<String> = catalog.service_names().into_iter().collect();
        ServiceStats {
            service_count: services.len(),
            method_count: catalog.method_count(),
            connected: self.connection.is_live().await,
            services,
        }
    }

    /// Closes the connection and clears the published catalog.
    pub async fn close(&self) {
        *self.reflection.write().await = None;
        self.connection.close().await;
        self.catalog.publish(ToolCatalog::default());
        self.set_state(LifecycleState::Closed);
        tracing::info!("service discoverer closed");
    }

    /// Returns the reflection client for the current connection generation.
    async fn reflection_client(&self) -> Result<Arc<ReflectionClient>> {
        self.reflection.read().await.clone().ok_or(GatewayError::NotConnected)
    }

    /// Records a lifecycle transition.
    fn set_state(&self, next: LifecycleState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Returns whether a service name belongs to a reserved internal prefix.
#[must_use]
pub fn is_internal_service(service_name: &str) -> bool {
    INTERNAL_SERVICE_PREFIXES.iter().any(|prefix| service_name.starts_with(prefix))
}
