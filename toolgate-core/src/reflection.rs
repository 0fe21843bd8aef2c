// toolgate-core/src/reflection.rs
// ============================================================================
// Module: Reflection Client
// Description: Client for the backend's server-reflection sub-protocol.
// Purpose: Fetch service lists and file descriptors on demand, with caching.
// Dependencies: tokio, tokio-stream, tonic, tonic-reflection
// ============================================================================

//! ## Overview
//! Server reflection is a bidirectional stream, but this gateway only ever
//! needs single request/response exchanges: each call opens a fresh
//! sub-stream on the shared channel, sends one request, reads one response,
//! and drops the send side. Fetched file descriptors are cached under both
//! the requested symbol and the file's own name so any later symbol from the
//! same file short-circuits. The backend schema is assumed stable for the
//! life of a connection; reconnection builds a fresh client and discards the
//! cache.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use prost::Message;
use prost_types::FileDescriptorProto;
use tokio::sync::RwLock;
use tonic::Code;
use tonic::Request;
use tonic::transport::Channel;
use tonic_reflection::pb::v1alpha::ErrorResponse;
use tonic_reflection::pb::v1alpha::ServerReflectionRequest;
use tonic_reflection::pb::v1alpha::server_reflection_client::ServerReflectionClient;
use tonic_reflection::pb::v1alpha::server_reflection_request::MessageRequest;
use tonic_reflection::pb::v1alpha::server_reflection_response::MessageResponse;

use crate::error::GatewayError;
use crate::error::Result;

/// Default deadline for a single reflection exchange.
pub const DEFAULT_EXCHANGE_DEADLINE: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Reflection Client
// ============================================================================

/// Client for the reflection sub-protocol on one backend channel.
#[derive(Debug)]
pub struct ReflectionClient {
    /// Shared backend channel.
    channel: Channel,
    /// Maximum per-message size for reflection exchanges.
    max_message_bytes: usize,
    /// File descriptors keyed by requested symbol and by file name.
    cache: RwLock<BTreeMap<String, FileDescriptorProto>>,
}

impl ReflectionClient {
    /// Creates a client over an open channel.
    #[must_use]
    pub fn new(channel: Channel, max_message_bytes: usize) -> Self {
        Self {
            channel,
            max_message_bytes,
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// Lists the full names of all services registered on the backend.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] on stream failure and
    /// [`GatewayError::Timeout`] when the deadline elapses.
    pub async fn list_services(&self, deadline: Duration) -> Result<Vec<String>> {
        let response =
            self.exchange(MessageRequest::ListServices(String::new()), deadline).await?;
        match response {
            MessageResponse::ListServicesResponse(list) => {
                Ok(list.service.into_iter().map(|service| service.name).collect())
            }
            MessageResponse::ErrorResponse(error) => Err(reflection_error("services", &error)),
            _ => Err(GatewayError::Internal(
                "unexpected reflection response to list request".to_string(),
            )),
        }
    }

    /// Fetches the file descriptors that transitively supply a symbol.
    ///
    /// The containing file is first; any transitive dependencies the backend
    /// chose to include follow. Results are cached permanently for the life
    /// of this client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when the backend does not know the
    /// symbol, [`GatewayError::DescriptorCorrupt`] when a returned
    /// descriptor fails to parse, and transport/timeout errors otherwise.
    pub async fn file_for_symbol(
        &self,
        symbol: &str,
        deadline: Duration,
    ) -> Result<Vec<FileDescriptorProto>> {
        if let Some(cached) = self.cache.read().await.get(symbol) {
            return Ok(vec![cached.clone()]);
        }
        let response = self
            .exchange(MessageRequest::FileContainingSymbol(symbol.to_string()), deadline)
            .await?;
        let payload = match response {
            MessageResponse::FileDescriptorResponse(payload) => payload,
            MessageResponse::ErrorResponse(error) => return Err(reflection_error(symbol, &error)),
            _ => {
                return Err(GatewayError::Internal(
                    "unexpected reflection response to symbol request".to_string(),
                ));
            }
        };
        if payload.file_descriptor_proto.is_empty() {
            return Err(GatewayError::NotFound(format!("symbol {symbol}")));
        }
        let mut files = Vec::with_capacity(payload.file_descriptor_proto.len());
        for bytes in payload.file_descriptor_proto {
            let file = FileDescriptorProto::decode(bytes.as_slice()).map_err(|_| {
                GatewayError::DescriptorCorrupt(format!(
                    "reflection descriptor for {symbol} failed to parse"
                ))
            })?;
            files.push(file);
        }
        let mut cache = self.cache.write().await;
        if let Some(first) = files.first() {
            cache.insert(symbol.to_string(), first.clone());
        }
        for file in &files {
            if !file.name().is_empty() {
                cache.insert(file.name().to_string(), file.clone());
            }
        }
        Ok(files)
    }

    /// Probes backend health with a short list-services exchange.
    ///
    /// # Errors
    ///
    /// Returns the underlying exchange error when the backend is unhealthy.
    pub async fn health_probe(&self, deadline: Duration) -> Result<()> {
        self.list_services(deadline).await.map(|_| ())
    }

    /// Runs one request/response exchange on a fresh sub-stream.
    async fn exchange(
        &self,
        request: MessageRequest,
        deadline: Duration,
    ) -> Result<MessageResponse> {
        let mut client = ServerReflectionClient::new(self.channel.clone())
            .max_decoding_message_size(self.max_message_bytes)
            .max_encoding_message_size(self.max_message_bytes);
        let outbound = tokio_stream::once(ServerReflectionRequest {
            host: String::new(),
            message_request: Some(request),
        });
        let fut = async move {
            let response = client
                .server_reflection_info(Request::new(outbound))
                .await
                .map_err(GatewayError::from)?;
            let mut inbound = response.into_inner();
            let message = inbound
                .message()
                .await
                .map_err(GatewayError::from)?
                .ok_or_else(|| GatewayError::Transport("reflection stream closed".to_string()))?;
            message.message_response.ok_or_else(|| {
                GatewayError::Internal("reflection response missing payload".to_string())
            })
        };
        tokio::time::timeout(deadline, fut)
            .await
            .map_err(|_| GatewayError::Timeout("reflection exchange deadline elapsed".to_string()))?
    }
}

/// Maps a reflection error payload onto the gateway taxonomy.
fn reflection_error(subject: &str, error: &ErrorResponse) -> GatewayError {
    match Code::from(error.error_code) {
        Code::NotFound => GatewayError::NotFound(format!("symbol {subject}")),
        code => GatewayError::Transport(format!("reflection request failed with status {code:?}")),
    }
}
