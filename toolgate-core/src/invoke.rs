// toolgate-core/src/invoke.rs
// ============================================================================
// Module: Dynamic Invoker
// Description: JSON to dynamic-message codec and unary call dispatch.
// Purpose: Invoke catalogued methods with JSON arguments and metadata.
// Dependencies: http, prost-reflect, serde_json, tonic
// ============================================================================

//! ## Overview
//! An invocation parses the caller's JSON arguments into a dynamic message
//! typed by the method's input descriptor, attaches forwarded metadata,
//! derives the on-wire path from the declared method name, and performs a
//! unary call on the shared channel. The response serializes back to JSON
//! through the canonical protobuf JSON mapping. Streaming methods are
//! rejected before any traffic reaches the backend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use http::uri::PathAndQuery;
use prost_reflect::DynamicMessage;
use tonic::Request;
use tonic::client::Grpc;
use tonic::metadata::AsciiMetadataKey;
use tonic::metadata::AsciiMetadataValue;
use tonic::metadata::MetadataMap;
use tonic::transport::Channel;

use crate::catalog::MethodRecord;
use crate::codec::DynamicCodec;
use crate::error::GatewayError;
use crate::error::Result;

/// Default per-call deadline when the caller does not tighten it.
pub const DEFAULT_CALL_DEADLINE: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Invoker
// ============================================================================

/// Dispatches unary calls for dynamically-typed methods.
#[derive(Debug, Clone)]
pub struct DynamicInvoker {
    /// Shared backend channel.
    channel: Channel,
    /// Maximum per-message size in either direction.
    max_message_bytes: usize,
}

impl DynamicInvoker {
    /// Creates an invoker over an open channel.
    #[must_use]
    pub const fn new(channel: Channel, max_message_bytes: usize) -> Self {
        Self {
            channel,
            max_message_bytes,
        }
    }

    /// Invokes a unary method with JSON arguments.
    ///
    /// Empty input and the literal `{}` both produce an empty request
    /// message. The response is returned as canonical protobuf JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unsupported`] for streaming methods,
    /// [`GatewayError::InvalidArgument`] when the input does not match the
    /// method's input schema, and the mapped transport status otherwise.
    pub async fn invoke(
        &self,
        record: &MethodRecord,
        input_json: &str,
        metadata: &BTreeMap<String, String>,
        deadline: Duration,
    ) -> Result<String> {
        if record.is_streaming() {
            return Err(GatewayError::Unsupported(format!(
                "method {} is streaming and cannot be invoked",
                record.full_name
            )));
        }
        let input = decode_input(record, input_json)?;
        let mut request = Request::new(input);
        request.set_timeout(deadline);
        attach_metadata(request.metadata_mut(), metadata)?;
        let path: PathAndQuery = record.wire_path().parse().map_err(|_| {
            GatewayError::Internal(format!("method {} has an invalid wire path", record.full_name))
        })?;
        let mut grpc = Grpc::new(self.channel.clone())
            .max_decoding_message_size(self.max_message_bytes)
            .max_encoding_message_size(self.max_message_bytes);
        grpc.ready()
            .await
            .map_err(|_| GatewayError::Transport("backend channel not ready".to_string()))?;
        let codec = DynamicCodec::new(record.output.clone());
        let response = grpc.unary(request, path, codec).await.map_err(GatewayError::from)?;
        let output = response.into_inner();
        serde_json::to_string(&output)
            .map_err(|_| GatewayError::Internal("response serialization failed".to_string()))
    }
}

/// Parses caller JSON into a dynamic message typed by the input descriptor.
fn decode_input(record: &MethodRecord, input_json: &str) -> Result<DynamicMessage> {
    let trimmed = input_json.trim();
    if trimmed.is_empty() || trimmed == "{}" {
        return Ok(DynamicMessage::new(record.input.clone()));
    }
    let mut deserializer = serde_json::Deserializer::from_str(trimmed);
    let message =
        DynamicMessage::deserialize(record.input.clone(), &mut deserializer).map_err(|err| {
            GatewayError::InvalidArgument(format!(
                "arguments do not match {}: {err}",
                record.input.full_name()
            ))
        })?;
    deserializer.end().map_err(|_| {
        GatewayError::InvalidArgument("trailing content after argument object".to_string())
    })?;
    Ok(message)
}

/// Attaches forwarded metadata pairs to the outgoing call.
fn attach_metadata(metadata: &mut MetadataMap, headers: &BTreeMap<String, String>) -> Result<()> {
    for (name, value) in headers {
        let key = AsciiMetadataKey::from_bytes(name.to_ascii_lowercase().as_bytes())
            .map_err(|_| GatewayError::InvalidArgument(format!("invalid metadata key {name}")))?;
        let value = AsciiMetadataValue::try_from(value.as_str()).map_err(|_| {
            GatewayError::InvalidArgument(format!("invalid metadata value for key {name}"))
        })?;
        metadata.insert(key, value);
    }
    Ok(())
}
