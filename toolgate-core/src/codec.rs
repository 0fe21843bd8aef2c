// toolgate-core/src/codec.rs
// ============================================================================
// Module: Dynamic Codec
// Description: Wire codec for messages whose shape is known only at runtime.
// Purpose: Encode and decode dynamic messages on unary calls.
// Dependencies: prost, prost-reflect, tonic
// ============================================================================

//! ## Overview
//! The backend's methods are not known at build time, so calls cannot use a
//! generated codec. This codec drives the standard protobuf wire format
//! through [`DynamicMessage`], carrying the output descriptor so responses
//! decode into a correctly-typed message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use prost::Message;
use prost_reflect::DynamicMessage;
use prost_reflect::MessageDescriptor;
use tonic::Status;
use tonic::codec::Codec;
use tonic::codec::DecodeBuf;
use tonic::codec::Decoder;
use tonic::codec::EncodeBuf;
use tonic::codec::Encoder;

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Codec for unary calls on dynamically-typed methods.
#[derive(Debug, Clone)]
pub struct DynamicCodec {
    /// Descriptor of the response message type.
    output: MessageDescriptor,
}

impl DynamicCodec {
    /// Creates a codec that decodes responses as the given message type.
    #[must_use]
    pub const fn new(output: MessageDescriptor) -> Self {
        Self {
            output,
        }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;
    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder {
            output: self.output.clone(),
        }
    }
}

/// Encoder half of [`DynamicCodec`].
#[derive(Debug)]
pub struct DynamicEncoder;

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: DynamicMessage, dst: &mut EncodeBuf<'_>) -> Result<(), Status> {
        item.encode(dst)
            .map_err(|err| Status::internal(format!("request encoding failed: {err}")))
    }
}

/// Decoder half of [`DynamicCodec`].
#[derive(Debug)]
pub struct DynamicDecoder {
    /// Descriptor used to type decoded responses.
    output: MessageDescriptor,
}

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<DynamicMessage>, Status> {
        let mut message = DynamicMessage::new(self.output.clone());
        message
            .merge(src)
            .map_err(|err| Status::internal(format!("response decoding failed: {err}")))?;
        Ok(Some(message))
    }
}
