// toolgate-core/src/schema.rs
// ============================================================================
// Module: Schema Projector
// Description: Deterministic projection of message descriptors to JSON Schema.
// Purpose: Describe tool arguments and results to agents.
// Dependencies: prost-reflect, serde_json
// ============================================================================

//! ## Overview
//! Each tool's input and output message is projected to a JSON Schema object
//! with `type`, `properties`, `required`, and comment-derived `description`
//! members. Well-known wrapper, temporal, and structural types map to their
//! canonical JSON shapes instead of recursive expansion. Cyclic type graphs
//! terminate through an on-stack name set: re-entering a message already on
//! the recursion stack emits a `$ref` into the schema's `definitions`
//! section. A field that cannot be projected is logged and omitted; the rest
//! of the message continues.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use prost_reflect::EnumDescriptor;
use prost_reflect::FieldDescriptor;
use prost_reflect::Kind;
use prost_reflect::MessageDescriptor;
use prost_reflect::OneofDescriptor;
use prost_types::field_descriptor_proto::Type as ProtoType;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::descriptor::CommentIndex;
use crate::error::GatewayError;
use crate::error::Result;

// ============================================================================
// SECTION: Projector
// ============================================================================

/// Projects message descriptors into JSON Schema values.
#[derive(Debug, Clone, Copy)]
pub struct SchemaProjector<'a> {
    /// Source comments carried through into descriptions.
    comments: &'a CommentIndex,
}

impl<'a> SchemaProjector<'a> {
    /// Creates a projector over the given comment index.
    #[must_use]
    pub const fn new(comments: &'a CommentIndex) -> Self {
        Self {
            comments,
        }
    }

    /// Projects a message descriptor to a JSON Schema object.
    ///
    /// When the type graph under the message contains cycles, a
    /// `definitions` section is attached so every emitted `$ref` resolves
    /// within the document.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unsupported`] when the message itself cannot
    /// be represented; individual field failures are logged and skipped.
    pub fn project(&self, message: &MessageDescriptor) -> Result<Value> {
        let mut stack = BTreeSet::new();
        let mut cycles = BTreeSet::new();
        let mut schema = self.message_schema(message, &mut stack, &mut cycles)?;
        if cycles.is_empty() {
            return Ok(schema);
        }
        let definitions = self.cycle_definitions(message, &cycles)?;
        if let Value::Object(root) = &mut schema {
            root.insert("definitions".to_string(), Value::Object(definitions));
        }
        Ok(schema)
    }

    /// Projects every cycle target into a `definitions` map.
    fn cycle_definitions(
        &self,
        origin: &MessageDescriptor,
        cycles: &BTreeSet<String>,
    ) -> Result<Map<String, Value>> {
        let pool = origin.parent_pool();
        let mut definitions = Map::new();
        let mut pending: Vec<String> = cycles.iter().cloned().collect();
        let mut seen: BTreeSet<String> = cycles.clone();
        while let Some(name) = pending.pop() {
            let Some(target) = pool.get_message_by_name(&name) else {
                return Err(GatewayError::Internal(format!(
                    "cycle target {name} missing from registry"
                )));
            };
            let mut stack = BTreeSet::new();
            let mut nested = BTreeSet::new();
            let definition = self.message_schema(&target, &mut stack, &mut nested)?;
            definitions.insert(name, definition);
            for extra in nested {
                if seen.insert(extra.clone()) {
                    pending.push(extra);
                }
            }
        }
        Ok(definitions)
    }

    /// Projects one message, breaking recursion at types already on stack.
    fn message_schema(
        &self,
        message: &MessageDescriptor,
        stack: &mut BTreeSet<String>,
        cycles: &mut BTreeSet<String>,
    ) -> Result<Value> {
        let full_name = message.full_name().to_string();
        if stack.contains(&full_name) {
            cycles.insert(full_name.clone());
            return Ok(json!({ "$ref": format!("#/definitions/{full_name}") }));
        }
        stack.insert(full_name.clone());
        let schema = self.message_schema_fields(message, stack, cycles);
        stack.remove(&full_name);
        schema
    }

    /// Projects the fields and one-of groups of a message.
    fn message_schema_fields(
        &self,
        message: &MessageDescriptor,
        stack: &mut BTreeSet<String>,
        cycles: &mut BTreeSet<String>,
    ) -> Result<Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in message.fields() {
            match self.field_schema(&field, stack, cycles) {
                Ok(schema) => {
                    properties.insert(field.name().to_string(), schema);
                    // Fields with presence tracking (explicit optional marker,
                    // one-of membership, or singular message type) are never
                    // required; plain singular scalars and repeated/map
                    // fields are.
                    if !field.supports_presence() {
                        required.push(Value::String(field.name().to_string()));
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        message = %message.full_name(),
                        field = %field.name(),
                        %error,
                        "skipping field that failed schema projection"
                    );
                }
            }
        }
        for oneof in message.oneofs() {
            if is_synthetic_oneof(&oneof) {
                continue;
            }
            properties.insert(
                oneof.name().to_string(),
                self.oneof_schema(message, &oneof, stack, cycles),
            );
        }
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        if let Some(comment) = self.comments.get(message.full_name()) {
            schema.insert("description".to_string(), Value::String(comment.to_string()));
        }
        Ok(Value::Object(schema))
    }

    /// Projects a one-of group to an object with one alternative per member.
    fn oneof_schema(
        &self,
        message: &MessageDescriptor,
        oneof: &OneofDescriptor,
        stack: &mut BTreeSet<String>,
        cycles: &mut BTreeSet<String>,
    ) -> Value {
        let mut alternatives = Vec::new();
        for field in oneof.fields() {
            match self.field_schema(&field, stack, cycles) {
                Ok(schema) => {
                    alternatives.push(json!({
                        "type": "object",
                        "properties": { field.name(): schema },
                        "required": [field.name()],
                    }));
                }
                Err(error) => {
                    tracing::warn!(
                        message = %message.full_name(),
                        field = %field.name(),
                        %error,
                        "skipping one-of alternative that failed schema projection"
                    );
                }
            }
        }
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("oneOf".to_string(), Value::Array(alternatives));
        let symbol = format!("{}.{}", message.full_name(), oneof.name());
        if let Some(comment) = self.comments.get(&symbol) {
            schema.insert("description".to_string(), Value::String(comment.to_string()));
        }
        Value::Object(schema)
    }

    /// Projects a single field, applying cardinality.
    fn field_schema(
        &self,
        field: &FieldDescriptor,
        stack: &mut BTreeSet<String>,
        cycles: &mut BTreeSet<String>,
    ) -> Result<Value> {
        let symbol = format!("{}.{}", field.parent_message().full_name(), field.name());
        let comment = self.comments.get(&symbol).map(ToString::to_string);
        if field.is_map() {
            let Kind::Message(entry) = field.kind() else {
                return Err(GatewayError::Internal(format!(
                    "map field {symbol} has a non-message entry type"
                )));
            };
            let value_schema =
                self.type_schema(&entry.map_entry_value_field(), stack, cycles)?;
            let mut schema = Map::new();
            schema.insert("type".to_string(), Value::String("object".to_string()));
            schema.insert("patternProperties".to_string(), json!({ ".*": value_schema }));
            schema.insert("additionalProperties".to_string(), Value::Bool(false));
            if let Some(comment) = comment {
                schema.insert("description".to_string(), Value::String(comment));
            }
            return Ok(Value::Object(schema));
        }
        if field.is_list() {
            let item_schema = self.type_schema(field, stack, cycles)?;
            let mut schema = Map::new();
            schema.insert("type".to_string(), Value::String("array".to_string()));
            schema.insert("items".to_string(), item_schema);
            if let Some(comment) = comment {
                schema.insert("description".to_string(), Value::String(comment));
            }
            return Ok(Value::Object(schema));
        }
        let mut schema = self.type_schema(field, stack, cycles)?;
        if let (Value::Object(map), Some(comment)) = (&mut schema, comment) {
            map.insert("description".to_string(), Value::String(comment));
        }
        Ok(schema)
    }

    /// Projects the element type of a field.
    fn type_schema(
        &self,
        field: &FieldDescriptor,
        stack: &mut BTreeSet<String>,
        cycles: &mut BTreeSet<String>,
    ) -> Result<Value> {
        if field.field_descriptor_proto().r#type() == ProtoType::Group {
            return Err(GatewayError::Unsupported(format!(
                "field kind group for field {}.{}",
                field.parent_message().full_name(),
                field.name()
            )));
        }
        let schema = match field.kind() {
            Kind::Bool => json!({ "type": "boolean" }),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
                json!({ "type": "integer", "format": "int32" })
            }
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
                json!({ "type": "integer", "format": "int64" })
            }
            Kind::Uint32 | Kind::Fixed32 => {
                json!({ "type": "integer", "format": "uint32", "minimum": 0 })
            }
            Kind::Uint64 | Kind::Fixed64 => {
                json!({ "type": "integer", "format": "uint64", "minimum": 0 })
            }
            Kind::Float => json!({ "type": "number", "format": "float" }),
            Kind::Double => json!({ "type": "number", "format": "double" }),
            Kind::String => json!({ "type": "string" }),
            Kind::Bytes => json!({ "type": "string", "format": "byte" }),
            Kind::Enum(entry) => self.enum_schema(&entry),
            Kind::Message(message) => match well_known_schema(&message) {
                Some(schema) => schema,
                None => self.message_schema(&message, stack, cycles)?,
            },
        };
        Ok(schema)
    }

    /// Projects an enum to its label set with per-label descriptions.
    fn enum_schema(&self, entry: &EnumDescriptor) -> Value {
        let mut labels = Vec::new();
        let mut label_descriptions = Map::new();
        for value in entry.values() {
            labels.push(Value::String(value.name().to_string()));
            let symbol = format!("{}.{}", entry.full_name(), value.name());
            if let Some(comment) = self.comments.get(&symbol) {
                label_descriptions
                    .insert(value.name().to_string(), Value::String(comment.to_string()));
            }
        }
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("string".to_string()));
        schema.insert("enum".to_string(), Value::Array(labels));
        if let Some(comment) = self.comments.get(entry.full_name()) {
            schema.insert("description".to_string(), Value::String(comment.to_string()));
        }
        if !label_descriptions.is_empty() {
            schema.insert("enumDescriptions".to_string(), Value::Object(label_descriptions));
        }
        Value::Object(schema)
    }
}

// ============================================================================
// SECTION: Well-Known Types
// ============================================================================

/// Returns the canonical JSON shape for well-known message types.
fn well_known_schema(message: &MessageDescriptor) -> Option<Value> {
    let schema = match message.full_name() {
        "google.protobuf.Timestamp" => json!({
            "type": "string",
            "format": "date-time",
            "description": "RFC 3339 formatted timestamp",
        }),
        "google.protobuf.Duration" => json!({
            "type": "string",
            "format": "duration",
            "description": "Duration in seconds with up to 9 fractional digits",
        }),
        "google.protobuf.Any" => json!({
            "type": "object",
            "description": "Any contains an arbitrary serialized protocol buffer message",
        }),
        "google.protobuf.Struct" => json!({
            "type": "object",
            "description": "Arbitrary JSON-like structure",
        }),
        "google.protobuf.Value" => json!({ "description": "Any JSON value" }),
        "google.protobuf.ListValue" => json!({
            "type": "array",
            "description": "Array of JSON values",
        }),
        "google.protobuf.StringValue" | "google.protobuf.BytesValue" => {
            json!({ "type": "string" })
        }
        "google.protobuf.BoolValue" => json!({ "type": "boolean" }),
        "google.protobuf.Int32Value"
        | "google.protobuf.UInt32Value"
        | "google.protobuf.Int64Value"
        | "google.protobuf.UInt64Value" => json!({ "type": "integer" }),
        "google.protobuf.FloatValue" | "google.protobuf.DoubleValue" => {
            json!({ "type": "number" })
        }
        _ => return None,
    };
    Some(schema)
}

/// Returns whether a one-of group was synthesized for a proto3 optional field.
fn is_synthetic_oneof(oneof: &OneofDescriptor) -> bool {
    let fields: Vec<FieldDescriptor> = oneof.fields().collect();
    fields.len() == 1 && fields[0].field_descriptor_proto().proto3_optional()
}

#[cfg(test)]
mod tests;
