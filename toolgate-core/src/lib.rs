// toolgate-core/src/lib.rs
// ============================================================================
// Module: Toolgate Core
// Description: Discovery, schema projection, and dynamic invocation.
// Purpose: Expose backend gRPC methods as schema-described callable tools.
// Dependencies: prost-reflect, tonic, tokio
// ============================================================================

//! ## Overview
//! Toolgate core turns one gRPC backend into a catalog of callable tools.
//! Discovery reads either an offline descriptor set or the server-reflection
//! sub-protocol, message types project deterministically to JSON Schema, and
//! invocations drive dynamic messages over a managed channel. The enclosing
//! JSON-RPC layer consumes [`ServiceDiscoverer`], [`ToolCatalog`], and
//! [`SchemaProjector`]; everything else is plumbing behind them.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod codec;
pub mod connection;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod invoke;
pub mod reflection;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::CatalogHandle;
pub use catalog::MethodRecord;
pub use catalog::ToolCatalog;
pub use catalog::derive_tool_id;
pub use catalog::normalize_service_name;
pub use codec::DynamicCodec;
pub use connection::ConnectionConfig;
pub use connection::ConnectionManager;
pub use connection::DEFAULT_MAX_MESSAGE_BYTES;
pub use descriptor::CommentIndex;
pub use descriptor::TypeRegistry;
pub use descriptor::load_descriptor_file;
pub use descriptor::load_descriptor_set;
pub use descriptor::methods_from_registry;
pub use descriptor::registry_from_files;
pub use discovery::DiscoveryConfig;
pub use discovery::LifecycleState;
pub use discovery::ServiceDiscoverer;
pub use discovery::ServiceStats;
pub use discovery::is_internal_service;
pub use error::ErrorKind;
pub use error::GatewayError;
pub use error::Result;
pub use invoke::DEFAULT_CALL_DEADLINE;
pub use invoke::DynamicInvoker;
pub use reflection::ReflectionClient;
pub use schema::SchemaProjector;

#[cfg(test)]
pub(crate) mod test_support;
