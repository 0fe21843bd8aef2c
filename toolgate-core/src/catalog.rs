// toolgate-core/src/catalog.rs
// ============================================================================
// Module: Tool Catalog
// Description: Method records, tool identifier derivation, and the published
// catalog snapshot.
// Purpose: Map stable tool identifiers to invokable backend methods.
// Dependencies: arc-swap, prost-reflect
// ============================================================================

//! ## Overview
//! Discovery flattens every service method into a [`MethodRecord`] and keys
//! it by a derived tool identifier. The resulting [`ToolCatalog`] is
//! immutable and published wholesale through [`CatalogHandle`], so readers
//! always observe either the previous snapshot or the next one, never a
//! partial mixture.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use prost_reflect::MessageDescriptor;
use prost_reflect::MethodDescriptor;

use crate::descriptor::CommentIndex;

// ============================================================================
// SECTION: Identifier Derivation
// ============================================================================

/// Derives a tool identifier from a qualified method name.
///
/// The entire name is lowercased and every `.` becomes `_`:
/// `hello.HelloService.SayHello` yields `hello_helloservice_sayhello`.
#[must_use]
pub fn derive_tool_id(qualified_name: &str) -> String {
    qualified_name.to_ascii_lowercase().replace('.', "_")
}

/// Normalizes a fully-qualified service name to its last two path segments.
///
/// Offline descriptor sets may carry deeply nested packages
/// (`com.example.hello.HelloService`); the reflection path reports
/// `hello.HelloService` for the same service. Truncating to the terminal two
/// segments keeps tool identifiers identical across both discovery paths.
/// Two unrelated packages sharing a terminal element can collide after this
/// mapping; the collision surfaces as a duplicate tool identifier when the
/// catalog is built.
#[must_use]
pub fn normalize_service_name(full_name: &str) -> String {
    let mut parts = full_name.rsplit('.');
    let Some(service) = parts.next() else {
        return full_name.to_string();
    };
    match parts.next() {
        Some(package) => format!("{package}.{service}"),
        None => service.to_string(),
    }
}

// ============================================================================
// SECTION: Method Records
// ============================================================================

/// The flattened description of one backend method.
#[derive(Debug, Clone)]
pub struct MethodRecord {
    /// Simple method name (`SayHello`).
    pub name: String,
    /// Fully-qualified method name as declared (`pkg.Service.Method`).
    pub full_name: String,
    /// Service name normalized to its last two segments.
    pub service_name: String,
    /// Human-readable description from source comments when available.
    pub description: String,
    /// Resolved input message descriptor.
    pub input: MessageDescriptor,
    /// Resolved output message descriptor.
    pub output: MessageDescriptor,
    /// Whether the client streams requests.
    pub client_streaming: bool,
    /// Whether the server streams responses.
    pub server_streaming: bool,
    /// Derived tool identifier.
    pub tool_id: String,
}

impl MethodRecord {
    /// Builds a record from a resolved method descriptor.
    #[must_use]
    pub fn from_method(method: &MethodDescriptor, comments: &CommentIndex) -> Self {
        let name = method.name().to_string();
        let full_name = method.full_name().to_string();
        let service_name = normalize_service_name(method.parent_service().full_name());
        let description = comments.get(&full_name).map_or_else(
            || format!("Calls the {name} method of the {service_name} service"),
            ToString::to_string,
        );
        let tool_id = derive_tool_id(&format!("{service_name}.{name}"));
        Self {
            name,
            full_name,
            service_name,
            description,
            input: method.input(),
            output: method.output(),
            client_streaming: method.is_client_streaming(),
            server_streaming: method.is_server_streaming(),
            tool_id,
        }
    }

    /// Returns whether either direction of the method streams.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.client_streaming || self.server_streaming
    }

    /// Returns the service name exactly as declared by the backend.
    #[must_use]
    pub fn declared_service(&self) -> &str {
        match self.full_name.rfind('.') {
            Some(index) => &self.full_name[..index],
            None => &self.full_name,
        }
    }

    /// Returns the on-wire request path for this method.
    ///
    /// The path is `/<declared-service>/<method>`, derived by truncating the
    /// declared full name at its last `.`. The declared name is used rather
    /// than the normalized one because the backend routes on the real
    /// package path.
    #[must_use]
    pub fn wire_path(&self) -> String {
        format!("/{}/{}", self.declared_service(), self.name)
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Immutable mapping from tool identifier to method record.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    /// Records keyed by tool identifier.
    records: BTreeMap<String, MethodRecord>,
    /// Source comments for schema projection.
    comments: CommentIndex,
}

impl ToolCatalog {
    /// Builds a catalog from discovered records.
    ///
    /// Records with malformed identifiers and identifier collisions are
    /// logged and dropped; the first record wins a collision.
    #[must_use]
    pub fn from_records(records: Vec<MethodRecord>, comments: CommentIndex) -> Self {
        let mut map: BTreeMap<String, MethodRecord> = BTreeMap::new();
        for record in records {
            if !record.tool_id.contains('_') {
                tracing::warn!(
                    tool_id = %record.tool_id,
                    method = %record.full_name,
                    "dropping method with malformed tool identifier"
                );
                continue;
            }
            if let Some(existing) = map.get(&record.tool_id) {
                tracing::warn!(
                    tool_id = %record.tool_id,
                    kept = %existing.full_name,
                    dropped = %record.full_name,
                    "dropping method with duplicate tool identifier"
                );
                continue;
            }
            map.insert(record.tool_id.clone(), record);
        }
        Self {
            records: map,
            comments,
        }
    }

    /// Looks up a record by tool identifier.
    #[must_use]
    pub fn get(&self, tool_id: &str) -> Option<&MethodRecord> {
        self.records.get(tool_id)
    }

    /// Iterates all records in identifier order.
    pub fn records(&self) -> impl Iterator<Item = &MethodRecord> {
        self.records.values()
    }

    /// Returns the comment index captured at discovery time.
    #[must_use]
    pub const fn comments(&self) -> &CommentIndex {
        &self.comments
    }

    /// Returns the number of catalogued methods.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.records.len()
    }

    /// Returns the sorted set of distinct service names.
    #[must_use]
    pub fn service_names(&self) -> BTreeSet<String> {
        self.records.values().map(|record| record.service_name.clone()).collect()
    }

    /// Returns whether the catalog holds no methods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Atomically-replaceable reference to the published catalog.
///
/// Publication is a single atomic store; per-call lookups capture the
/// snapshot once at entry and keep using it even if a rediscovery publishes
/// a replacement mid-call.
#[derive(Debug)]
pub struct CatalogHandle {
    /// Current catalog snapshot.
    inner: ArcSwap<ToolCatalog>,
}

impl CatalogHandle {
    /// Creates a handle holding an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(ToolCatalog::default()),
        }
    }

    /// Loads the current catalog snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<ToolCatalog> {
        self.inner.load_full()
    }

    /// Publishes a new catalog, replacing the previous snapshot wholesale.
    pub fn publish(&self, catalog: ToolCatalog) {
        self.inner.store(Arc::new(catalog));
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::new()
    }
}
