// toolgate-core/src/descriptor.rs
// ============================================================================
// Module: Descriptor Loader
// Description: Offline descriptor-set parsing and the indexed type registry.
// Purpose: Build a dependency-complete registry with source comments.
// Dependencies: prost, prost-reflect, prost-types
// ============================================================================

//! ## Overview
//! The offline discovery path starts from a serialized `FileDescriptorSet`
//! produced by the schema compiler. Files are registered in dependency order
//! so every type reference resolves; imports that are absent from the blob
//! fall back to the built-in well-known schema files (timestamps, wrappers,
//! structural values). When the blob was compiled with source info, leading
//! and trailing comments are indexed by fully-qualified symbol for schema
//! projection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;

use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::DescriptorProto;
use prost_types::EnumDescriptorProto;
use prost_types::FileDescriptorProto;
use prost_types::FileDescriptorSet;
use prost_types::source_code_info::Location;

use crate::catalog::MethodRecord;
use crate::error::GatewayError;
use crate::error::Result;

/// Maximum accepted descriptor-set file size in bytes.
pub const MAX_DESCRIPTOR_FILE_SIZE: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Comment Index
// ============================================================================

/// Source comments keyed by fully-qualified symbol name.
///
/// Keys follow the registry's own convention: messages and enums use their
/// qualified name (`pkg.Outer.Inner`), fields and oneofs append the member
/// name, and enum values append the value label to the enum's qualified name.
/// The index is empty when descriptors arrive without source info, which is
/// the normal case on the reflection path.
#[derive(Debug, Clone, Default)]
pub struct CommentIndex {
    /// Combined leading/trailing comments per symbol.
    entries: BTreeMap<String, String>,
}

impl CommentIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the comment recorded for a symbol.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.entries.get(symbol).map(String::as_str)
    }

    /// Returns the number of indexed symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the index holds no comments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexes every commented symbol of one file descriptor.
    pub fn add_file(&mut self, file: &FileDescriptorProto) {
        let Some(info) = &file.source_code_info else {
            return;
        };
        let mut locations: BTreeMap<&[i32], String> = BTreeMap::new();
        for location in &info.location {
            if let Some(text) = combined_comment(location) {
                locations.insert(location.path.as_slice(), text);
            }
        }
        if locations.is_empty() {
            return;
        }
        let package = file.package();
        for (index, message) in file.message_type.iter().enumerate() {
            let path = vec![4, to_index(index)];
            self.add_message(message, &path, &qualify(package, message.name()), &locations);
        }
        for (index, entry) in file.enum_type.iter().enumerate() {
            let path = vec![5, to_index(index)];
            self.add_enum(entry, &path, &qualify(package, entry.name()), &locations);
        }
        for (index, service) in file.service.iter().enumerate() {
            let service_path = vec![6, to_index(index)];
            let service_name = qualify(package, service.name());
            self.record(&service_name, &service_path, &locations);
            for (method_index, method) in service.method.iter().enumerate() {
                let mut path = service_path.clone();
                path.push(2);
                path.push(to_index(method_index));
                self.record(&qualify(&service_name, method.name()), &path, &locations);
            }
        }
    }

    /// Indexes a message, its members, and its nested types.
    fn add_message(
        &mut self,
        message: &DescriptorProto,
        path: &[i32],
        qualified: &str,
        locations: &BTreeMap<&[i32], String>,
    ) {
        self.record(qualified, path, locations);
        for (index, field) in message.field.iter().enumerate() {
            let mut field_path = path.to_vec();
            field_path.push(2);
            field_path.push(to_index(index));
            self.record(&qualify(qualified, field.name()), &field_path, locations);
        }
        for (index, oneof) in message.oneof_decl.iter().enumerate() {
            let mut oneof_path = path.to_vec();
            oneof_path.push(8);
            oneof_path.push(to_index(index));
            self.record(&qualify(qualified, oneof.name()), &oneof_path, locations);
        }
        for (index, nested) in message.nested_type.iter().enumerate() {
            let mut nested_path = path.to_vec();
            nested_path.push(3);
            nested_path.push(to_index(index));
            self.add_message(nested, &nested_path, &qualify(qualified, nested.name()), locations);
        }
        for (index, nested) in message.enum_type.iter().enumerate() {
            let mut nested_path = path.to_vec();
            nested_path.push(4);
            nested_path.push(to_index(index));
            self.add_enum(nested, &nested_path, &qualify(qualified, nested.name()), locations);
        }
    }

    /// Indexes an enum and its values.
    fn add_enum(
        &mut self,
        entry: &EnumDescriptorProto,
        path: &[i32],
        qualified: &str,
        locations: &BTreeMap<&[i32], String>,
    ) {
        self.record(qualified, path, locations);
        for (index, value) in entry.value.iter().enumerate() {
            let mut value_path = path.to_vec();
            value_path.push(2);
            value_path.push(to_index(index));
            self.record(&qualify(qualified, value.name()), &value_path, locations);
        }
    }

    /// Records the comment at one source path, when present.
    fn record(&mut self, symbol: &str, path: &[i32], locations: &BTreeMap<&[i32], String>) {
        if let Some(text) = locations.get(path) {
            self.entries.insert(symbol.to_string(), text.clone());
        }
    }
}

/// Concatenates leading and trailing comments with a newline separator.
fn combined_comment(location: &Location) -> Option<String> {
    let leading = location.leading_comments().trim();
    let trailing = location.trailing_comments().trim();
    match (leading.is_empty(), trailing.is_empty()) {
        (true, true) => None,
        (false, true) => Some(leading.to_string()),
        (true, false) => Some(trailing.to_string()),
        (false, false) => Some(format!("{leading}\n{trailing}")),
    }
}

/// Joins a symbol onto a (possibly empty) qualified prefix.
fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Converts a slice index into a source-path component.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn to_index(index: usize) -> i32 {
    index as i32
}

// ============================================================================
// SECTION: Type Registry
// ============================================================================

/// A dependency-complete descriptor pool with its comment index.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    /// Resolved descriptors for random lookup.
    pool: DescriptorPool,
    /// Source comments keyed by qualified symbol.
    comments: CommentIndex,
}

impl TypeRegistry {
    /// Returns the underlying descriptor pool.
    #[must_use]
    pub const fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Returns the comment index.
    #[must_use]
    pub const fn comments(&self) -> &CommentIndex {
        &self.comments
    }

    /// Consumes the registry, returning its comment index.
    #[must_use]
    pub fn into_comments(self) -> CommentIndex {
        self.comments
    }
}

/// Parses a serialized `FileDescriptorSet` into a registry.
///
/// # Errors
///
/// Returns [`GatewayError::DescriptorCorrupt`] when the blob fails to parse
/// or a file cannot be registered.
pub fn load_descriptor_set(bytes: &[u8]) -> Result<TypeRegistry> {
    let set = FileDescriptorSet::decode(bytes).map_err(|_| {
        GatewayError::DescriptorCorrupt("descriptor set failed to parse".to_string())
    })?;
    registry_from_files(set.file)
}

/// Reads and parses a descriptor-set file from disk.
///
/// # Errors
///
/// Returns [`GatewayError::DescriptorCorrupt`] when the file is unreadable,
/// oversized, or fails to parse.
pub fn load_descriptor_file(path: &Path) -> Result<TypeRegistry> {
    let bytes = std::fs::read(path).map_err(|err| {
        GatewayError::DescriptorCorrupt(format!("descriptor file unreadable: {err}"))
    })?;
    if bytes.len() > MAX_DESCRIPTOR_FILE_SIZE {
        return Err(GatewayError::DescriptorCorrupt(
            "descriptor file exceeds size limit".to_string(),
        ));
    }
    load_descriptor_set(&bytes)
}

/// Builds a registry from loose file descriptors.
///
/// Files are registered depth-first from every root so shared dependencies
/// register exactly once. Imports resolve first against the in-progress
/// registry, then against the built-in well-known schema files; a file whose
/// import resolves against neither aborts the load.
///
/// # Errors
///
/// Returns [`GatewayError::DescriptorCorrupt`] naming the file and its
/// missing dependency when resolution fails.
pub fn registry_from_files(files: Vec<FileDescriptorProto>) -> Result<TypeRegistry> {
    let mut comments = CommentIndex::new();
    for file in &files {
        comments.add_file(file);
    }
    let mut by_name: BTreeMap<String, FileDescriptorProto> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();
    for file in files {
        let name = file.name().to_string();
        if !by_name.contains_key(&name) {
            order.push(name.clone());
            by_name.insert(name, file);
        }
    }
    let mut pool = DescriptorPool::new();
    let mut visited = BTreeSet::new();
    for name in &order {
        register_file(&mut pool, name, &by_name, &mut visited)?;
    }
    Ok(TypeRegistry {
        pool,
        comments,
    })
}

/// Registers one file after its dependencies.
fn register_file(
    pool: &mut DescriptorPool,
    name: &str,
    by_name: &BTreeMap<String, FileDescriptorProto>,
    visited: &mut BTreeSet<String>,
) -> Result<()> {
    if !visited.insert(name.to_string()) {
        return Ok(());
    }
    let Some(file) = by_name.get(name) else {
        return Err(GatewayError::DescriptorCorrupt(format!(
            "descriptor set does not contain file {name}"
        )));
    };
    for dependency in &file.dependency {
        if pool.get_file_by_name(dependency).is_some() {
            continue;
        }
        if by_name.contains_key(dependency.as_str()) {
            register_file(pool, dependency, by_name, visited)?;
        } else if !register_builtin_file(pool, dependency) {
            return Err(GatewayError::DescriptorCorrupt(format!(
                "file {name} imports unresolvable dependency {dependency}"
            )));
        }
    }
    pool.add_file_descriptor_proto(file.clone()).map_err(|err| {
        GatewayError::DescriptorCorrupt(format!("failed to register file {name}: {err}"))
    })?;
    Ok(())
}

/// Registers a well-known schema file and its imports from the built-in
/// registry. Returns false when the file is not a known built-in.
fn register_builtin_file(pool: &mut DescriptorPool, name: &str) -> bool {
    if pool.get_file_by_name(name).is_some() {
        return true;
    }
    let Some(file) = well_known_file(name) else {
        return false;
    };
    for dependency in &file.dependency {
        if !register_builtin_file(pool, dependency) {
            return false;
        }
    }
    pool.add_file_descriptor_proto(file).is_ok()
}

/// Looks up a well-known schema file from the built-in registry.
fn well_known_file(name: &str) -> Option<FileDescriptorProto> {
    DescriptorPool::global()
        .get_file_by_name(name)
        .map(|file| file.file_descriptor_proto().clone())
}

// ============================================================================
// SECTION: Method Extraction
// ============================================================================

/// Flattens every service method in the registry into method records.
#[must_use]
pub fn methods_from_registry(registry: &TypeRegistry) -> Vec<MethodRecord> {
    let mut records = Vec::new();
    for file in registry.pool().files() {
        for service in file.services() {
            for method in service.methods() {
                records.push(MethodRecord::from_method(&method, registry.comments()));
            }
        }
    }
    records
}
