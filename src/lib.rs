//! # nexus-tree — Schema-checked NeXus Object Model
//!
//! A generic tree model for NeXus documents: typed groups, unit-bearing
//! fields and attributes, validated against a registry of base-class
//! shapes on every mutation.
//!
//! ## Design Principles
//!
//! 1. **Tag-driven**: a Node's declared type is a registry key, not a Rust type
//! 2. **Fail fast**: every `set_*` call validates before it mutates
//! 3. **Owned tree**: children are owned by exactly one parent; cross-references
//!    are path strings (`depends_on`), resolved on demand
//! 4. **Storage-agnostic**: file formats live behind `NodeVisitor` / `DocumentStore`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nexus_tree::{Document, UnitCategory};
//!
//! # fn example() -> nexus_tree::Result<()> {
//! let mut doc = Document::new()?;
//! let entry = doc.root_mut().new_child("NXentry", Some("entry"))?;
//! entry.set_field_scalar("title", "alignment scan", None)?;
//!
//! let sample = entry.new_child("NXsample", None)?;
//! sample.set_field_scalar("temperature", 293.0, UnitCategory::Temperature)?;
//!
//! doc.validate()?;
//! println!("{}", doc.to_json()?);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod schema;
pub mod config;
pub mod visit;
pub mod export;
pub mod storage;
pub mod classes;

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Node, NodeFactory, Field, ValueCell, Scalar, CellData, Complex128,
    PrimitiveType, UnitCategory, AttributeTable, ChildRegistry, ChildMap,
    FromScalar, Target,
};

// ============================================================================
// Re-exports: Schema
// ============================================================================

pub use schema::{
    BaseTypeRegistry, TypeShape, FieldDecl, AttributeDecl, ChildDecl, Dim,
    validate_tree,
};

pub use config::{ModelConfig, ValidationMode};
pub use visit::{NodeVisitor, walk};
pub use storage::{DocumentStore, MemoryStore};

// ============================================================================
// Top-level Document handle
// ============================================================================

/// Type name every document root must carry.
pub const ROOT_TYPE: &str = "NXroot";

/// The primary entry point. A `Document` owns an `NXroot` tree and the
/// factory its nodes were created with.
#[derive(Debug, Clone)]
pub struct Document {
    factory: NodeFactory,
    root: Node,
}

impl Document {
    /// Empty document over the process-wide registry, strict validation.
    pub fn new() -> Result<Self> {
        Self::with_factory(NodeFactory::global())
    }

    /// Empty document whose nodes come from `factory`.
    pub fn with_factory(factory: NodeFactory) -> Result<Self> {
        let root = factory.create_named(ROOT_TYPE, "")?;
        Ok(Self { factory, root })
    }

    /// Adopt an existing root node.
    pub fn from_root(root: Node) -> Result<Self> {
        if root.declared_type() != ROOT_TYPE {
            return Err(Error::TypeDeclarationMismatch {
                declared: ROOT_TYPE.into(),
                actual: root.declared_type().into(),
            });
        }
        Ok(Self { factory: root.factory().clone(), root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    pub fn factory(&self) -> &NodeFactory {
        &self.factory
    }

    /// Create a detached node with this document's registry and policy.
    pub fn create(&self, type_name: &str) -> Result<Node> {
        self.factory.create(type_name)
    }

    /// Resolve an absolute path such as `/entry/sample/transformations/phi`.
    pub fn resolve(&self, path: &str) -> Result<Target<'_>> {
        self.root.resolve(path)
    }

    /// Whole-tree validation: required members and dimension symbols.
    pub fn validate(&self) -> Result<()> {
        validate_tree(&self.root)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    /// Parse a JSON snapshot, rebuilding every node through `factory`.
    pub fn from_json_with(factory: &NodeFactory, json: &str) -> Result<Self> {
        Self::from_root(factory.node_from_json(json)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with(&NodeFactory::global(), json)
    }

    /// Move the document behind a root-level lock.
    pub fn into_shared(self) -> SharedDocument {
        SharedDocument { inner: Arc::new(RwLock::new(self)) }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let root = Node::deserialize(deserializer)?;
        Document::from_root(root).map_err(serde::de::Error::custom)
    }
}

/// A document behind a single root lock.
///
/// The model itself is single-threaded; this is the external locking
/// callers reach for when one document is built from several threads.
#[derive(Debug, Clone)]
pub struct SharedDocument {
    inner: Arc<RwLock<Document>>,
}

impl SharedDocument {
    pub fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Document> {
        self.inner.write()
    }

    /// Unwrap if this is the last handle.
    pub fn try_into_inner(self) -> std::result::Result<Document, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Placeholder field name for errors raised by a bare `ValueCell`.
pub(crate) const CELL: &str = "<cell>";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("'{name}' is not declared by {type_name}")]
    UnknownField { type_name: String, name: String },

    #[error("'{name}' is declared by {type_name} but not set")]
    FieldNotSet { type_name: String, name: String },

    #[error("Type mismatch on '{field}': expected {expected}, got {got}")]
    TypeMismatch { field: String, expected: PrimitiveType, got: PrimitiveType },

    #[error("Shape mismatch on '{field}': {message}")]
    ShapeMismatch { field: String, message: String },

    #[error("Not a scalar: shape {shape:?} holds {len} elements")]
    NotScalar { shape: Vec<usize>, len: usize },

    #[error("Value '{value}' of '{field}' is not one of {allowed:?}")]
    EnumerationViolation { field: String, value: String, allowed: Vec<String> },

    #[error("Dimension '{symbol}' on '{field}' resolves to {got}, already bound to {bound}")]
    DimensionConflict { field: String, symbol: String, bound: usize, got: usize },

    #[error("Unit category mismatch on '{field}': expected {expected}, got {got}")]
    UnitCategoryMismatch { field: String, expected: String, got: String },

    #[error("Child declared as {declared} but node is {actual}")]
    TypeDeclarationMismatch { declared: String, actual: String },

    #[error("{count} children of type {child_type}; a name is required")]
    AmbiguousChild { child_type: String, count: usize },

    #[error("No child of type {child_type}{}", named_suffix(.name))]
    ChildNotFound { child_type: String, name: Option<String> },

    #[error("Required '{name}' missing at {path}")]
    MissingRequired { path: String, name: String },

    #[error("Base-type registry already initialized")]
    RegistryInitialized,

    #[error("Invalid schema: {0}")]
    Schema(String),

    #[error("Cannot resolve '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Read-time absence ("optional and absent") as opposed to a malformed write.
    pub fn is_read_error(&self) -> bool {
        matches!(self, Error::FieldNotSet { .. } | Error::ChildNotFound { .. })
    }

    /// Attach a field name to an error raised by a bare `ValueCell`.
    pub(crate) fn at_field(mut self, name: &str) -> Self {
        match &mut self {
            Error::TypeMismatch { field, .. }
            | Error::ShapeMismatch { field, .. }
            | Error::EnumerationViolation { field, .. }
            | Error::DimensionConflict { field, .. }
            | Error::UnitCategoryMismatch { field, .. }
                if field == CELL =>
            {
                *field = name.to_owned();
            }
            _ => {}
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn named_suffix(name: &Option<String>) -> String {
    name.as_deref().map(|n| format!(" named '{n}'")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_errors_are_distinguished() {
        let absent = Error::FieldNotSet { type_name: "NXentry".into(), name: "title".into() };
        let malformed = Error::UnknownField { type_name: "NXentry".into(), name: "titel".into() };
        assert!(absent.is_read_error());
        assert!(!malformed.is_read_error());
    }

    #[test]
    fn test_at_field_only_replaces_placeholder() {
        let err = Error::ShapeMismatch { field: CELL.into(), message: "x".into() }.at_field("data");
        assert!(matches!(err, Error::ShapeMismatch { ref field, .. } if field == "data"));

        let err = Error::ShapeMismatch { field: "kept".into(), message: "x".into() }.at_field("data");
        assert!(matches!(err, Error::ShapeMismatch { ref field, .. } if field == "kept"));
    }

    #[test]
    fn test_child_not_found_message() {
        let err = Error::ChildNotFound { child_type: "NXfabrication".into(), name: Some("fab9".into()) };
        assert_eq!(err.to_string(), "No child of type NXfabrication named 'fab9'");
        let err = Error::ChildNotFound { child_type: "NXfabrication".into(), name: None };
        assert_eq!(err.to_string(), "No child of type NXfabrication");
    }

    #[test]
    fn test_document_root_is_nxroot() {
        let doc = Document::new().unwrap();
        assert_eq!(doc.root().declared_type(), ROOT_TYPE);
        let entry = doc.create("NXentry").unwrap();
        assert!(matches!(Document::from_root(entry), Err(Error::TypeDeclarationMismatch { .. })));
    }
}
