//! # Schema layer
//!
//! Type shapes, the Base-Type Registry that serves them, and the
//! constraint checks every mutation runs against them.

pub mod shape;
pub mod registry;
pub mod catalog;
pub mod checker;

pub use shape::{
    AttributeDecl, ChildDecl, ClassCategory, Dim, FieldDecl, TypeShape, default_instance_name,
};
pub use registry::{BaseTypeRegistry, install, global, lookup};
pub use checker::{SymbolTable, validate_tree};
