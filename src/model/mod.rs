//! # NeXus Object Model
//!
//! The generic tree every generated class accessor projects onto:
//! `ValueCell` → `AttributeTable` → `Node` → `ChildRegistry`.
//!
//! Design rule: no file-format types here. This module is pure data plus
//! the validation hooks into `crate::schema`; no I/O, no async.

pub mod unit;
pub mod value;
pub mod attributes;
pub mod children;
pub mod node;
pub mod path;

pub use unit::UnitCategory;
pub use value::{
    ValueCell, Scalar, CellData, Complex128, PrimitiveType, FromScalar, Shape,
};
pub use attributes::AttributeTable;
pub use children::{ChildRegistry, ChildMap};
pub use node::{Node, NodeFactory, Field};
pub use path::Target;
