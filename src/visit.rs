//! Depth-first traversal hook.
//!
//! Persistence layers (HDF5 writers, dumps, validators) implement
//! `NodeVisitor` instead of reaching into `Node` internals. Order is
//! deterministic: fields by name, then children by name and type.

use crate::model::path::child_path;
use crate::model::{Field, Node};
use crate::Result;

pub trait NodeVisitor {
    /// Called before a group's fields and children. The root's path is `/`.
    fn enter_group(&mut self, path: &str, node: &Node) -> Result<()>;

    /// Called once per field of the current group.
    fn field(&mut self, _path: &str, _name: &str, _field: &Field) -> Result<()> {
        Ok(())
    }

    /// Called after all of a group's children were visited.
    fn leave_group(&mut self, _path: &str, _node: &Node) -> Result<()> {
        Ok(())
    }
}

/// Walk `root` depth-first. The first visitor error aborts the walk.
pub fn walk<V: NodeVisitor + ?Sized>(root: &Node, visitor: &mut V) -> Result<()> {
    walk_at("/", root, visitor)
}

fn walk_at<V: NodeVisitor + ?Sized>(path: &str, node: &Node, visitor: &mut V) -> Result<()> {
    visitor.enter_group(path, node)?;
    for (name, field) in node.sorted_fields() {
        visitor.field(&child_path(path, name), name, field)?;
    }
    for (_, name, child) in node.children().sorted() {
        walk_at(&child_path(path, name), child, visitor)?;
    }
    visitor.leave_group(path, node)
}
