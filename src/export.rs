//! Tree DUMP export — render a document as an indented, human-readable listing.
//!
//! ```text
//! Node tree → export_tree_dump() → one line per group, field and attribute
//!   → diff two documents, or eyeball what a writer is about to persist
//! ```
//!
//! Output is deterministic (everything sorted by name), so two dumps of
//! equal trees are byte-identical.

use std::io::Write;

use crate::model::{Field, Node, ValueCell};
use crate::visit::{walk, NodeVisitor};
use crate::Result;

/// Export a tree as a text dump.
///
/// Groups print as `path : NXtype`, fields as
/// `name : NX_TYPE shape units = value`, attributes as `@name = value`
/// beneath their owner.
pub fn export_tree_dump(root: &Node, writer: &mut dyn Write) -> Result<()> {
    let mut counter = Counter::default();
    walk(root, &mut counter)?;

    writeln!(writer, "// nexus-tree DUMP")?;
    writeln!(writer, "// Groups: {}", counter.groups)?;
    writeln!(writer, "// Fields: {}", counter.fields)?;
    writeln!(writer)?;

    walk(root, &mut DumpWriter { writer })
}

#[derive(Default)]
struct Counter {
    groups: usize,
    fields: usize,
}

impl NodeVisitor for Counter {
    fn enter_group(&mut self, _path: &str, _node: &Node) -> Result<()> {
        self.groups += 1;
        Ok(())
    }

    fn field(&mut self, _path: &str, _name: &str, _field: &Field) -> Result<()> {
        self.fields += 1;
        Ok(())
    }
}

struct DumpWriter<'w> {
    writer: &'w mut dyn Write,
}

impl NodeVisitor for DumpWriter<'_> {
    fn enter_group(&mut self, path: &str, node: &Node) -> Result<()> {
        writeln!(self.writer, "{path} : {}", node.declared_type())?;
        for (name, cell) in node.attributes().sorted() {
            writeln!(self.writer, "  @{name} = {cell}")?;
        }
        Ok(())
    }

    fn field(&mut self, _path: &str, name: &str, field: &Field) -> Result<()> {
        writeln!(self.writer, "  {name} : {}", describe(field.cell()))?;
        for (attr, cell) in field.attributes().sorted() {
            writeln!(self.writer, "    @{attr} = {cell}")?;
        }
        Ok(())
    }
}

/// `NX_FLOAT [2, 3] NX_LENGTH = [...]`
fn describe(cell: &ValueCell) -> String {
    let units = match cell.unit() {
        Some(unit) => format!(" {unit}"),
        None => String::new(),
    };
    format!("{} {:?}{units} = {cell}", cell.primitive_type(), cell.shape())
}
