//! Path resolution inside a tree.
//!
//! Paths look like `/entry/instrument/detector/data`. Each segment names a
//! child group regardless of its type; the final segment may also name a
//! field, which wins over a same-named group.

use super::{Field, Node};
use crate::{Error, Result};

/// What a path resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<'a> {
    Group(&'a Node),
    Field(&'a Field),
}

impl<'a> Target<'a> {
    pub fn as_group(&self) -> Option<&'a Node> {
        match self {
            Target::Group(node) => Some(node),
            Target::Field(_) => None,
        }
    }

    pub fn as_field(&self) -> Option<&'a Field> {
        match self {
            Target::Field(field) => Some(field),
            Target::Group(_) => None,
        }
    }
}

impl Node {
    /// Resolve `path` relative to this node. Leading `/` and `.` segments
    /// are ignored; `..` is not supported.
    pub fn resolve(&self, path: &str) -> Result<Target<'_>> {
        let invalid = |reason: String| Error::InvalidPath { path: path.to_owned(), reason };

        let mut segments = path.split('/').filter(|s| !s.is_empty() && *s != ".").peekable();
        let mut node = self;
        while let Some(segment) = segments.next() {
            if segment == ".." {
                return Err(invalid("parent segments are not supported".into()));
            }
            if segments.peek().is_none() {
                if let Some(field) = node.field(segment) {
                    return Ok(Target::Field(field));
                }
            }

            let mut matches = node.children().iter().filter(|(_, name, _)| *name == segment);
            node = match (matches.next(), matches.next()) {
                (Some((_, _, child)), None) => child,
                (None, _) => {
                    return Err(invalid(format!("'{}' has no member '{segment}'", node.name())));
                }
                (Some(_), Some(_)) => {
                    return Err(invalid(format!("'{segment}' names groups of several types")));
                }
            };
        }
        Ok(Target::Group(node))
    }
}

/// Join a group path and a member name.
pub(crate) fn child_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}
