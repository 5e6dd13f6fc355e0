//! ChildRegistry — a parent's children, keyed by (declared type, instance name).
//!
//! The registry is a plain container. Validation happens in `Node`, which
//! is the only caller of the mutating methods.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use serde::Serialize;

use super::Node;
use crate::{Error, Result};

/// Children of one declared type, by instance name.
pub type ChildMap = HashMap<String, Node>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChildRegistry {
    by_type: HashMap<String, ChildMap>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite one child; returns the displaced subtree.
    pub(crate) fn insert(&mut self, child_type: &str, name: &str, node: Node) -> Option<Node> {
        self.by_type
            .entry_ref(child_type)
            .or_default()
            .insert(name.to_owned(), node)
    }

    pub fn get(&self, child_type: &str, name: &str) -> Result<&Node> {
        self.by_type
            .get(child_type)
            .and_then(|m| m.get(name))
            .ok_or_else(|| not_found(child_type, Some(name)))
    }

    pub(crate) fn get_mut(&mut self, child_type: &str, name: &str) -> Result<&mut Node> {
        self.by_type
            .get_mut(child_type)
            .and_then(|m| m.get_mut(name))
            .ok_or_else(|| not_found(child_type, Some(name)))
    }

    /// The child of `child_type` when exactly one exists, whatever its name.
    pub fn default_child(&self, child_type: &str) -> Result<&Node> {
        let children = self.by_type.get(child_type);
        match children.map_or(0, |m| m.len()) {
            0 => Err(not_found(child_type, None)),
            1 => children
                .and_then(|m| m.values().next())
                .ok_or_else(|| not_found(child_type, None)),
            count => Err(Error::AmbiguousChild { child_type: child_type.into(), count }),
        }
    }

    /// Every child of `child_type`, ordered by name. Possibly empty.
    pub fn all(&self, child_type: &str) -> BTreeMap<&str, &Node> {
        self.by_type
            .get(child_type)
            .map(|m| m.iter().map(|(k, v)| (k.as_str(), v)).collect())
            .unwrap_or_default()
    }

    /// Replace every child of `child_type`; other types are untouched.
    /// An empty map removes the type entirely.
    pub(crate) fn replace_all(&mut self, child_type: &str, children: ChildMap) -> Option<ChildMap> {
        if children.is_empty() {
            self.by_type.remove(child_type)
        } else {
            self.by_type.insert(child_type.to_owned(), children)
        }
    }

    /// Detach one child and hand back its subtree.
    pub(crate) fn remove(&mut self, child_type: &str, name: &str) -> Result<Node> {
        let children = self
            .by_type
            .get_mut(child_type)
            .ok_or_else(|| not_found(child_type, Some(name)))?;
        let node = children.remove(name).ok_or_else(|| not_found(child_type, Some(name)))?;
        if children.is_empty() {
            self.by_type.remove(child_type);
        }
        Ok(node)
    }

    pub fn count(&self, child_type: &str) -> usize {
        self.by_type.get(child_type).map_or(0, |m| m.len())
    }

    pub fn contains(&self, child_type: &str, name: &str) -> bool {
        self.by_type.get(child_type).is_some_and(|m| m.contains_key(name))
    }

    /// `(declared type, name, node)` for every child.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Node)> {
        self.by_type.iter().flat_map(|(ty, m)| {
            m.iter().map(move |(name, node)| (ty.as_str(), name.as_str(), node))
        })
    }

    /// Children ordered by name, then type.
    pub fn sorted(&self) -> Vec<(&str, &str, &Node)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
        entries
    }

    pub fn len(&self) -> usize {
        self.by_type.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

fn not_found(child_type: &str, name: Option<&str>) -> Error {
    Error::ChildNotFound { child_type: child_type.into(), name: name.map(str::to_owned) }
}
