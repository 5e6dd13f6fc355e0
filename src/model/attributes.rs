//! AttributeTable — metadata values attached to a group or a field.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::ValueCell;

/// A map of attribute names to values. Entries are replaced whole, never
/// partially updated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeTable {
    entries: HashMap<String, ValueCell>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ValueCell> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert or overwrite; returns the previous value.
    pub(crate) fn insert(&mut self, name: impl Into<String>, cell: ValueCell) -> Option<ValueCell> {
        self.entries.insert(name.into(), cell)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<ValueCell> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueCell)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries ordered by name.
    pub fn sorted(&self) -> Vec<(&str, &ValueCell)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by_key(|(k, _)| *k);
        entries
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, ValueCell)> {
        self.entries.into_iter()
    }
}
