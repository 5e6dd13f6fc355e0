//! In-memory document store.
//!
//! Keeps serialized JSON snapshots, not live trees, so a load always goes
//! through full re-validation and a caller can never mutate stored state
//! through a returned document.
//!
//! ## Limitations
//!
//! - **No persistence**: everything is lost when the store is dropped.
//! - **Last write wins**: concurrent saves to one key are not merged.
//! - **Keys must be non-empty**: `save("")` fails with `Error::Store`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::DocumentStore;
use crate::{Document, Error, NodeFactory, Result};

/// Snapshot store backed by a `HashMap`. Cloning shares the same contents.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    snapshots: Arc<RwLock<HashMap<String, String>>>,
    factory: NodeFactory,
}

impl MemoryStore {
    /// Loads against the process-wide registry, strict validation.
    pub fn new() -> Self {
        Self::with_factory(NodeFactory::global())
    }

    /// Loads rebuild documents through `factory`.
    pub fn with_factory(factory: NodeFactory) -> Self {
        Self { snapshots: Arc::new(RwLock::new(HashMap::new())), factory }
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn save(&self, key: &str, doc: &Document) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Store("empty snapshot key".into()));
        }
        let json = serde_json::to_string(doc)?;
        debug!(key, bytes = json.len(), "Saving document snapshot");
        self.snapshots.write().insert(key.to_owned(), json);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Document>> {
        let Some(json) = self.snapshots.read().get(key).cloned() else {
            return Ok(None);
        };
        debug!(key, "Loading document snapshot");
        Document::from_json_with(&self.factory, &json).map(Some)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.snapshots.write().remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.snapshots.read().keys().cloned().collect();
        keys.sort_unstable();
        Ok(keys)
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.snapshots.read().contains_key(key))
    }
}
