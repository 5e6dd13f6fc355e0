//! # Document Store Trait
//!
//! The contract between the object model and whatever keeps documents
//! between sessions. The model never performs I/O itself; stores persist
//! serialized snapshots and rebuild (and re-validate) trees on load.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | JSON snapshots in a HashMap, for testing/embedding |

pub mod memory;

use async_trait::async_trait;

use crate::{Document, Result};

pub use memory::MemoryStore;

/// Keyed persistence for whole documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a snapshot of `doc` under `key`, replacing any previous one.
    async fn save(&self, key: &str, doc: &Document) -> Result<()>;

    /// Rebuild the document stored under `key`. `None` if absent.
    async fn load(&self, key: &str) -> Result<Option<Document>>;

    /// Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Stored keys, sorted.
    async fn keys(&self) -> Result<Vec<String>>;

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.keys().await?.iter().any(|k| k == key))
    }
}
