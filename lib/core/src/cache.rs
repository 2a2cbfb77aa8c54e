// Embedding cache collaborator for the dense backend.
// Keyed by document id only: the caller must clear or swap the cache when a
// document's text or the encoder version changes. Concurrent writers to the
// same cache must be serialized outside the engine.
use crate::{Result, Vector};
use parking_lot::RwLock;
use std::collections::HashMap;

pub trait EmbeddingCache: Send + Sync {
    fn get(&self, doc_id: &str) -> Result<Option<Vector>>;

    fn put(&self, doc_id: &str, vector: &Vector) -> Result<()>;

    /// Write a batch; implementations may override to use one transaction
    fn put_many(&self, entries: &[(&str, &Vector)]) -> Result<()> {
        for (doc_id, vector) in entries {
            self.put(doc_id, vector)?;
        }
        Ok(())
    }

    fn len(&self) -> Result<usize>;
}

/// In-process cache, lives as long as the value
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vector>>,
}

impl MemoryCache {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EmbeddingCache for MemoryCache {
    fn get(&self, doc_id: &str) -> Result<Option<Vector>> {
        Ok(self.entries.read().get(doc_id).cloned())
    }

    fn put(&self, doc_id: &str, vector: &Vector) -> Result<()> {
        self.entries.write().insert(doc_id.to_string(), vector.clone());
        Ok(())
    }

    fn put_many(&self, entries: &[(&str, &Vector)]) -> Result<()> {
        let mut guard = self.entries.write();
        for (doc_id, vector) in entries {
            guard.insert(doc_id.to_string(), (*vector).clone());
        }
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}
