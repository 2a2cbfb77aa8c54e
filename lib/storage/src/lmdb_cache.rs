// LMDB-backed embedding cache. Vectors are bincode-encoded, keyed by document id.
use affinity_core::{EmbeddingCache, Error as CoreError, Result as CoreResult, Vector};
use anyhow::{Context, Result};
use heed::{Database, Env, EnvOpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const DB_EMBEDDINGS: &str = "embeddings";
const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024 * 1024; // 10GB

/// Persistent [`EmbeddingCache`]. Entries survive across runs; nothing here
/// knows when a document's text changed, so stale vectors must be removed
/// with [`LmdbEmbeddingCache::clear`] by the caller.
pub struct LmdbEmbeddingCache {
    env: Arc<Env>,
    embeddings_db: Database<heed::types::Str, heed::types::Bytes>,
}

impl LmdbEmbeddingCache {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_map_size(path, DEFAULT_MAP_SIZE)
    }

    pub fn with_map_size<P: AsRef<Path>>(path: P, map_size: usize) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating cache directory {}", path.display()))?;

        let env = Arc::new(unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path)
                .with_context(|| format!("opening LMDB environment at {}", path.display()))?
        });

        let mut wtxn = env.write_txn()?;
        let embeddings_db = env.create_database(&mut wtxn, Some(DB_EMBEDDINGS))?;
        wtxn.commit()?;

        debug!("Opened embedding cache at {}", path.display());
        Ok(Self { env, embeddings_db })
    }

    fn load(&self, doc_id: &str) -> Result<Option<Vector>> {
        let rtxn = self.env.read_txn()?;
        match self.embeddings_db.get(&rtxn, doc_id)? {
            Some(bytes) => {
                let vector: Vector = bincode::deserialize(bytes)
                    .with_context(|| format!("decoding cached vector for {}", doc_id))?;
                Ok(Some(vector))
            }
            None => Ok(None),
        }
    }

    fn store(&self, entries: &[(&str, &Vector)]) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        for (doc_id, vector) in entries {
            let bytes = bincode::serialize(vector)?;
            self.embeddings_db.put(&mut wtxn, doc_id, &bytes)?;
        }
        wtxn.commit()?;
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let rtxn = self.env.read_txn()?;
        Ok(self.embeddings_db.len(&rtxn)? as usize)
    }

    /// Remove every cached vector
    pub fn clear(&self) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        self.embeddings_db.clear(&mut wtxn)?;
        wtxn.commit()?;
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.env.force_sync()?;
        Ok(())
    }
}

fn cache_error(err: anyhow::Error) -> CoreError {
    CoreError::Cache(format!("{:#}", err))
}

impl EmbeddingCache for LmdbEmbeddingCache {
    fn get(&self, doc_id: &str) -> CoreResult<Option<Vector>> {
        self.load(doc_id).map_err(cache_error)
    }

    fn put(&self, doc_id: &str, vector: &Vector) -> CoreResult<()> {
        self.store(&[(doc_id, vector)]).map_err(cache_error)
    }

    /// One write transaction per batch
    fn put_many(&self, entries: &[(&str, &Vector)]) -> CoreResult<()> {
        self.store(entries).map_err(cache_error)
    }

    fn len(&self) -> CoreResult<usize> {
        self.count().map_err(cache_error)
    }
}
