//! Context retrieval over the embedding store

use crate::embed::SharedEmbedder;
use crate::error::Result;
use crate::store::{NeighborChunk, Store};
use std::sync::Arc;
use tracing::debug;

/// Nearest-neighbor context retriever
#[derive(Clone)]
pub struct Retriever {
    store: Store,
    embedder: Arc<SharedEmbedder>,
}

impl Retriever {
    pub fn new(store: Store, embedder: Arc<SharedEmbedder>) -> Self {
        Self { store, embedder }
    }

    /// Embed the query and return the top `k` chunks by ascending distance,
    /// text only. Errors propagate: the chat orchestrator downgrades them to
    /// an empty context, the CLI query command surfaces them.
    pub async fn retrieve(&self, query_text: &str, k: usize) -> Result<Vec<String>> {
        let hits = self.retrieve_detailed(query_text, k).await?;
        Ok(hits.into_iter().map(|hit| hit.text_chunk).collect())
    }

    /// Same search keeping source and distance metadata
    pub async fn retrieve_detailed(&self, query_text: &str, k: usize) -> Result<Vec<NeighborChunk>> {
        let embedding = self.embedder.embed_one(query_text).await?;
        let hits = self.store.nearest_chunks(embedding, k as i64).await?;

        let preview: String = query_text.chars().take(50).collect();
        debug!("Retrieved {} context chunks for query: {}", hits.len(), preview);

        Ok(hits)
    }
}
