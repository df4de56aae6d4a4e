//! Embedding generation
//!
//! This module provides an abstraction over embedding models with:
//! - A trait for different embedding backends
//! - A fastembed-based local backend
//! - A process-wide, lazily-initialized shared embedder

#[cfg(feature = "local-embed")]
mod fastembed_impl;

#[cfg(feature = "local-embed")]
pub use fastembed_impl::*;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Lookup the expected embedding dimension for a known model
pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    match model {
        "intfloat/multilingual-e5-small" => Some(384),
        "intfloat/multilingual-e5-base" => Some(768),
        "intfloat/multilingual-e5-large" => Some(1024),
        "sentence-transformers/paraphrase-multilingual-mpnet-base-v2" => Some(768),
        "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2" => Some(384),
        _ => None,
    }
}

/// Process-wide shared embedder with single-flight initialization.
///
/// The first caller to need the model triggers the load; concurrent callers
/// await the same attempt. Load order is primary model, then the fixed
/// fallback model. If both fail the embedder stays unavailable for the
/// process lifetime and every call returns an explicit error.
pub struct SharedEmbedder {
    config: EmbeddingConfig,
    cell: OnceCell<Option<Arc<dyn Embedder>>>,
}

impl SharedEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Get the loaded embedder, triggering the one-time load if needed.
    /// Returns `None` when no model could be loaded.
    pub async fn get(&self) -> Option<Arc<dyn Embedder>> {
        self.cell
            .get_or_init(|| async { load_with_fallback(&self.config).await })
            .await
            .clone()
    }

    /// True when a model is loaded. Never triggers a load.
    pub fn ready(&self) -> bool {
        matches!(self.cell.get(), Some(Some(_)))
    }

    /// True when loading was attempted and permanently failed.
    pub fn failed(&self) -> bool {
        matches!(self.cell.get(), Some(None))
    }

    /// Embed a single text, with an explicit error when unavailable.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = self.get().await.ok_or_else(|| {
            Error::Embedding("Embedding model unavailable for this process".to_string())
        })?;
        let mut vectors = embedder.embed(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[cfg(feature = "local-embed")]
async fn load_with_fallback(config: &EmbeddingConfig) -> Option<Arc<dyn Embedder>> {
    match FastEmbedder::load(&config.model).await {
        Ok(embedder) => {
            info!(model = %config.model, "Embedding model loaded");
            Some(Arc::new(embedder))
        }
        Err(e) => {
            warn!(model = %config.model, error = %e, "Primary embedding model failed, trying fallback");
            match FastEmbedder::load(&config.fallback_model).await {
                Ok(embedder) => {
                    info!(model = %config.fallback_model, "Fallback embedding model loaded");
                    Some(Arc::new(embedder))
                }
                Err(e2) => {
                    error!(
                        model = %config.fallback_model,
                        error = %e2,
                        "No embedding model could be loaded; retrieval is disabled for this process"
                    );
                    None
                }
            }
        }
    }
}

#[cfg(not(feature = "local-embed"))]
async fn load_with_fallback(_config: &EmbeddingConfig) -> Option<Arc<dyn Embedder>> {
    error!("Built without the local-embed feature; no embedding backend available");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_dimensions() {
        assert_eq!(
            embedding_dimension_for_model("intfloat/multilingual-e5-base"),
            Some(768)
        );
        assert_eq!(
            embedding_dimension_for_model(
                "sentence-transformers/paraphrase-multilingual-mpnet-base-v2"
            ),
            Some(768)
        );
        assert_eq!(embedding_dimension_for_model("unknown-model"), None);
    }

    #[test]
    fn test_shared_embedder_starts_unloaded() {
        let shared = SharedEmbedder::new(EmbeddingConfig::default());
        assert!(!shared.ready());
        assert!(!shared.failed());
    }
}
