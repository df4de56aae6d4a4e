//! FastEmbed implementation for local embeddings

use super::{embedding_dimension_for_model, Embedder};
use crate::error::{Error, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// FastEmbed-based embedder
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedder {
    /// Load a model by name. Downloading and initialization are blocking,
    /// so the whole load runs on a blocking task.
    pub async fn load(model_name: &str) -> Result<Self> {
        info!("Initializing FastEmbed with model: {}", model_name);

        // Map model name to fastembed model enum
        let model_enum = match model_name {
            "intfloat/multilingual-e5-small" => EmbeddingModel::MultilingualE5Small,
            "intfloat/multilingual-e5-base" => EmbeddingModel::MultilingualE5Base,
            "intfloat/multilingual-e5-large" => EmbeddingModel::MultilingualE5Large,
            "sentence-transformers/paraphrase-multilingual-mpnet-base-v2" => {
                EmbeddingModel::ParaphraseMLMpnetBaseV2
            }
            "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2" => {
                EmbeddingModel::ParaphraseMLMiniLML12V2
            }
            _ => {
                debug!(
                    "Unknown model '{}', using default MultilingualE5Base",
                    model_name
                );
                EmbeddingModel::MultilingualE5Base
            }
        };

        let model = tokio::task::spawn_blocking(move || {
            let options = InitOptions::new(model_enum).with_show_download_progress(true);
            TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| Error::Embedding(format!("Task join error: {}", e)))?
        .map_err(|e| Error::Embedding(format!("Failed to initialize model: {}", e)))?;

        info!("FastEmbed model loaded successfully");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: model_name.to_string(),
            dimension: embedding_dimension_for_model(model_name).unwrap_or(768),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts", texts.len());

        // FastEmbed is synchronous, so we wrap in blocking task
        let model = self.model.clone();
        let embeddings = tokio::task::spawn_blocking(move || {
            let model = model.blocking_lock();
            model.embed(texts, None)
        })
        .await
        .map_err(|e| Error::Embedding(format!("Task join error: {}", e)))?
        .map_err(|e| Error::Embedding(format!("Embedding failed: {}", e)))?;

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration test - requires model download
    #[tokio::test]
    #[ignore] // Run manually with: cargo test -- --ignored
    async fn test_fastembed_integration() {
        let embedder = FastEmbedder::load("intfloat/multilingual-e5-base")
            .await
            .unwrap();
        let texts = vec!["رحلة من الرياض إلى جدة".to_string()];

        let embeddings = embedder.embed(texts).await.unwrap();

        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].len(), 768);
    }
}
