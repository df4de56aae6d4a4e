//! Indexing pipeline
//!
//! Rebuilds the embedding store from the source catalog: full wipe, then one
//! rendered-and-embedded chunk per qualifying row, category by category in a
//! fixed order. There is no incremental upsert; a failed run leaves already
//! committed categories in place and is recovered by running again.
//!
//! Retrieval is never locked out during a run, so concurrent queries may see
//! an empty or partially rebuilt index until the run completes.

mod render;

pub use render::*;

use crate::embed::{Embedder, SharedEmbedder};
use crate::error::{Error, Result};
use crate::store::{SourceTable, Store, EMBEDDING_DIM};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const TRIPS_SQL: &str = r#"
SELECT
    t.trip_id::bigint AS trip_id,
    r.origin_city,
    r.destination_city,
    t.departure_time::text AS departure_time,
    t.arrival_time::text AS arrival_time,
    t.base_price::float8 AS base_price,
    t.status,
    STRING_AGG(
        CONCAT('نقطة صعود: ', rs.stop_name, ' في موقع ', rs.stop_location, ' - ترتيب: ', rs.stop_order),
        ' | ' ORDER BY rs.stop_order
    ) FILTER (WHERE rs.route_id IS NOT NULL) AS boarding_points
FROM trips t
LEFT JOIN routes r ON r.route_id = t.route_id
LEFT JOIN route_stops rs ON rs.route_id = t.route_id
WHERE t.status = 'scheduled'
GROUP BY
    t.trip_id,
    r.origin_city,
    r.destination_city,
    t.departure_time,
    t.arrival_time,
    t.base_price,
    t.status
"#;

const ROUTES_SQL: &str = r#"
SELECT
    r.route_id::bigint AS route_id,
    r.origin_city,
    r.destination_city,
    r.estimated_duration_hours::float8 AS estimated_duration_hours,
    r.distance_km::float8 AS distance_km,
    STRING_AGG(
        CONCAT(rs.stop_name, ' (', rs.stop_location, ')', ' - ترتيب: ', rs.stop_order),
        ' | ' ORDER BY rs.stop_order
    ) FILTER (WHERE rs.route_id IS NOT NULL) AS route_stops
FROM routes r
LEFT JOIN route_stops rs ON rs.route_id = r.route_id
GROUP BY
    r.route_id,
    r.origin_city,
    r.destination_city,
    r.estimated_duration_hours,
    r.distance_km
"#;

const POLICIES_SQL: &str = r#"
SELECT
    cp.cancel_policy_id::bigint AS cancel_policy_id,
    cp.policy_name,
    cp.description,
    cp.refund_percentage::float8 AS refund_percentage,
    cp.hours_before_trip::int AS hours_before_trip,
    p.company_name
FROM cancel_policies cp
LEFT JOIN partners p ON p.partner_id = cp.partner_id
"#;

const FAQS_SQL: &str = r#"
SELECT
    faq_id::bigint AS faq_id,
    category,
    question,
    answer
FROM faqs
WHERE is_active = true
ORDER BY display_order
"#;

/// Reindex outcome returned to the triggering caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexReport {
    pub status: String,
    pub message: String,
    pub documents_indexed: usize,
}

/// Rebuilds the embedding store from the source catalog
#[derive(Clone)]
pub struct Indexer {
    store: Store,
    embedder: Arc<SharedEmbedder>,
}

impl Indexer {
    pub fn new(store: Store, embedder: Arc<SharedEmbedder>) -> Self {
        Self { store, embedder }
    }

    /// Wipe and rebuild the whole index. Any error aborts the run and
    /// propagates; categories committed before the failure stay committed.
    pub async fn reindex_all(&self) -> Result<ReindexReport> {
        info!("Starting full reindex");

        let embedder = self.embedder.get().await.ok_or_else(|| {
            Error::Indexing("Embedding model unavailable, cannot reindex".to_string())
        })?;

        if embedder.dimension() != EMBEDDING_DIM {
            return Err(Error::Indexing(format!(
                "Embedding dimension {} does not match store dimension {}",
                embedder.dimension(),
                EMBEDDING_DIM
            )));
        }

        let cleared = self.store.clear_documents().await?;
        info!(cleared, "Cleared old embeddings");

        let mut total = 0usize;
        total += self.index_trips(embedder.as_ref()).await?;
        total += self.index_routes(embedder.as_ref()).await?;
        total += self.index_policies(embedder.as_ref()).await?;
        total += self.index_faqs(embedder.as_ref()).await?;

        info!(documents = total, "Reindex complete");

        Ok(ReindexReport {
            status: "success".to_string(),
            message: "Re-indexing completed".to_string(),
            documents_indexed: total,
        })
    }

    async fn index_trips(&self, embedder: &dyn Embedder) -> Result<usize> {
        let rows: Vec<TripRow> = sqlx::query_as(TRIPS_SQL)
            .fetch_all(self.store.pool())
            .await?;
        let chunks = rows
            .iter()
            .map(|row| (row.trip_id, render_trip(row)))
            .collect();
        self.index_chunks(SourceTable::Trips, chunks, embedder).await
    }

    async fn index_routes(&self, embedder: &dyn Embedder) -> Result<usize> {
        let rows: Vec<RouteRow> = sqlx::query_as(ROUTES_SQL)
            .fetch_all(self.store.pool())
            .await?;
        let chunks = rows
            .iter()
            .map(|row| (row.route_id, render_route(row)))
            .collect();
        self.index_chunks(SourceTable::Routes, chunks, embedder)
            .await
    }

    async fn index_policies(&self, embedder: &dyn Embedder) -> Result<usize> {
        let rows: Vec<PolicyRow> = sqlx::query_as(POLICIES_SQL)
            .fetch_all(self.store.pool())
            .await?;
        let chunks = rows
            .iter()
            .map(|row| (row.cancel_policy_id, render_policy(row)))
            .collect();
        self.index_chunks(SourceTable::CancelPolicies, chunks, embedder)
            .await
    }

    async fn index_faqs(&self, embedder: &dyn Embedder) -> Result<usize> {
        let rows: Vec<FaqRow> = sqlx::query_as(FAQS_SQL)
            .fetch_all(self.store.pool())
            .await?;
        let chunks = rows
            .iter()
            .map(|row| (row.faq_id, render_faq(row)))
            .collect();
        self.index_chunks(SourceTable::Faqs, chunks, embedder).await
    }

    /// Embed and insert rendered chunks for one category. An empty category
    /// is a logged no-op, not a failure.
    async fn index_chunks(
        &self,
        table: SourceTable,
        chunks: Vec<(i64, String)>,
        embedder: &dyn Embedder,
    ) -> Result<usize> {
        if chunks.is_empty() {
            warn!("No rows found for {}", table);
            return Ok(0);
        }

        info!("Indexing {} rows from {}", chunks.len(), table);

        for (source_id, text_chunk) in &chunks {
            let mut vectors = embedder.embed(vec![text_chunk.clone()]).await?;
            let embedding = vectors
                .pop()
                .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))?;
            self.store
                .insert_document(table, *source_id, text_chunk, embedding)
                .await?;
        }

        Ok(chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, EmbeddingConfig};
    use crate::store::connect_pool;

    // Integration test - requires a Postgres with the source catalog plus a
    // model download. Run manually with: cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_reindex_twice_is_idempotent() {
        let config = Config::default();
        let pool = connect_pool(&config.database).await.unwrap();
        let store = Store::new(pool);
        store.init_schema().await.unwrap();

        let embedder = Arc::new(SharedEmbedder::new(EmbeddingConfig::default()));
        let indexer = Indexer::new(store.clone(), embedder);

        indexer.reindex_all().await.unwrap();
        let first = store.count_documents(None).await.unwrap();

        indexer.reindex_all().await.unwrap();
        let second = store.count_documents(None).await.unwrap();

        assert_eq!(first, second);
    }
}
