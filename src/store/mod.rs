//! Postgres + pgvector document store
//!
//! This module wraps the connection pool and provides:
//! - Pool construction with configured bounds
//! - Document chunk insert/wipe/count operations
//! - Ascending-distance nearest-neighbor search

mod schema;

pub use schema::*;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::debug;

/// Vector dimension of the `documents_embeddings.embedding` column
pub const EMBEDDING_DIM: usize = 768;

/// Source categories mirrored into the embedding store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    Trips,
    Routes,
    CancelPolicies,
    Faqs,
}

impl std::fmt::Display for SourceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceTable::Trips => write!(f, "trips"),
            SourceTable::Routes => write!(f, "routes"),
            SourceTable::CancelPolicies => write!(f, "cancel_policies"),
            SourceTable::Faqs => write!(f, "faqs"),
        }
    }
}

impl FromStr for SourceTable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trips" => Ok(SourceTable::Trips),
            "routes" => Ok(SourceTable::Routes),
            "cancel_policies" => Ok(SourceTable::CancelPolicies),
            "faqs" => Ok(SourceTable::Faqs),
            _ => Err(Error::Config(format!("Unknown source table: {}", s))),
        }
    }
}

impl SourceTable {
    /// All categories in indexing order
    pub const ALL: [SourceTable; 4] = [
        SourceTable::Trips,
        SourceTable::Routes,
        SourceTable::CancelPolicies,
        SourceTable::Faqs,
    ];
}

/// A nearest-neighbor search hit
#[derive(Debug, Clone, Serialize)]
pub struct NeighborChunk {
    pub text_chunk: String,
    pub source_table: String,
    pub source_id: i64,
    pub distance: f64,
}

/// Connect a bounded Postgres pool from configuration
pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool> {
    debug!(
        "Connecting to Postgres (pool {}..{})",
        config.min_connections, config.max_connections
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    Ok(pool)
}

/// Document store handle
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for components that own their own queries
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the consumed-table DDL (local development only)
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Cheap connectivity check
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Delete every indexed document. Returns the number of rows removed.
    pub async fn clear_documents(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents_embeddings")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Insert one rendered chunk with its embedding
    pub async fn insert_document(
        &self,
        source: SourceTable,
        source_id: i64,
        text_chunk: &str,
        embedding: Vec<f32>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents_embeddings (source_table, source_id, text_chunk, embedding)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(source.to_string())
        .bind(source_id)
        .bind(text_chunk)
        .bind(Vector::from(embedding))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Count indexed documents, optionally per category
    pub async fn count_documents(&self, source: Option<SourceTable>) -> Result<i64> {
        let count: i64 = match source {
            Some(table) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM documents_embeddings WHERE source_table = $1",
                )
                .bind(table.to_string())
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM documents_embeddings")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    /// Top-k chunks by ascending distance to the query vector
    pub async fn nearest_chunks(&self, query: Vec<f32>, k: i64) -> Result<Vec<NeighborChunk>> {
        debug!("Nearest-neighbor search with limit {}", k);

        let rows = sqlx::query(
            r#"
            SELECT text_chunk, source_table, source_id, embedding <-> $1 AS distance
            FROM documents_embeddings
            ORDER BY embedding <-> $1
            LIMIT $2
            "#,
        )
        .bind(Vector::from(query))
        .bind(k)
        .fetch_all(&self.pool)
        .await?;

        let chunks = rows
            .into_iter()
            .map(|row| NeighborChunk {
                text_chunk: row.get("text_chunk"),
                source_table: row.get("source_table"),
                source_id: row.get("source_id"),
                distance: row.get("distance"),
            })
            .collect();

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_table_round_trip() {
        for table in SourceTable::ALL {
            let parsed: SourceTable = table.to_string().parse().unwrap();
            assert_eq!(parsed, table);
        }
        assert!("bookings".parse::<SourceTable>().is_err());
    }

    #[test]
    fn test_indexing_order() {
        let names: Vec<String> = SourceTable::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, ["trips", "routes", "cancel_policies", "faqs"]);
    }
}
