//! Postgres schema for the consumed tables
//!
//! The service consumes this schema, it does not own it: production
//! deployments migrate these tables alongside the source catalog. `rihla db
//! init` applies this DDL for local development. The source catalog tables
//! (trips, routes, route_stops, cancel_policies, partners, faqs) are
//! external and never created here.

/// SQL schema for conversations, messages and the embedding store
pub const SCHEMA_SQL: &str = r#"
CREATE EXTENSION IF NOT EXISTS vector;

-- Conversations: one row per conversation thread, resolved per user by
-- most recent activity
CREATE TABLE IF NOT EXISTS conversations (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    last_activity_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Messages: immutable turns, ordered by creation time
CREATE TABLE IF NOT EXISTS messages (
    id BIGSERIAL PRIMARY KEY,
    conversation_id UUID NOT NULL REFERENCES conversations(id),
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Embedded document chunks: one row per qualifying source record
CREATE TABLE IF NOT EXISTS documents_embeddings (
    id BIGSERIAL PRIMARY KEY,
    source_table TEXT NOT NULL,
    source_id BIGINT NOT NULL,
    text_chunk TEXT NOT NULL,
    embedding vector(768) NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_conversations_user
    ON conversations(user_id, last_activity_at DESC);
CREATE INDEX IF NOT EXISTS idx_messages_conversation
    ON messages(conversation_id, created_at);
CREATE INDEX IF NOT EXISTS idx_documents_source
    ON documents_embeddings(source_table);
"#;
