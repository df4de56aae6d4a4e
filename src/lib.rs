//! rihla - retrieval-augmented chat service for a trip booking catalog
//!
//! This crate provides:
//! - An indexing pipeline that renders catalog rows (trips, routes,
//!   cancellation policies, FAQs) into Arabic text chunks embedded into
//!   Postgres/pgvector
//! - A nearest-neighbor context retriever
//! - Per-user conversation history management
//! - A chat orchestrator with query rewriting and generation fallback,
//!   behind a thin HTTP layer

pub mod chat;
pub mod config;
pub mod embed;
pub mod error;
pub mod history;
pub mod index;
pub mod llm;
pub mod retrieve;
pub mod server;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
