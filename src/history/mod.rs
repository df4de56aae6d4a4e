//! Conversation history storage
//!
//! Tracks per-user conversation continuity: one active conversation per user
//! resolved by most recent activity, append-only messages, and a bounded
//! recent-messages window for prompt context.

use crate::error::{Error, Result};
use crate::llm::ChatTurn;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use std::str::FromStr;
use uuid::Uuid;

/// Message author roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(Error::Conversation(format!("Unknown role: {}", s))),
        }
    }
}

/// Conversation continuity manager
#[derive(Clone)]
pub struct HistoryManager {
    pool: PgPool,
}

impl HistoryManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve the user's most recently active conversation, creating one on
    /// first contact. Touches `last_activity_at` on the found path.
    ///
    /// Two near-simultaneous first contacts from the same user may create
    /// two conversations; later calls converge on the most recently active
    /// one, so duplicates are tolerated rather than prevented.
    pub async fn get_or_create_conversation(&self, user_id: &str) -> Result<Uuid> {
        let existing: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM conversations
            WHERE user_id = $1
            ORDER BY last_activity_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some((id,)) => {
                sqlx::query("UPDATE conversations SET last_activity_at = now() WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(id)
            }
            None => {
                let id = Uuid::new_v4();
                sqlx::query("INSERT INTO conversations (id, user_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?;
                Ok(id)
            }
        }
    }

    /// Append a message and bump the conversation's activity timestamp
    pub async fn add_message(&self, conversation_id: Uuid, role: Role, content: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (conversation_id, role, content)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(conversation_id)
        .bind(role.to_string())
        .bind(content)
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE conversations SET last_activity_at = now() WHERE id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Up to `limit` most recent messages in chronological order. Fetches
    /// the full history ascending and takes the trailing window in process;
    /// `limit` is the only ceiling.
    pub async fn get_recent_messages(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ChatTurn>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT role, content FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tail_window(rows, limit)
            .into_iter()
            .map(|(role, content)| ChatTurn { role, content })
            .collect())
    }
}

/// Trailing window over chronologically ordered rows: the `limit` most
/// recent entries, oldest of the window first.
pub fn tail_window<T>(mut rows: Vec<T>, limit: usize) -> Vec<T> {
    if rows.len() > limit {
        rows.split_off(rows.len() - limit)
    } else {
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("Assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert!("system".parse::<Role>().is_err());
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_tail_window_takes_most_recent_in_order() {
        let rows: Vec<i32> = (1..=15).collect();
        let window = tail_window(rows, 10);
        assert_eq!(window.len(), 10);
        assert_eq!(window.first(), Some(&6));
        assert_eq!(window.last(), Some(&15));
    }

    #[test]
    fn test_tail_window_short_history_unchanged() {
        let rows: Vec<i32> = (1..=4).collect();
        assert_eq!(tail_window(rows.clone(), 10), rows);
    }

    #[test]
    fn test_tail_window_exact_limit() {
        let rows: Vec<i32> = (1..=10).collect();
        assert_eq!(tail_window(rows.clone(), 10), rows);
    }
}
