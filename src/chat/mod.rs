//! Chat turn orchestration
//!
//! State machine per request: received → history-resolved → rewritten
//! (optional) → context-retrieved → prompt-built → generated → persisted →
//! responded. Validation and history resolution are load-bearing and abort
//! the turn; rewrite, retrieval and persistence are advisory and degrade
//! explicitly at their call sites.

use crate::config::{default_anonymous_user, ChatConfig};
use crate::error::{Error, Result};
use crate::history::{HistoryManager, Role};
use crate::llm::{
    build_rewrite_messages, build_system_prompt, heuristic_reply, ChatClient, ChatTurn,
};
use crate::retrieve::Retriever;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

fn default_max_results() -> usize {
    crate::config::default_retrieval_k()
}

/// An incoming chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

/// The completed turn handed back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub context_used: Option<Vec<String>>,
    pub request_id: String,
}

/// Reject empty or whitespace-only input before any store or model call
pub fn validate_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(Error::Validation("الرسالة فارغة".to_string()));
    }
    Ok(())
}

/// A rewrite replaces the retrieval query only when it is non-empty and
/// under the length ceiling; otherwise the original message is kept.
pub fn accept_rewrite(candidate: &str, max_chars: usize) -> Option<String> {
    if candidate.trim().is_empty() || candidate.chars().count() >= max_chars {
        return None;
    }
    Some(candidate.to_string())
}

/// Orchestrates one chat turn across history, retrieval and generation
#[derive(Clone)]
pub struct ChatService {
    history: HistoryManager,
    retriever: Retriever,
    llm: ChatClient,
    config: ChatConfig,
}

impl ChatService {
    pub fn new(
        history: HistoryManager,
        retriever: Retriever,
        llm: ChatClient,
        config: ChatConfig,
    ) -> Self {
        Self {
            history,
            retriever,
            llm,
            config,
        }
    }

    /// Run the full turn. `request_id` is the correlation identifier
    /// assigned at request entry and is echoed in the response.
    pub async fn chat(&self, request: &ChatRequest, request_id: &str) -> Result<ChatResponse> {
        validate_message(&request.message)?;

        let user_id = request
            .user_id
            .clone()
            .unwrap_or_else(default_anonymous_user);

        // Conversation state is a hard dependency for the turn
        let (conversation_id, history) = match self.resolve_history(&user_id).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(request_id = %request_id, error = %e, "Conversation management failed");
                return Err(Error::Conversation(e.to_string()));
            }
        };

        let search_query = self
            .rewrite_query(&history, &request.message, request_id)
            .await;

        let context_chunks = match self
            .retriever
            .retrieve(&search_query, request.max_results)
            .await
        {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Context retrieval degraded to empty");
                Vec::new()
            }
        };

        let system_instruction = build_system_prompt(&context_chunks);
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatTurn::system(system_instruction));
        messages.extend(history);
        messages.push(ChatTurn::user(request.message.clone()));

        let answer = match self.llm.complete(&messages).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Generation failed, using fallback responder");
                heuristic_reply(&request.message)
            }
        };

        // Best-effort persistence: the answer is already produced and is
        // returned even when the write fails
        if let Err(e) = self
            .persist_turn(conversation_id, &request.message, &answer)
            .await
        {
            error!(request_id = %request_id, error = %e, "Failed to persist chat turn");
        }

        info!(request_id = %request_id, "Chat turn completed");

        Ok(ChatResponse {
            answer,
            context_used: if context_chunks.is_empty() {
                None
            } else {
                Some(context_chunks)
            },
            request_id: request_id.to_string(),
        })
    }

    async fn resolve_history(&self, user_id: &str) -> Result<(Uuid, Vec<ChatTurn>)> {
        let conversation_id = self.history.get_or_create_conversation(user_id).await?;
        let history = self
            .history
            .get_recent_messages(conversation_id, self.config.history_window)
            .await?;
        Ok((conversation_id, history))
    }

    /// Advisory rewrite: attempted only when prior turns exist, accepted
    /// only under the ceiling; any failure leaves the original message.
    async fn rewrite_query(&self, history: &[ChatTurn], message: &str, request_id: &str) -> String {
        if history.is_empty() {
            return message.to_string();
        }

        match self
            .llm
            .complete(&build_rewrite_messages(history, message))
            .await
        {
            Ok(candidate) => match accept_rewrite(&candidate, self.config.rewrite_max_chars) {
                Some(rewritten) => {
                    info!(request_id = %request_id, "Query rewritten for retrieval");
                    rewritten
                }
                None => message.to_string(),
            },
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Query rewrite failed, using original message");
                message.to_string()
            }
        }
    }

    async fn persist_turn(&self, conversation_id: Uuid, message: &str, answer: &str) -> Result<()> {
        self.history
            .add_message(conversation_id, Role::User, message)
            .await?;
        self.history
            .add_message(conversation_id, Role::Assistant, answer)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_message_rejected() {
        assert!(matches!(
            validate_message("").unwrap_err(),
            Error::Validation(_)
        ));
        assert!(matches!(
            validate_message("   \n\t").unwrap_err(),
            Error::Validation(_)
        ));
        assert!(validate_message("ما هي الرحلات المتاحة؟").is_ok());
    }

    #[test]
    fn test_rewrite_ceiling_discards_long_results() {
        let long = "س".repeat(250);
        assert_eq!(accept_rewrite(&long, 200), None);

        let exact = "س".repeat(200);
        assert_eq!(accept_rewrite(&exact, 200), None);

        let short = "ما هي الرحلات المتاحة من الرياض؟";
        assert_eq!(accept_rewrite(short, 200), Some(short.to_string()));
    }

    #[test]
    fn test_rewrite_rejects_empty_candidates() {
        assert_eq!(accept_rewrite("", 200), None);
        assert_eq!(accept_rewrite("  \n ", 200), None);
    }

    #[test]
    fn test_request_defaults() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"message": "ما هي الرحلات المتاحة؟"}"#).unwrap();
        assert_eq!(request.max_results, 5);
        assert!(request.user_id.is_none());
    }
}
