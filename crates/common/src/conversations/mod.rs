//! Conversation store abstraction
//!
//! Conversations (one uploaded document, an ordered chat transcript) are
//! owned by an external store; the pipelines only create, delete, and
//! append through this trait. The in-memory implementation backs the
//! test suites.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Who produced a chat turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message in a conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A conversation record: one document, one transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Name of the uploaded file this conversation is about
    pub file_name: String,
    pub chat: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
}

/// Trait for external conversation persistence
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a conversation with an empty transcript
    async fn create(&self, user_id: Uuid, file_name: &str) -> Result<Conversation>;

    /// Fetch a conversation, if it exists
    async fn get(&self, conversation_id: Uuid) -> Result<Option<Conversation>>;

    /// Delete a conversation; deleting an unknown id is not an error
    async fn delete(&self, conversation_id: Uuid) -> Result<()>;

    /// Append a question/answer pair to the transcript
    async fn append_turn(
        &self,
        conversation_id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<()>;
}

/// In-memory conversation store for testing
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<Uuid, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create(&self, user_id: Uuid, file_name: &str) -> Result<Conversation> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id,
            file_name: file_name.to_string(),
            chat: Vec::new(),
            created_at: Utc::now(),
        };

        self.conversations
            .write()
            .await
            .insert(conversation.id, conversation.clone());

        Ok(conversation)
    }

    async fn get(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().await.get(&conversation_id).cloned())
    }

    async fn delete(&self, conversation_id: Uuid) -> Result<()> {
        self.conversations.write().await.remove(&conversation_id);
        Ok(())
    }

    async fn append_turn(
        &self,
        conversation_id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<()> {
        let mut store = self.conversations.write().await;
        let conversation = store
            .get_mut(&conversation_id)
            .ok_or(AppError::ConversationNotFound {
                id: conversation_id,
            })?;

        let now = Utc::now();
        conversation.chat.push(ChatTurn {
            role: ChatRole::User,
            content: question.to_string(),
            created_at: now,
        });
        conversation.chat.push(ChatTurn {
            role: ChatRole::Assistant,
            content: answer.to_string(),
            created_at: now,
        });

        Ok(())
    }
}
