use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::RwLock;
use crate::history::HistoryStore;
use crate::models::chat::{ ChatMessage, Conversation, Role };

/// Unbounded per-sender history living for the lifetime of the process.
#[derive(Default)]
pub struct MemoryHistoryStore {
    conversations: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let message = ChatMessage {
            role,
            content: content.to_string(),
            timestamp: Utc::now().timestamp(),
        };

        self.conversations
            .write().await
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str
    ) -> Result<Conversation, Box<dyn Error + Send + Sync>> {
        let messages = self.conversations
            .read().await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default();

        Ok(Conversation {
            id: conversation_id.to_string(),
            messages,
        })
    }

    async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}
