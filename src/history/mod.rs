mod memory;

pub use memory::MemoryHistoryStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use crate::models::chat::{ Conversation, Role };

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Returns every stored turn in arrival order; an unknown id yields an
    /// empty conversation.
    async fn get_conversation(
        &self,
        conversation_id: &str
    ) -> Result<Conversation, Box<dyn Error + Send + Sync>>;

    async fn conversation_count(&self) -> usize;
}

pub fn initialize_history_store() -> Arc<dyn HistoryStore> {
    info!("Chat history will be kept in process memory (cleared on restart)");
    Arc::new(MemoryHistoryStore::new())
}

pub fn format_history_for_prompt(conversation: &Conversation, assistant_name: &str) -> String {
    let mut result = String::new();
    for msg in &conversation.messages {
        let role_display = match msg.role {
            Role::User => "User",
            Role::Assistant => assistant_name,
        };

        result.push_str(&format!("{}: {}\n", role_display, msg.content));
    }

    result
}
