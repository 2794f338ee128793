use crate::history::HistoryStore;
use crate::llm::reply::ReplyGenerator;
use crate::models::chat::Role;
use crate::models::whatsapp::InboundEvent;
use crate::whatsapp::MessageSender;

use log::{ info, warn, error };
use std::sync::Arc;

/// What happened to one inbound message. The webhook acknowledges every
/// outcome with success; the variants exist for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Replied,
    /// Reply generated and stored, but the send-message call failed.
    DeliveryFailed,
    /// The completion provider failed; history is untouched.
    CompletionUnavailable,
    /// The history store could not be read or written.
    StoreFailed,
}

pub struct RelayAgent {
    history_store: Arc<dyn HistoryStore>,
    replies: ReplyGenerator,
    sender: Arc<dyn MessageSender>,
    context: Arc<str>,
    fallback_reply: Option<String>,
}

impl RelayAgent {
    pub fn new(
        history_store: Arc<dyn HistoryStore>,
        replies: ReplyGenerator,
        sender: Arc<dyn MessageSender>,
        context: Arc<str>,
        fallback_reply: Option<String>
    ) -> Self {
        let fallback_reply = fallback_reply.filter(|r| !r.trim().is_empty());
        Self { history_store, replies, sender, context, fallback_reply }
    }

    pub fn history_store(&self) -> &Arc<dyn HistoryStore> {
        &self.history_store
    }

    pub async fn handle_event(&self, event: &InboundEvent) -> RelayOutcome {
        let preview: String = event.text.chars().take(50).collect();
        info!(
            "Message {} from {} (Display Name: {}) to {}: {}...",
            event.message_id,
            event.sender,
            event.profile_name.as_deref().unwrap_or("N/A"),
            event.business_number.as_deref().unwrap_or("N/A"),
            preview
        );

        let conversation = match self.history_store.get_conversation(&event.sender).await {
            Ok(c) => c,
            Err(e) => {
                error!("History read failed for {}: {}", event.sender, e);
                return RelayOutcome::StoreFailed;
            }
        };

        let reply = match self.replies.generate(&self.context, &conversation, &event.text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("LLM interaction error for {}: {}", event.sender, e);
                self.send_fallback(&event.sender).await;
                return RelayOutcome::CompletionUnavailable;
            }
        };
        if !reply.structured {
            warn!("Replying to {} with unstructured provider text", event.sender);
        }

        if let Err(e) = self.record_exchange(&event.sender, &event.text, &reply.text).await {
            error!("History write failed for {}: {}", event.sender, e);
            return RelayOutcome::StoreFailed;
        }

        match self.sender.send_text(&event.sender, &reply.text).await {
            Ok(()) => RelayOutcome::Replied,
            Err(e) => {
                error!("Failed to deliver reply to {}: {}", event.sender, e);
                RelayOutcome::DeliveryFailed
            }
        }
    }

    async fn record_exchange(
        &self,
        sender: &str,
        user_text: &str,
        reply_text: &str
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.history_store.add_message(sender, Role::User, user_text).await?;
        self.history_store.add_message(sender, Role::Assistant, reply_text).await?;
        Ok(())
    }

    async fn send_fallback(&self, sender: &str) {
        if let Some(fallback) = &self.fallback_reply {
            if let Err(e) = self.sender.send_text(sender, fallback).await {
                warn!("Fallback reply to {} was not delivered: {}", sender, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::prompt::{ Persona, PromptConfig };
    use crate::history::MemoryHistoryStore;
    use crate::llm::chat::{ ChatClient, CompletionError, CompletionResponse };
    use crate::whatsapp::DeliveryError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedChat {
        replies: Mutex<Vec<Result<String, String>>>,
    }

    #[async_trait]
    impl ChatClient for ScriptedChat {
        async fn complete(&self, _prompt: &str) -> Result<CompletionResponse, CompletionError> {
            match self.replies.lock().unwrap().remove(0) {
                Ok(response) => Ok(CompletionResponse { response }),
                Err(e) => Err(CompletionError::Unavailable(e)),
            }
        }
        fn get_model(&self) -> String {
            "scripted".into()
        }
        fn get_base_url(&self) -> Option<String> {
            None
        }
    }

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageSender for Outbox {
        async fn send_text(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            if self.fail {
                return Err(DeliveryError::Rejected { status: 400, body: "bad".into() });
            }
            Ok(())
        }
    }

    fn agent(replies: Vec<Result<&str, &str>>, outbox: Arc<Outbox>) -> RelayAgent {
        let chat = Arc::new(ScriptedChat {
            replies: Mutex::new(
                replies.into_iter().map(|r| r.map(String::from).map_err(String::from)).collect()
            ),
        });
        let generator = ReplyGenerator::new(
            chat,
            Arc::new(PromptConfig::default()),
            Persona { name: "Diksha".into(), organization: "Acme".into() }
        );
        RelayAgent::new(
            Arc::new(MemoryHistoryStore::new()),
            generator,
            outbox,
            Arc::from("Acme builds software."),
            Some("Sorry, try again later.".into())
        )
    }

    fn event(text: &str) -> InboundEvent {
        InboundEvent {
            sender: "111".into(),
            text: text.into(),
            message_id: "wamid.1".into(),
            profile_name: None,
            business_number: None,
        }
    }

    #[tokio::test]
    async fn completion_failure_sends_fallback_and_keeps_history_clean() {
        let outbox = Arc::new(Outbox::default());
        let agent = agent(vec![Err("timeout")], outbox.clone());

        assert_eq!(agent.handle_event(&event("hi")).await, RelayOutcome::CompletionUnavailable);
        assert_eq!(agent.history_store().conversation_count().await, 0);
        assert_eq!(
            *outbox.sent.lock().unwrap(),
            vec![("111".to_string(), "Sorry, try again later.".to_string())]
        );
    }

    #[tokio::test]
    async fn delivery_failure_still_records_history() {
        let outbox = Arc::new(Outbox { fail: true, ..Default::default() });
        let agent = agent(vec![Ok(r#"{"response_text": "Hello!"}"#)], outbox.clone());

        assert_eq!(agent.handle_event(&event("hi")).await, RelayOutcome::DeliveryFailed);
        let conversation = agent.history_store().get_conversation("111").await.unwrap();
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[1].content, "Hello!");
    }

    #[tokio::test]
    async fn unstructured_reply_is_sent_verbatim() {
        let outbox = Arc::new(Outbox::default());
        let agent = agent(vec![Ok("We build software.")], outbox.clone());

        assert_eq!(agent.handle_event(&event("What do you do?")).await, RelayOutcome::Replied);
        assert_eq!(outbox.sent.lock().unwrap()[0].1, "We build software.");
    }
}
