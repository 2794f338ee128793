//! Turns a user message into the assistant's reply text.
//!
//! The provider is asked for `{"response_text": ..., "button": ...}` but
//! does not always comply: it may wrap the object in a Markdown fence or
//! answer in plain prose. Anything that does not yield a usable
//! `response_text` is passed through verbatim instead of failing the
//! request.

use log::{ info, warn };
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

use super::chat::{ ChatClient, CompletionError };
use crate::config::prompt::{ self, Persona, PromptConfig };
use crate::history::format_history_for_prompt;
use crate::models::chat::Conversation;

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A```(?:json|JSON)?\s*(.*?)\s*```\z").expect("valid fence regex")
});

/// Optional call-to-action the model may attach to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplyButton {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Deserialize)]
struct StructuredReply {
    response_text: Option<String>,
    #[serde(default)]
    button: Option<ReplyButton>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub text: String,
    pub button: Option<ReplyButton>,
    /// False when the raw provider text was used as-is.
    pub structured: bool,
}

/// Parses the whole reply as JSON, and only when that fails looks for a
/// fence wrapping the entire reply.
fn decode(raw: &str) -> Result<StructuredReply, serde_json::Error> {
    let trimmed = raw.trim();
    match serde_json::from_str::<StructuredReply>(trimmed) {
        Ok(reply) => Ok(reply),
        Err(e) => {
            match JSON_FENCE.captures(trimmed).and_then(|caps| caps.get(1)) {
                Some(inner) => serde_json::from_str(inner.as_str()),
                None => Err(e),
            }
        }
    }
}

pub fn parse_reply(raw: &str) -> ParsedReply {
    match decode(raw) {
        Ok(StructuredReply { response_text: Some(text), button }) if !text.trim().is_empty() => {
            ParsedReply { text: text.trim().to_string(), button, structured: true }
        }
        Ok(_) => {
            warn!("Completion JSON has no usable response_text; using raw text");
            ParsedReply { text: raw.to_string(), button: None, structured: false }
        }
        Err(e) => {
            warn!("Completion is not the expected JSON ({}); using raw text", e);
            ParsedReply { text: raw.to_string(), button: None, structured: false }
        }
    }
}

pub struct ReplyGenerator {
    chat_client: Arc<dyn ChatClient>,
    prompt_config: Arc<PromptConfig>,
    persona: Persona,
}

impl ReplyGenerator {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        prompt_config: Arc<PromptConfig>,
        persona: Persona
    ) -> Self {
        Self { chat_client, prompt_config, persona }
    }

    pub async fn generate(
        &self,
        context: &str,
        history: &Conversation,
        message: &str
    ) -> Result<ParsedReply, CompletionError> {
        let history_str = format_history_for_prompt(history, &self.persona.name);
        let prompt = prompt::get_reply_prompt(
            &self.prompt_config,
            &self.persona,
            context,
            &history_str,
            message
        );

        let resp = self.chat_client.complete(&prompt).await?;
        let reply = parse_reply(&resp.response);
        if let Some(button) = &reply.button {
            info!("Reply carries a '{}' button: {} -> {}", button.kind, button.label, button.value);
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::CompletionResponse;
    use crate::models::chat::{ ChatMessage, Role };
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn plain_json_is_parsed() {
        let reply = parse_reply(r#"{"response_text": "We build software."}"#);
        assert_eq!(reply.text, "We build software.");
        assert!(reply.structured);
        assert!(reply.button.is_none());
    }

    #[test]
    fn fenced_json_with_button_is_parsed() {
        let raw = "```json\n{\"response_text\": \"Call us.\", \"button\": {\"type\": \"phone_number\", \"label\": \"Call Now\", \"value\": \"9876543210\"}}\n```";
        let reply = parse_reply(raw);
        assert_eq!(reply.text, "Call us.");
        assert_eq!(reply.button, Some(ReplyButton {
            kind: "phone_number".into(),
            label: "Call Now".into(),
            value: "9876543210".into(),
        }));
    }

    #[test]
    fn backticks_inside_reply_text_are_kept() {
        let reply = parse_reply(r#"{"response_text": "Run ```npm install``` to start."}"#);
        assert!(reply.structured);
        assert_eq!(reply.text, "Run ```npm install``` to start.");
    }

    #[test]
    fn fenced_json_with_backticks_inside_is_parsed() {
        let raw = "```json\n{\"response_text\": \"Use ```code``` blocks.\"}\n```\n";
        let reply = parse_reply(raw);
        assert!(reply.structured);
        assert_eq!(reply.text, "Use ```code``` blocks.");
    }

    #[test]
    fn prose_with_inline_fence_is_returned_verbatim() {
        let raw = "Try this:\n```json\n{\"response_text\": \"x\"}\n```";
        let reply = parse_reply(raw);
        assert!(!reply.structured);
        assert_eq!(reply.text, raw);
    }

    #[test]
    fn partial_button_does_not_discard_reply() {
        let reply = parse_reply(r#"{"response_text": "See our site.", "button": {"type": "url"}}"#);
        assert_eq!(reply.text, "See our site.");
        assert_eq!(reply.button.map(|b| b.kind), Some("url".to_string()));
    }

    #[test]
    fn prose_is_returned_verbatim() {
        let raw = "Sure! We build software.\n";
        let reply = parse_reply(raw);
        assert_eq!(reply.text, raw);
        assert!(!reply.structured);
    }

    #[test]
    fn missing_field_is_returned_verbatim() {
        let raw = r#"{"answer": "nope"}"#;
        assert_eq!(parse_reply(raw).text, raw);
    }

    #[test]
    fn non_string_field_is_returned_verbatim() {
        let raw = r#"{"response_text": 42}"#;
        assert_eq!(parse_reply(raw).text, raw);
    }

    #[test]
    fn non_object_json_is_returned_verbatim() {
        assert_eq!(parse_reply("[1, 2]").text, "[1, 2]");
    }

    struct RecordingClient {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatClient for RecordingClient {
        async fn complete(&self, prompt: &str) -> Result<CompletionResponse, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(CompletionResponse { response: self.reply.clone() })
        }
        fn get_model(&self) -> String {
            "fake".into()
        }
        fn get_base_url(&self) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn generate_sends_context_history_and_message() {
        let client = Arc::new(RecordingClient {
            reply: r#"{"response_text": "Yes."}"#.into(),
            prompts: Mutex::new(Vec::new()),
        });
        let generator = ReplyGenerator::new(
            client.clone(),
            Arc::new(PromptConfig::default()),
            Persona { name: "Diksha".into(), organization: "Acme".into() }
        );
        let history = Conversation {
            id: "111".into(),
            messages: vec![
                ChatMessage { role: Role::User, content: "hi".into(), timestamp: 0 },
                ChatMessage { role: Role::Assistant, content: "hello".into(), timestamp: 0 }
            ],
        };

        let reply = generator.generate("Acme makes anvils.", &history, "Do you ship?").await.unwrap();
        assert_eq!(reply.text, "Yes.");

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Acme makes anvils."));
        assert!(prompts[0].contains("User: hi\nDiksha: hello\nUser: Do you ship?"));
    }
}
