use once_cell::sync::Lazy;
use regex::{ Captures, Regex };
use serde::Deserialize;
use std::fs;
use std::sync::Arc;
use thiserror::Error;
use log::info;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt template '{0}' not found")]
    TemplateNotFound(String),
    #[error("Prompt file IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Prompt JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

const DEFAULT_REPLY_TEMPLATE: &str = r#"
[Document Context]:
The following text is taken from {organization}'s reference document. Answer using only this information; if the answer is not in it, say so politely and offer to help with something else.

{context}

[Persona]:
You are {persona}, a helpful and knowledgeable representative of {organization}. Reply naturally, concisely and warmly, the way a human counselor would.

[Task]:
* Answer questions about {organization}, its services, offerings and contact details from the [Document Context].
* Respond in English by default. Only switch language when the user writes in another language, and then reply in that language.
* Keep replies short and conversational.
* Include a "button" object only when the user explicitly asks for a phone number, email or website, with "type" ("phone_number" or "url"), "label" (max 20 characters) and "value".

[Response Format]:
Always respond with a single JSON object with the mandatory key "response_text" (your reply to the user) and the optional key "button".

Example:
{"response_text": "You can reach us at 9876543210.", "button": {"type": "phone_number", "label": "Call Now", "value": "9876543210"}}

[Conversation]:
{history}User: {message}
{persona}: "#;

#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    pub reply_template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { reply_template: DEFAULT_REPLY_TEMPLATE.trim_start().to_string() }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if self.reply_template.trim().is_empty() {
            return Err(PromptError::TemplateNotFound("reply_template".to_string()));
        }
        Ok(())
    }
}

/// Loads the reply template from `path`, or the built-in one when no path is configured.
pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, PromptError> {
    let config = match path {
        Some(path) => {
            info!("Loading prompt template from: {}", path);
            let file_content = fs::read_to_string(path)?;
            let config: PromptConfig = serde_json::from_str(&file_content)?;
            config.validate()?;
            config
        }
        None => {
            info!("Using built-in prompt template");
            PromptConfig::default()
        }
    };
    Ok(Arc::new(config))
}

/// Who the assistant speaks as.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
    pub organization: String,
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(persona|organization|context|history|message)\}").expect("valid placeholder regex")
});

/// Renders the reply template in a single pass, so placeholders appearing
/// inside substituted text (document, history, user message) stay literal.
pub fn get_reply_prompt(
    config: &PromptConfig,
    persona: &Persona,
    context: &str,
    history: &str,
    message: &str
) -> String {
    PLACEHOLDER.replace_all(&config.reply_template, |caps: &Captures| {
        match &caps[1] {
            "persona" => persona.name.clone(),
            "organization" => persona.organization.clone(),
            "context" => context.to_string(),
            "history" => history.to_string(),
            _ => message.to_string(),
        }
    }).into_owned()
}
