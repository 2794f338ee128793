pub mod gemini;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use super::LlmConfig;
use self::gemini::GeminiChatClient;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// The provider could not produce a completion. Never retried.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion unavailable: {0}")]
    Unavailable(String),
    #[error("completion client misconfigured: {0}")]
    Config(String),
}

/// The request URL carries the API key, so it is stripped before the
/// error is rendered.
impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Unavailable(err.without_url().to_string())
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, CompletionError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, CompletionError> {
    let specific_client = GeminiChatClient::from_config(config)?;
    Ok(Arc::new(specific_client))
}
