use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use log::{ debug, info };

use super::{ ChatClient, CompletionError, CompletionResponse };
use crate::llm::LlmConfig;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    /// Asks the model for a JSON document instead of free text.
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize, Debug)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    error: Option<GoogleError>,
}

#[derive(Deserialize, Debug)]
struct GoogleError {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Debug)]
struct GoogleCandidate {
    content: Option<GoogleContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize, Debug)]
struct GooglePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Self {
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CompletionError::Config("Google API key is required for GeminiChatClient".to_string()))?;

        Ok(Self::new(api_key, config.completion_model.clone(), config.base_url.clone()))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, CompletionError> {
        info!(
            "GeminiChatClient::complete() → model={} base_url={}",
            self.model,
            self.base_url
        );

        let payload = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt.to_string() }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let resp = self.client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        debug!("Gemini response status: {}", status);

        if !status.is_success() {
            return Err(CompletionError::Unavailable(format!("Gemini API error {}: {}", status, body)));
        }

        let parsed: GoogleResponse = serde_json::from_str(&body).map_err(|e|
            CompletionError::Unavailable(format!("Unreadable Gemini envelope: {}", e))
        )?;

        if let Some(error) = parsed.error {
            return Err(CompletionError::Unavailable(format!("Gemini error: {}", error.message)));
        }

        let candidate = parsed.candidates
            .first()
            .ok_or_else(|| CompletionError::Unavailable("No candidates in Gemini response".to_string()))?;

        let text: String = candidate.content
            .as_ref()
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CompletionError::Unavailable(format!(
                "Gemini returned no text (finishReason={})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(CompletionResponse { response: text.trim().to_string() })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{ body_partial_json, method, path, query_param };
    use wiremock::{ Mock, MockServer, ResponseTemplate };

    fn client(server: &MockServer) -> GeminiChatClient {
        GeminiChatClient::new("test-key".into(), Some("gemini-test".into()), Some(server.uri()))
    }

    #[tokio::test]
    async fn returns_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [{ "text": "hello" }] }],
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "{\"response_text\": " }, { "text": "\"hi\"}\n" }] },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server).await;

        let resp = client(&server).complete("hello").await.unwrap();
        assert_eq!(resp.response, "{\"response_text\": \"hi\"}");
    }

    #[tokio::test]
    async fn http_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server).await;

        let err = client(&server).complete("hello").await.unwrap_err();
        assert!(matches!(err, CompletionError::Unavailable(ref m) if m.contains("503")));
    }

    #[tokio::test]
    async fn blocked_prompt_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server).await;

        let err = client(&server).complete("hello").await.unwrap_err();
        assert!(matches!(err, CompletionError::Unavailable(ref m) if m.contains("SAFETY")));
    }

    #[tokio::test]
    async fn unreachable_provider_is_unavailable() {
        let client = GeminiChatClient::new("k".into(), None, Some("http://127.0.0.1:9".into()));
        assert!(matches!(client.complete("hello").await, Err(CompletionError::Unavailable(_))));
    }

    #[tokio::test]
    async fn transport_error_does_not_reveal_api_key() {
        let client = GeminiChatClient::new("SUPERSECRET".into(), None, Some("http://127.0.0.1:9".into()));
        let err = client.complete("hello").await.unwrap_err();
        assert!(!err.to_string().contains("SUPERSECRET"), "{err}");
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let config = LlmConfig { api_key: Some("  ".into()), ..Default::default() };
        assert!(matches!(GeminiChatClient::from_config(&config), Err(CompletionError::Config(_))));
    }
}
