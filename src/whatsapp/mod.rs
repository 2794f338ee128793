//! Outbound text delivery through the WhatsApp Business Cloud API.
//!
//! Sends go to `{api_base}/{version}/{phone_number_id}/messages` with a
//! bearer token. One request per message part, no retries.

use async_trait::async_trait;
use log::{ error, info };
use reqwest::header::AUTHORIZATION;
use thiserror::Error;

use crate::models::whatsapp::SendMessageRequest;

/// WhatsApp text message character limit.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("WhatsApp API rejected message ({status}): {body}")]
    Rejected {
        status: u16,
        body: String,
    },
    #[error("WhatsApp API unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub access_token: String,
    pub phone_number_id: String,
    pub api_base: String,
    pub api_version: String,
}

pub struct WhatsAppClient {
    client: reqwest::Client,
    config: WhatsAppConfig,
}

impl WhatsAppClient {
    pub fn new(config: WhatsAppConfig) -> Self {
        info!(
            "WhatsApp client configured: phone_number_id={} api={}/{}",
            config.phone_number_id,
            config.api_base,
            config.api_version
        );
        Self { client: reqwest::Client::new(), config }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.config.api_version,
            self.config.phone_number_id
        )
    }

    async fn send_part(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        let resp = self.client
            .post(self.messages_url())
            .header(AUTHORIZATION, format!("Bearer {}", self.config.access_token))
            .json(&SendMessageRequest::text(to, body))
            .send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        error!("WhatsApp API error: {} - {}", status, body);
        Err(DeliveryError::Rejected { status: status.as_u16(), body })
    }
}

#[async_trait]
impl MessageSender for WhatsAppClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        let preview: String = body.chars().take(50).collect();
        info!("Sending message to {}: {}...", to, preview);

        for part in split_message(body, MAX_MESSAGE_LENGTH) {
            self.send_part(to, part).await?;
        }
        info!("Message sent successfully to {}", to);
        Ok(())
    }
}

/// Splits `body` into parts of at most `limit` characters, preferring to
/// break after a newline or space in the second half of each part. A zero
/// `limit` leaves the body whole.
pub fn split_message(body: &str, limit: usize) -> Vec<&str> {
    if limit == 0 {
        return vec![body];
    }
    let mut parts = Vec::new();
    let mut rest = body;

    while rest.chars().count() > limit {
        let hard_end = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..hard_end];
        let soft_end = window
            .rfind(|c: char| c == '\n' || c == ' ')
            .filter(|&i| window[..i].chars().count() >= limit / 2)
            .map(|i| i + 1);
        let end = soft_end.unwrap_or(hard_end);

        parts.push(&rest[..end]);
        rest = &rest[end..];
    }
    if !rest.is_empty() || parts.is_empty() {
        parts.push(rest);
    }
    parts
}
