//! WhatsApp Cloud API wire types.
//!
//! Inbound types mirror the webhook notification Meta posts to the
//! webhook path; every field defaults so status callbacks and partial
//! payloads deserialize without error. Outbound types are the JSON body
//! of `POST /{phone_number_id}/messages`.

use serde::{ Deserialize, Serialize };

/// Query parameters of the webhook verification handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode", default)]
    pub mode: String,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: String,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    /// Normally "whatsapp_business_account".
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: Option<WebhookValue>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messaging_product: String,
    #[serde(default)]
    pub metadata: Option<WebhookMetadata>,
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
    #[serde(default)]
    pub statuses: Vec<WebhookStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookMetadata {
    #[serde(default)]
    pub display_phone_number: String,
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookContact {
    #[serde(default)]
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<WebhookProfile>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookProfile {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookMessage {
    /// Sender phone number, e.g. "919876543210".
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    /// "text", "image", "audio", "interactive", ...
    #[serde(default, rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub text: Option<WebhookText>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookText {
    #[serde(default)]
    pub body: String,
}

/// Delivery/read receipt for a message we sent earlier.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookStatus {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub recipient_id: String,
}

/// A user text message pulled out of a webhook notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender: String,
    pub text: String,
    pub message_id: String,
    pub profile_name: Option<String>,
    pub business_number: Option<String>,
}

/// Why a notification carried nothing to reply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skipped {
    /// No messages at all, typically a status callback.
    NoMessage { statuses: usize },
    /// A message that is not plain text (image, audio, reaction, ...).
    NonText { msg_type: String },
    /// A text message with no sender or an empty body.
    Incomplete,
}

impl WebhookPayload {
    fn first_value(&self) -> Option<&WebhookValue> {
        self.entry
            .first()
            .and_then(|e| e.changes.first())
            .and_then(|c| c.value.as_ref())
    }

    /// Extracts the first user text message. Only the first entry/change
    /// is inspected; Meta delivers at most one user message per call.
    pub fn first_text_message(&self) -> Result<InboundEvent, Skipped> {
        let value = match self.first_value() {
            Some(v) => v,
            None => return Err(Skipped::NoMessage { statuses: 0 }),
        };

        let msg = match value.messages.first() {
            Some(m) => m,
            None => return Err(Skipped::NoMessage { statuses: value.statuses.len() }),
        };

        if msg.msg_type != "text" {
            return Err(Skipped::NonText { msg_type: msg.msg_type.clone() });
        }

        let text = msg.text.as_ref().map(|t| t.body.as_str()).unwrap_or_default();
        if text.trim().is_empty() || msg.from.is_empty() {
            return Err(Skipped::Incomplete);
        }

        let profile_name = value.contacts
            .first()
            .and_then(|c| c.profile.as_ref())
            .map(|p| p.name.clone())
            .filter(|n| !n.is_empty());
        let business_number = value.metadata
            .as_ref()
            .map(|m| m.display_phone_number.clone())
            .filter(|n| !n.is_empty());

        Ok(InboundEvent {
            sender: msg.from.clone(),
            text: text.to_string(),
            message_id: msg.id.clone(),
            profile_name,
            business_number,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: &'a str,
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub text: OutboundText<'a>,
}

#[derive(Debug, Serialize)]
pub struct OutboundText<'a> {
    pub preview_url: bool,
    pub body: &'a str,
}

impl<'a> SendMessageRequest<'a> {
    pub fn text(to: &'a str, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            msg_type: "text",
            text: OutboundText { preview_url: false, body },
        }
    }
}
