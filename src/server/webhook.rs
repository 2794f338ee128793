//! Webhook endpoint Meta calls for verification (GET) and event delivery (POST).
//!
//! Every validly received POST is acknowledged with `200 ok`, including
//! payloads that fail to parse and events whose downstream handling
//! failed, so the provider never retries a delivery.

use crate::agent::{ RelayAgent, RelayOutcome };
use crate::models::whatsapp::{ Skipped, VerifyQuery, WebhookPayload };
use std::sync::Arc;
use axum::{
    body::Bytes,
    routing::get,
    Router,
    extract::{ rejection::QueryRejection, DefaultBodyLimit, State, Query },
    response::IntoResponse,
    http::{ header, StatusCode },
};
use tower_http::limit::RequestBodyLimitLayer;
use log::{ info, warn, error, debug };

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<RelayAgent>,
    pub verify_token: Arc<str>,
}

pub fn router(state: AppState, webhook_path: &str, max_body_bytes: usize) -> Router {
    Router::new()
        .route(webhook_path, get(verify_handler).post(receive_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

async fn verify_handler(
    State(state): State<AppState>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Query(query) = match query {
        Ok(query) => query,
        Err(e) => {
            warn!("Webhook verification failed: malformed query ({})", e);
            return (StatusCode::FORBIDDEN, "Invalid verification token").into_response();
        }
    };
    info!("Webhook verification request: mode={}", query.mode);

    if query.verify_token == *state.verify_token {
        info!("Webhook verification successful");
        (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], query.challenge).into_response()
    } else {
        warn!("Webhook verification failed: invalid verify token");
        (StatusCode::FORBIDDEN, "Invalid verification token").into_response()
    }
}

async fn receive_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            error!("Webhook data structure error: {}", e);
            debug!("Full webhook data: {}", String::from_utf8_lossy(&body));
            return (StatusCode::OK, "ok");
        }
    };

    let event = match payload.first_text_message() {
        Ok(event) => event,
        Err(Skipped::NoMessage { statuses }) => {
            info!("No messages found in webhook data ({} status update(s))", statuses);
            return (StatusCode::OK, "ok");
        }
        Err(Skipped::NonText { msg_type }) => {
            info!("Received non-text message type: {}", msg_type);
            return (StatusCode::OK, "ok");
        }
        Err(Skipped::Incomplete) => {
            warn!("Text message without sender or body, ignoring");
            return (StatusCode::OK, "ok");
        }
    };

    match state.agent.handle_event(&event).await {
        RelayOutcome::Replied => info!("Replied to {}", event.sender),
        outcome => warn!("Message {} from {} ended with {:?}", event.message_id, event.sender, outcome),
    }
    (StatusCode::OK, "ok")
}
