pub mod agent;
pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;
pub mod pdf;
pub mod whatsapp;

use agent::RelayAgent;
use cli::Args;
use config::prompt::{ self, Persona };
use history::initialize_history_store;
use llm::LlmConfig;
use llm::chat::{ new_client as new_chat_client, ChatClient };
use llm::reply::ReplyGenerator;
use log::info;
use server::Server;
use server::webhook::AppState;
use whatsapp::{ WhatsAppClient, WhatsAppConfig };
use std::error::Error;
use std::sync::Arc;

/// Builds every component from `args`. Fails before anything binds when the
/// knowledge document or prompt template cannot be loaded.
pub fn build_state(args: &Args) -> Result<AppState, Box<dyn Error + Send + Sync>> {
    if args.verify_token.trim().is_empty() {
        return Err("VERIFY_TOKEN must not be empty".into());
    }

    let prompt_config = prompt::load_prompts(args.prompts_path.as_deref())?;
    let context: Arc<str> = Arc::from(pdf::extract_text(&args.pdf_path)?);

    let chat_client = new_chat_client(&LlmConfig {
        api_key: Some(args.chat_api_key.clone()),
        completion_model: Some(args.chat_model.clone()),
        base_url: Some(args.chat_base_url.clone()),
    })?;
    info!(
        "Chat client configured: Model={}, BaseURL={:?}",
        chat_client.get_model(),
        chat_client.get_base_url()
    );

    let replies = ReplyGenerator::new(
        chat_client,
        prompt_config,
        Persona {
            name: args.persona_name.clone(),
            organization: args.organization_name.clone(),
        }
    );

    let sender = Arc::new(WhatsAppClient::new(WhatsAppConfig {
        access_token: args.whatsapp_access_token.clone(),
        phone_number_id: args.whatsapp_phone_number_id.clone(),
        api_base: args.whatsapp_api_base.clone(),
        api_version: args.whatsapp_api_version.clone(),
    }));

    let agent = RelayAgent::new(
        initialize_history_store(),
        replies,
        sender,
        context,
        Some(args.completion_fallback_reply.clone())
    );

    Ok(AppState {
        agent: Arc::new(agent),
        verify_token: Arc::from(args.verify_token.as_str()),
    })
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Webhook Path: {}", args.webhook_path);
    info!("PDF Path: {}", args.pdf_path);
    info!("Persona: {} ({})", args.persona_name, args.organization_name);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("Chat Model: {}", args.chat_model);
    info!("WhatsApp Phone Number ID: {}", args.whatsapp_phone_number_id);
    info!("WhatsApp API: {}/{}", args.whatsapp_api_base, args.whatsapp_api_version);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let state = build_state(&args)?;
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, state, args);
    server.run().await?;

    Ok(())
}
