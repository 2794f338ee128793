use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Webhook Args ---
    /// Shared secret Meta sends back during webhook registration (hub.verify_token).
    #[arg(long, env = "VERIFY_TOKEN")]
    pub verify_token: String,

    /// Path the webhook is mounted on (GET for verification, POST for events).
    #[arg(long, env = "WEBHOOK_PATH", default_value = "/webhook")]
    pub webhook_path: String,

    /// Maximum accepted webhook request body size in bytes.
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "1048576")]
    pub max_body_bytes: usize,

    // --- WhatsApp Cloud API Args ---
    /// Bearer access token for the WhatsApp Business Cloud API.
    #[arg(long, env = "WHATSAPP_ACCESS_TOKEN")]
    pub whatsapp_access_token: String,

    /// Phone number ID replies are sent from.
    #[arg(long, env = "WHATSAPP_PHONE_NUMBER_ID")]
    pub whatsapp_phone_number_id: String,

    /// Base URL of the Graph API.
    #[arg(long, env = "WHATSAPP_API_BASE", default_value = "https://graph.facebook.com")]
    pub whatsapp_api_base: String,

    /// Graph API version segment used in the send-message URL.
    #[arg(long, env = "WHATSAPP_API_VERSION", default_value = "v22.0")]
    pub whatsapp_api_version: String,

    // --- Chat LLM Provider Args ---
    /// API Key for the Gemini completion provider.
    #[arg(long, env = "GEMINI_API_KEY")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gemini-2.0-flash)
    #[arg(long, env = "CHAT_MODEL", default_value = "gemini-2.0-flash")]
    pub chat_model: String,

    /// Base URL for the Gemini API (the model path is appended to it).
    #[arg(
        long,
        env = "CHAT_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub chat_base_url: String,

    /// Reply sent to the user when the completion provider cannot be reached.
    #[arg(
        long,
        env = "COMPLETION_FALLBACK_REPLY",
        default_value = "I apologize, but I'm having trouble processing that right now. Could you please try again later?"
    )]
    pub completion_fallback_reply: String,

    // --- Persona / Knowledge Args ---
    /// PDF document whose text is used as the knowledge context for every reply.
    #[arg(long, env = "PDF_PATH", default_value = "data/company_profile.pdf")]
    pub pdf_path: String,

    /// Name the assistant answers as.
    #[arg(long, env = "PERSONA_NAME", default_value = "Diksha")]
    pub persona_name: String,

    /// Organization the assistant represents.
    #[arg(long, env = "ORGANIZATION_NAME", default_value = "the company")]
    pub organization_name: String,

    /// Optional JSON file overriding the built-in reply prompt template.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    // --- Server Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:5000")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> Vec<&'static str> {
        vec![
            "whatsapp-relay",
            "--verify-token",
            "secret",
            "--whatsapp-access-token",
            "EAAB",
            "--whatsapp-phone-number-id",
            "12345",
            "--chat-api-key",
            "gk",
        ]
    }

    #[test]
    fn defaults_are_applied() {
        let args = Args::try_parse_from(required()).unwrap();
        assert_eq!(args.webhook_path, "/webhook");
        assert_eq!(args.whatsapp_api_version, "v22.0");
        assert_eq!(args.chat_model, "gemini-2.0-flash");
        assert_eq!(args.max_body_bytes, 1_048_576);
        assert!(!args.enable_tls);
        assert!(args.prompts_path.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut argv = required();
        argv.extend(["--persona-name", "Asha", "--server-addr", "127.0.0.1:8080"]);
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!(args.persona_name, "Asha");
        assert_eq!(args.server_addr, "127.0.0.1:8080");
    }
}
