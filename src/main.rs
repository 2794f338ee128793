use clap::Parser;
use dotenv::dotenv;
use log::error;
use std::process::ExitCode;
use whatsapp_relay::cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match whatsapp_relay::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Startup failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
