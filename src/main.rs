//! CLI for EchoChat
//!
//! Subcommands:
//! - `server`: run the WebSocket broker
//! - `client`: talk to a running broker from the command line

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use echochat::broker::TopicRegistry;
use echochat::cli::{self, ClientArgs};
use echochat::config::{load_config, load_config_from};
use echochat::transport::start_websocket_server;
use echochat::utils::error::ServerError;
use echochat::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "echochat", version, about = "Minimal WebSocket publish/subscribe broker")]
enum Command {
    /// Start the WebSocket server
    Server {
        /// Configuration file to load instead of config/default
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Send commands to a running server
    Client(ClientArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    match Command::parse() {
        Command::Server { config } => {
            if let Err(e) = run_server(config.as_deref()).await {
                logging::init("info");
                error!("Server failed: {e}");
                return ExitCode::FAILURE;
            }
        }
        Command::Client(args) => {
            logging::init("warn");
            if let Err(e) = cli::run(args).await {
                error!("Client failed: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

async fn run_server(config_path: Option<&str>) -> Result<(), ServerError> {
    let settings = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    logging::init(&settings.logging.level);

    let registry = Arc::new(TopicRegistry::default());

    tokio::select! {
        res = start_websocket_server(registry, settings) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    }
}
