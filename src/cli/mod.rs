//! CLI module for the campus assistant
//!
//! Subcommands:
//! - `admin`: deploy, inspect or delete the knowledge base
//! - `chat`: interactive assistant in the terminal
//! - `serve`: web chat front end

pub mod admin;
pub mod chat;
pub mod serve;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::signal;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// KCA University academic assistant backed by Amazon Bedrock Knowledge Bases
#[derive(Parser)]
#[command(name = "campus-assistant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy, check or delete the knowledge base
    Admin(AdminArgs),

    /// Chat with the assistant in the terminal
    Chat,

    /// Serve the web chat front end
    Serve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AdminAction {
    Deploy,
    Status,
    Delete,
}

#[derive(Debug, Args)]
pub struct AdminArgs {
    /// Action to perform
    #[arg(long, value_enum, default_value_t = AdminAction::Deploy)]
    pub action: AdminAction,

    /// Skip the delete confirmation prompt
    #[arg(long)]
    pub yes: bool,

    /// Knowledge base configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Load `.env` and configuration, then install logging
fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    logging::init_logging(&config.logging);

    if let Some(e) = load_error {
        warn!(error = %e, "Invalid application configuration, using defaults");
    }

    config
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_defaults_to_deploy() {
        let cli = Cli::parse_from(["campus-assistant", "admin"]);
        match cli.command {
            Command::Admin(args) => {
                assert_eq!(args.action, AdminAction::Deploy);
                assert!(!args.yes);
                assert!(args.config.is_none());
            }
            _ => panic!("expected admin command"),
        }
    }

    #[test]
    fn test_admin_delete_with_options() {
        let cli = Cli::parse_from([
            "campus-assistant",
            "admin",
            "--action",
            "delete",
            "--yes",
            "--config",
            "other.yaml",
        ]);
        match cli.command {
            Command::Admin(args) => {
                assert_eq!(args.action, AdminAction::Delete);
                assert!(args.yes);
                assert_eq!(args.config, Some(PathBuf::from("other.yaml")));
            }
            _ => panic!("expected admin command"),
        }
    }

    #[test]
    fn test_rejects_unknown_action() {
        assert!(Cli::try_parse_from(["campus-assistant", "admin", "--action", "purge"]).is_err());
    }
}
