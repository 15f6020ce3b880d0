use std::process::ExitCode;

use campus_assistant::cli::{self, Cli, Command};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Admin(args) => {
            if cli::admin::run(args).await? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Chat => cli::chat::run().await.map(|()| ExitCode::SUCCESS),
        Command::Serve => cli::serve::run().await.map(|()| ExitCode::SUCCESS),
    }
}
