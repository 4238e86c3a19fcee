mod auth;
mod cli;
mod config;
mod download;
mod error;
mod gitlab;
mod runner;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    info!("Starting gitlab-pipeline-trigger");
    cli.execute().await
}
