//! Boxshelf CLI - Main entry point

use boxshelf_cli::{Cli, Commands};
use boxshelf_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let base = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .output(LogOutput::Console)
        .filter_directives("aws_config=warn,aws_smithy_runtime=warn,hyper=warn")
        .log_file_prefix("boxshelf")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env_with(base.clone()).unwrap_or(base);

    // The CLI works without logging
    let _ = init_logging(&log_config);

    if let Err(e) = execute_command(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn execute_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Publish {
            box_file,
            builder,
            producer,
            target,
        } => boxshelf_cli::commands::publish::run(box_file, builder, producer, &target).await,

        Commands::NextVersion { target } => {
            boxshelf_cli::commands::next_version::run(&target).await
        },
    }
}
