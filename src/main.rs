mod args;
mod commands;

use clap::Parser;
use hdfs_file_manager::{ClientConfig, FileManager};
use log::{info, warn};
use std::{process::ExitCode, time::Duration};

use args::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = ClientConfig {
        user: args.user.clone(),
        timeout: Duration::from_secs(args.timeout),
    };

    let mut manager = match FileManager::connect(&args.uri, &config).await {
        Ok(manager) => manager,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Acting as {}",
        config.user.as_deref().unwrap_or("the default cluster user")
    );

    let outcome = commands::run(&manager, args.command).await;

    if let Err(err) = manager.close().await {
        warn!("Connection was not closed cleanly: {err}");
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
