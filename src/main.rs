//! nlip-agent - inter-agent messaging over HTTP.

use clap::Parser;
use std::process::ExitCode;

use nlip_agent::{logging, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    let _guard = match logging::init() {
        Ok((guard, _)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Parse command line arguments
    let args = Commands::parse();

    // Run the command
    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
