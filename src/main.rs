//! mcp-sse-bridge binary entry point.

use std::process::ExitCode;

use mcp_sse_bridge::{api, cli, config::Config, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'mcp-sse-bridge --help' for more information.");
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if logging::init_with_filter(config.log_filter()).is_err() {
        eprintln!("warning: logging already initialized");
    }

    info!("mcp-sse-bridge v{}", env!("CARGO_PKG_VERSION"));

    let server_config = match config.to_server_config() {
        Ok(server_config) => server_config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        stream_path = %server_config.dispatch.stream_path,
        message_path = %server_config.dispatch.message_path,
        "Routes configured"
    );

    match api::serve(server_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
