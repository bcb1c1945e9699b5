// Valebot
// Main entry point for the valebot binary

use anyhow::Context;
use clap::Parser;
use sdk::errors::{EngineError, ValebotErrorExt};
use valebot_engine::cli::{Cli, Command};
use valebot_engine::config::Config;
use valebot_engine::handlers::{
    handle_chat, handle_doctor, handle_interactive_chat, handle_models, handle_parse,
    handle_secret, handle_serve, handle_status, OutputFormat,
};
use valebot_engine::telemetry::{init_interactive_telemetry, init_telemetry_with_level};

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => {
            let path = path
                .canonicalize()
                .map_err(|e| EngineError::PathCanonicalization(path.clone(), e.to_string()))?;
            Ok(Config::load_from_path(&path)?)
        }
        None => Ok(Config::load_or_create()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = &result {
        if let Some(engine_error) = e.chain().find_map(|c| c.downcast_ref::<EngineError>()) {
            eprintln!("Hint: {}", engine_error.user_hint());
        }
    }
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli).context("Failed to load configuration")?;

    // --log beats config; RUST_LOG beats both
    let log_level = cli.log.clone().unwrap_or_else(|| config.core.log_level.clone());

    let interactive = matches!(cli.command, Command::Chat { message: None, .. });
    if interactive {
        init_interactive_telemetry(&log_level);
    } else {
        init_telemetry_with_level(&log_level);
    }

    tracing::info!(
        "Valebot v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Serve { host, port } => {
            tracing::info!("Starting API server...");
            handle_serve(config, host, port).await
        }

        Command::Chat {
            message: Some(message),
            no_context,
        } => handle_chat(message, !no_context, &config, format).await,

        Command::Chat {
            message: None,
            no_context,
        } => handle_interactive_chat(!no_context, &config, format).await,

        Command::Parse { text } => handle_parse(&text, format),

        Command::Status => handle_status(&config, format).await,

        Command::Models => handle_models(&config, format).await,

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }

        Command::Secret { action } => handle_secret(action, format).await,
    }
}
