//! Command handlers for CLI operations
//!
//! - serve: run the HTTP/WebSocket API until ctrl-c
//! - chat: one message, or an interactive session
//! - parse: classify text without touching the robot
//! - status / models: quick looks at the robot and the chat backends
//! - doctor: validate configuration and check reachability
//! - secret: manage API keys in the keychain

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::assistant::{Assistant, ChatReply, CommandOutcome};
use crate::cli::SecretAction;
use crate::config::Config;
use crate::interpreter::{detect_language, response_template, status_response, Command};
use crate::llm::orchestrator::ModelOrchestrator;
use crate::llm::BackendId;
use crate::robot::{RobotControl, ValetudoClient};
use crate::secrets::{SecretCache, SecretManager, KEYRING_SERVICE};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Run the API server until ctrl-c
pub async fn handle_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(host) = host {
        config.api.host = host;
    }
    if let Some(port) = port {
        config.api.port = port;
    }

    let secrets = SecretCache::system();
    let assistant = Arc::new(Assistant::from_config(&config, &secrets).await?);

    let (active, available) = assistant.models().await;
    tracing::info!(
        "Active model: {} (available: {})",
        active,
        join_ids(available.iter())
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    let tracker = assistant.tracker().clone();
    crate::api::serve(assistant, &config.api, shutdown).await?;
    tracker.stop_following();

    Ok(())
}

fn join_ids<'a>(ids: impl Iterator<Item = &'a BackendId>) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

fn print_reply(reply: &ChatReply, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", reply.response);

            match &reply.outcome {
                Some(Ok(CommandOutcome::Status(status))) => {
                    println!("  [status] {} ({}%)", status.state, status.battery);
                }
                Some(Ok(CommandOutcome::Executed)) => {
                    if let Some(intent) = reply.intent() {
                        println!("  [executed] {}", intent);
                    }
                }
                Some(Ok(CommandOutcome::Skipped(reason))) => {
                    println!("  [skipped] {}", reason);
                }
                Some(Err(e)) => println!("  [failed] {}", e),
                None => {}
            }
        }
        OutputFormat::Json => {
            let output = reply.clone().into_response();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Send one message and print the reply
pub async fn handle_chat(
    message: String,
    include_context: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let assistant = Assistant::from_config(config, &SecretCache::system()).await?;

    let reply = assistant
        .handle_chat(&message, include_context)
        .await
        .context("Chat failed")?;

    print_reply(&reply, format)
}

/// Read lines from stdin until EOF or `exit`.
///
/// `/clear` empties the history, `/model <name>` switches backend.
pub async fn handle_interactive_chat(
    include_context: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let assistant = Assistant::from_config(config, &SecretCache::system()).await?;
    let (active, _) = assistant.models().await;

    if let OutputFormat::Text = format {
        println!("Valebot chat ({}). Type 'exit' to quit.", active);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/clear" => {
                assistant.clear_history().await;
                println!("History cleared");
                continue;
            }
            _ => {}
        }

        if let Some(name) = line.strip_prefix("/model ") {
            match assistant.switch_model(name).await {
                Ok(id) => println!("Switched to {}", id),
                Err(e) => println!("{}", e),
            }
            continue;
        }

        match assistant.handle_chat(line, include_context).await {
            Ok(reply) => print_reply(&reply, format)?,
            Err(e) => {
                tracing::error!("Chat failed: {}", e);
                println!("Error: {}", e);
            }
        }
    }

    Ok(())
}

fn parsed_json(text: &str, command: Option<&Command>) -> serde_json::Value {
    let language = detect_language(text);
    match command {
        Some(command) => json!({
            "language": language.code(),
            "action": command.action,
            "params": command.params,
            "confidence": command.confidence,
            "acknowledgement": response_template(command, language),
        }),
        None => json!({
            "language": language.code(),
            "action": null,
        }),
    }
}

/// Classify text and print the result
pub fn handle_parse(text: &str, format: OutputFormat) -> Result<()> {
    let command = crate::interpreter::parse_command(text);

    match format {
        OutputFormat::Text => match &command {
            Some(command) => {
                let language = detect_language(text);
                println!("Language:   {}", language);
                println!("Action:     {}", command.action);
                println!("Confidence: {}", command.confidence);
                if !command.params.is_empty() {
                    println!(
                        "Params:     {}",
                        serde_json::Value::Object(command.params.clone())
                    );
                }
                if let Some(ack) = response_template(command, language) {
                    println!("Reply:      {}", ack);
                }
            }
            None => println!("Not a robot command"),
        },
        OutputFormat::Json => {
            let output = parsed_json(text, command.as_ref());
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Print robot state and battery
pub async fn handle_status(config: &Config, format: OutputFormat) -> Result<()> {
    let robot = ValetudoClient::new(&config.valetudo)?;
    let status = robot
        .status()
        .await
        .with_context(|| format!("Cannot reach Valetudo at {}", robot.base_url()))?;

    match format {
        OutputFormat::Text => {
            println!(
                "{}",
                status_response(config.ai.language, &status.state, status.battery)
            );
            if let Some(error) = &status.error {
                println!("Error: {}", error);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
    }

    Ok(())
}

/// Print the active backend and each available backend's health
pub async fn handle_models(config: &Config, format: OutputFormat) -> Result<()> {
    let orchestrator = ModelOrchestrator::initialize(&config.ai, &SecretCache::system()).await;
    let report = orchestrator.health_report().await;

    match format {
        OutputFormat::Text => {
            println!("Active model: {}", orchestrator.active());
            println!("Backends:");
            for id in BackendId::ALL {
                let state = match report.iter().find(|(b, _)| *b == id) {
                    Some((_, true)) => "available",
                    Some((_, false)) => "unhealthy",
                    None => "not configured",
                };
                println!("  {:<10} {}", id, state);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "current": orchestrator.active(),
                "available": report
                    .iter()
                    .map(|(id, healthy)| json!({ "model": id, "healthy": healthy }))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Validate configuration and check the robot and every backend
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration".to_string(), "Valid".to_string()));

    if let Some(dir) = &config.api.static_dir {
        checks.push(("Web UI".to_string(), dir.display().to_string()));
    }

    let robot = ValetudoClient::new(&config.valetudo)?;
    match robot.status().await {
        Ok(status) => checks.push((
            "Valetudo".to_string(),
            format!("Connected ({}, {}%)", status.state, status.battery),
        )),
        Err(e) => {
            checks.push(("Valetudo".to_string(), "Unreachable".to_string()));
            issues.push(format!(
                "Cannot reach Valetudo at {}: {}",
                robot.base_url(),
                e
            ));
        }
    }

    let secrets = SecretCache::system();
    for id in [BackendId::OpenAI, BackendId::Anthropic, BackendId::Google] {
        let Some(provider) = config.ai.online.provider(id) else {
            continue;
        };
        let label = format!("{} API key", id);
        if !provider.enabled {
            checks.push((label, "Disabled".to_string()));
        } else if secrets.resolve(id, provider.api_key.as_deref()).is_some() {
            checks.push((label, "Configured".to_string()));
        } else {
            checks.push((label, "Not configured".to_string()));
            issues.push(format!(
                "{} is enabled but has no API key. Set {} or run 'valebot secret set {}'.",
                id,
                id.env_var().unwrap_or_default(),
                id
            ));
        }
    }

    let orchestrator = ModelOrchestrator::initialize(&config.ai, &secrets).await;
    let report = orchestrator.health_report().await;
    for (id, healthy) in &report {
        checks.push((
            format!("Backend {}", id),
            if *healthy { "Healthy" } else { "Unhealthy" }.to_string(),
        ));
    }
    if !report.iter().any(|(_, healthy)| *healthy) {
        issues.push(
            "No chat backend available. Start the local server or configure an online provider."
                .to_string(),
        );
    }
    checks.push(("Active model".to_string(), orchestrator.active().to_string()));

    match format {
        OutputFormat::Text => {
            println!("Valebot Diagnostics");
            println!("===================");
            println!();

            println!("Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({ "name": name, "status": status })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty(),
                "build": {
                    "version": env!("CARGO_PKG_VERSION"),
                    "commit": env!("GIT_COMMIT_HASH"),
                    "timestamp": env!("BUILD_TIMESTAMP"),
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn online_backend(name: &str) -> Result<BackendId> {
    let id: BackendId = name.parse()?;
    if id == BackendId::Local {
        bail!("The local backend does not use an API key");
    }
    Ok(id)
}

/// Manage API keys in the keychain
pub async fn handle_secret(action: SecretAction, format: OutputFormat) -> Result<()> {
    let manager = SecretManager::new(KEYRING_SERVICE);

    match action {
        SecretAction::Set { backend } => {
            let id = online_backend(&backend)?;
            if let OutputFormat::Text = format {
                println!("Paste the {} API key and press enter:", id);
            }

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let value = lines.next_line().await?.unwrap_or_default();
            let value = value.trim();
            if value.is_empty() {
                bail!("No key given");
            }

            manager.set_secret(&SecretCache::key_name(id), value)?;
            print_secret_result(format, id, "stored")
        }
        SecretAction::Delete { backend } => {
            let id = online_backend(&backend)?;
            manager.delete_secret(&SecretCache::key_name(id))?;
            print_secret_result(format, id, "deleted")
        }
        SecretAction::List => {
            let entries: Vec<(BackendId, bool)> = [
                BackendId::OpenAI,
                BackendId::Anthropic,
                BackendId::Google,
            ]
            .into_iter()
            .map(|id| (id, manager.has_secret(&SecretCache::key_name(id))))
            .collect();

            match format {
                OutputFormat::Text => {
                    for (id, stored) in &entries {
                        println!(
                            "  {:<10} {}",
                            id,
                            if *stored { "stored" } else { "not stored" }
                        );
                    }
                }
                OutputFormat::Json => {
                    let output: serde_json::Map<String, serde_json::Value> = entries
                        .iter()
                        .map(|(id, stored)| (id.to_string(), json!(stored)))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            Ok(())
        }
    }
}

fn print_secret_result(format: OutputFormat, id: BackendId, what: &str) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{} API key {}", id, what),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "backend": id, "result": what }))?
        ),
    }
    Ok(())
}
