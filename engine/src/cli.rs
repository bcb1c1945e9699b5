//! CLI interface for Valebot
//!
//! Command-line interface built with clap's derive API. Every subcommand
//! shares the global `--json`, `--log` and `--config` flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Valebot voice and chat assistant for a Valetudo robot vacuum
///
/// Talks to a local or online chat model, turns Polish and English requests
/// into robot commands, and can follow you around the flat.
#[derive(Parser, Debug)]
#[command(name = "valebot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP and WebSocket API
    Serve {
        /// Override the bind host from config
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port from config
        #[arg(long)]
        port: Option<u16>,
    },

    /// Send one message to the assistant, or start an interactive session
    Chat {
        /// Message to send. Omit for an interactive session.
        message: Option<String>,

        /// Don't attach robot state and rooms to the prompt
        #[arg(long)]
        no_context: bool,
    },

    /// Classify text as a robot command without executing it
    Parse {
        /// Text to classify
        text: String,
    },

    /// Show robot state and battery
    Status,

    /// Show the active chat backend and the available ones
    Models,

    /// Check configuration, robot and backend reachability
    Doctor,

    /// Manage API keys in the system keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

/// Keychain actions
#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store an API key (read from stdin)
    Set {
        /// Backend name: openai, anthropic or google
        backend: String,
    },

    /// Remove a stored API key
    Delete {
        /// Backend name: openai, anthropic or google
        backend: String,
    },

    /// Show which backends have a key available
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_chat_with_global_flags() {
        let cli = Cli::parse_from(["valebot", "chat", "posprzątaj kuchnię", "--json"]);
        assert!(cli.json);
        match cli.command {
            Command::Chat {
                message,
                no_context,
            } => {
                assert_eq!(message.as_deref(), Some("posprzątaj kuchnię"));
                assert!(!no_context);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_interactive_chat() {
        let cli = Cli::parse_from(["valebot", "--log", "debug", "chat", "--no-context"]);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert!(matches!(
            cli.command,
            Command::Chat {
                message: None,
                no_context: true
            }
        ));
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["valebot", "serve", "--port", "9000"]);
        assert!(matches!(
            cli.command,
            Command::Serve {
                host: None,
                port: Some(9000)
            }
        ));
    }

    #[test]
    fn test_parse_secret_set() {
        let cli = Cli::parse_from(["valebot", "secret", "set", "openai"]);
        assert!(matches!(
            cli.command,
            Command::Secret {
                action: SecretAction::Set { ref backend }
            } if backend == "openai"
        ));
    }
}
