//! Valebot Engine Library
//!
//! Chat assistant for a Valetudo robot vacuum: backend orchestration with
//! fallback, Polish/English command classification, follow-me tracking and
//! the HTTP/WebSocket surface. Used by the `valebot` binary and integration
//! tests.

/// Configuration management module
pub mod config;

/// API key storage and scrubbing
pub mod secrets;

/// Chat backends and the model orchestrator
pub mod llm;

/// Keyword command interpreter
pub mod interpreter;

/// Robot control capability and Valetudo client
pub mod robot;

/// Follow-me tracker
pub mod tracker;

/// Per-session assistant context
pub mod assistant;

/// REST and WebSocket API
pub mod api;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
