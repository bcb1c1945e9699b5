//! Telemetry
//!
//! Sets up `tracing-subscriber` for structured logging. The level comes from
//! `core.log_level` in config (or `--log`), and `RUST_LOG` overrides both.
//! Debug builds print human-readable output; release builds emit JSON lines.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter_for(log_level: &str) -> EnvFilter {
    let default_filter = format!("{},valebot_engine={}", log_level, log_level);

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Initialize the global subscriber at `log_level`.
///
/// Only the first call takes effect; later calls are ignored.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = filter_for(log_level);

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false))
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    }
}

/// Compact stderr logging for the interactive chat session, so log lines
/// don't interleave with the conversation on stdout.
pub fn init_interactive_telemetry(log_level: &str) {
    tracing_subscriber::registry()
        .with(filter_for(log_level))
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .ok();
}
