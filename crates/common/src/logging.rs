//! Logging and tracing initialization.

use crate::config::LoggingConfig;

/// Crates whose events follow the configured level.
const PURSUIT_TARGETS: [&str; 5] = [
    "pursuit",
    "pursuit_common",
    "pursuit_control",
    "pursuit_model",
    "pursuit_pipeline",
];

/// Filter used when `RUST_LOG` is unset.
///
/// A bare level such as `debug` applies to the pursuit crates only; everything
/// else stays at `warn`. A full directive (`tokio=trace,pursuit=info`) is
/// passed through untouched.
pub fn default_directive(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() || level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let mut directive = String::from("warn");
    for target in PURSUIT_TARGETS {
        directive.push(',');
        directive.push_str(target);
        directive.push('=');
        directive.push_str(level);
    }
    directive
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let installed = if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_current_span(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_names(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    if installed.is_ok() {
        tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    }
}
