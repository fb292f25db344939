//! Structured logging setup.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingSettings};

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` directives take precedence; the configured level applies to
/// everything they do not mention. Returns `false` if a subscriber was
/// already installed, in which case nothing changes.
///
/// ```ignore
/// let settings = lexdesk::config::load(None)?;
/// lexdesk::telemetry::init(&settings.logging);
/// tracing::info!("dashboard started");
/// ```
pub fn init(settings: &LoggingSettings) -> bool {
    let filter = env_filter(settings);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match settings.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.is_ok()
}

fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(settings.level.into())
        .from_env_lossy()
}
