//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Calling this twice is harmless; the second call is a
/// no-op.
pub fn init(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if settings.json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
