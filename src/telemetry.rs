// src/telemetry.rs

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Held by `main` for the lifetime of the process.
#[must_use]
pub struct TelemetryGuard {
    _private: (),
}

impl TelemetryGuard {
    pub fn shutdown(self) {
        tracing::info!("telemetry shut down");
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: &str) -> anyhow::Result<TelemetryGuard> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .try_init()?;

    Ok(TelemetryGuard { _private: () })
}
