//! Observability utilities.
//!
//! Logging goes through `tracing`; [`init_tracing`] installs a subscriber
//! for applications that do not bring their own.

mod timer;

pub use timer::StageTimer;

use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable console output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Installs a global subscriber filtered by `RUST_LOG`.
///
/// Defaults to `compileflow=info` when `RUST_LOG` is unset. Safe to call
/// more than once; only the first call has an effect, and an already
/// installed subscriber is left alone.
pub fn init_tracing(format: LogFormat) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("compileflow=info"));

        let result = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(true))
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true))
                .try_init(),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "Tracing subscriber already installed");
        }
    });
}
