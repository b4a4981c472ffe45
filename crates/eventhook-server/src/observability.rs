//! Tracing setup. The level filter sits behind a reload layer so the
//! configured `logging.level` can replace the startup default once the
//! config has been loaded.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

const STARTUP_LEVEL: &str = "info";

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install the global subscriber. `RUST_LOG` wins over the startup level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STARTUP_LEVEL));
    let (filter_layer, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .try_init();
}

/// Switch to the configured level. No-op when `RUST_LOG` is set or tracing
/// was never initialized.
pub fn apply_logging_level(level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    if let Some(handle) = FILTER_HANDLE.get() {
        if let Err(e) = handle.modify(|filter| *filter = EnvFilter::new(level)) {
            tracing::warn!(error = %e, level, "Failed to apply logging level");
        }
    }
}
