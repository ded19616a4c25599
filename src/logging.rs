//! Logging bootstrap for binaries and tests embedding the container.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

const DEFAULT_LOG_LEVEL: &str = "info";

/// Installs a formatted `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`).
///
/// Safe to call more than once. An already installed global subscriber is
/// left in place.
pub fn init_tracing() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(filter),
        );

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized, keeping it");
        }
    });
}
