//! Tracing setup shared by binaries and long-running test harnesses.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with the CHAT_LOG environment variable.
///
/// Defaults to "info" level if CHAT_LOG is not set. Call once at process
/// start; a second call panics inside the subscriber registry.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("CHAT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
