pub mod api;
pub mod auth;
pub mod config;
mod error;
pub mod preferences;
pub mod presets;
pub mod recommendations;
pub mod refresh;
pub mod session;
pub mod timeframe;

pub use config::ClientConfig;
pub use error::SwellMateError;
pub use refresh::CacheEvent;
pub use session::SessionClient;

/// Initialize tracing for an embedding app. Respects `RUST_LOG`,
/// defaulting to `info`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
