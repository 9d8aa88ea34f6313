// Core modules
pub mod api;
pub mod dashboard;
pub mod history;
pub mod indicators;
pub mod markets;
pub mod models;
pub mod scoring;
pub mod settings;

// Re-export commonly used types
pub use api::*;
pub use models::*;
pub use settings::Settings;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Install the fmt subscriber used by every binary.
///
/// `RUST_LOG` wins over the built-in default filter.
pub fn setup_logging(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
