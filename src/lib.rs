pub mod application;
pub mod domain;
pub mod engine;
pub mod infrastructure;
pub mod shared;

pub use engine::MatchEngine;
pub use shared::{AppError, EngineConfig, Result};

/// Installs the global tracing subscriber. Call once at process startup;
/// `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petmets_engine=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
