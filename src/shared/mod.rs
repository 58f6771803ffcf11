pub mod config;
pub mod error;

pub use config::{EngineConfig, LimitsConfig, StoreConfig};
pub use error::{AppError, Result};
