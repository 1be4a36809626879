//! Configuration Module
//!
//! Engine configuration loaded from environment variables (after `.env`).

mod settings;

pub use settings::{AnalyticsSettings, ConfigError, EngineConfig, FeedSettings, StorageSettings};
