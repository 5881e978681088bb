pub mod config;

pub use config::{ConfigError, ConfigOverrides, CoordinatorConfig, ObservabilitySection};
