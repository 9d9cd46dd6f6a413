// Configuration management module
// Loads config.toml from the config directory, falling back to defaults

pub mod settings;

pub use settings::{Config, ConfigError, OllamaConfig, ServerConfig, StoreConfig};
