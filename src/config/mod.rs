// Configuration management module
// TOML settings for the embedder, chunker and search bounds

pub mod settings;

pub use settings::{
    Config, ConfigError, DEFAULT_EMBEDDING_DIMENSION, EmbeddingConfig, EmbeddingProvider,
    SearchConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_config_dir()
}
