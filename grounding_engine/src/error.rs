//! Crate-wide error type. Only construction-time failures are `Err` values —
//! a checker's internal failure is caught, logged, and degrades to zero
//! violations from that checker (see `grounder::Grounder::validate`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroundingError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    ConfigValue(String),
}

impl GroundingError {
    pub fn config_value(message: impl Into<String>) -> Self {
        Self::ConfigValue(message.into())
    }
}

pub type GroundingResult<T> = std::result::Result<T, GroundingError>;
