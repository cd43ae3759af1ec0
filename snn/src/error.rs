use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnnError {
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("neuron index {index} is outside the population of {population}")]
    NeuronOutOfRange { index: usize, population: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl SnnError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SnnError>;
