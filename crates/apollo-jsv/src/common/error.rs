use thiserror::Error;

use crate::common::error::ApolloError::GenericError;

#[derive(Debug, Error)]
pub enum ApolloError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Invalid policy: {0}")]
    ConfigError(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<serde_json::error::Error> for ApolloError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::DeserializationError(e.to_string())
    }
}

impl From<toml::de::Error> for ApolloError {
    fn from(error: toml::de::Error) -> Self {
        Self::DeserializationError(error.to_string())
    }
}

impl From<toml::ser::Error> for ApolloError {
    fn from(error: toml::ser::Error) -> Self {
        Self::SerializationError(error.to_string())
    }
}

impl From<regex::Error> for ApolloError {
    fn from(error: regex::Error) -> Self {
        Self::ConfigError(error.to_string())
    }
}

pub fn error<T>(message: String) -> crate::Result<T> {
    Err(GenericError(message))
}
