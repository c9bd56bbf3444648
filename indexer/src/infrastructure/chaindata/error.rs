use std::error::Error;
use std::fmt;

/// Error type for chain-data providers
#[derive(Debug, Clone)]
pub enum ChainDataError {
    /// Network failure talking to a remote provider
    NetworkError(String),
    /// Malformed provider response
    ParseError(String),
    /// The requested block or output does not exist
    NotFound(String),
    /// Mirror database failure
    DatabaseError(String),
    /// Invalid provider configuration
    ConfigError(String),
}

impl fmt::Display for ChainDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainDataError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ChainDataError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ChainDataError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ChainDataError::DatabaseError(msg) => write!(f, "Mirror database error: {}", msg),
            ChainDataError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for ChainDataError {}
