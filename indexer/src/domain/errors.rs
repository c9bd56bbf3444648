use std::error::Error;
use std::fmt;

use crate::infrastructure::chaindata::ChainDataError;
use crate::infrastructure::persistence::error::DbError;

/// Error type for event handling inside the pipeline
#[derive(Debug)]
pub enum PipelineError {
    ChainDataError(ChainDataError),
    DbError(DbError),
    ProcessingError(String),
    /// The event bus was closed while publishing
    ChannelClosed,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ChainDataError(e) => write!(f, "Chain data error: {}", e),
            PipelineError::DbError(e) => write!(f, "Database error: {}", e),
            PipelineError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            PipelineError::ChannelClosed => write!(f, "Event bus closed"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::ChainDataError(e) => Some(e),
            PipelineError::DbError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ChainDataError> for PipelineError {
    fn from(error: ChainDataError) -> Self {
        PipelineError::ChainDataError(error)
    }
}

impl From<DbError> for PipelineError {
    fn from(error: DbError) -> Self {
        PipelineError::DbError(error)
    }
}

/// Error type for the chain-sync session
#[derive(Debug)]
pub enum ChainSyncError {
    /// The upstream source failed beyond retry
    SourceError(String),
    ChainDataError(ChainDataError),
    ConfigError(String),
}

impl fmt::Display for ChainSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainSyncError::SourceError(msg) => write!(f, "Chain sync source error: {}", msg),
            ChainSyncError::ChainDataError(e) => write!(f, "Chain data error: {}", e),
            ChainSyncError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for ChainSyncError {}

impl From<ChainDataError> for ChainSyncError {
    fn from(error: ChainDataError) -> Self {
        ChainSyncError::ChainDataError(error)
    }
}
