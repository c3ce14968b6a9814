use thiserror::Error;

use crate::core::types::TilePoint;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Minor not found: {0}")]
    NotFound(String),

    #[error("Proxy already registered for minor: {0}")]
    AlreadyRegistered(String),

    #[error("Actor \"{name}\" expected in location \"{location}\" but absent")]
    InconsistentCollectionState { name: String, location: String },

    #[error("No route to destination {0}")]
    UnreachableDestination(TilePoint),

    #[error("External content unavailable for {0}")]
    ExternalContentUnavailable(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
