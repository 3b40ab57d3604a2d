use thiserror::Error;

#[derive(Debug, Error)]
pub enum NrveError {
    #[error("{0}")]
    Validation(String),

    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("upstream model error: {0}")]
    Upstream(String),
}

pub type NrveResult<T> = Result<T, NrveError>;
