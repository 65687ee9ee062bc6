use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    /// Human-readable reason without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(m) | Self::NotFound(m) | Self::Storage(m) | Self::Upstream(m) => m.clone(),
            Self::Model(models::errors::ModelError::Validation(m)) => m.clone(),
        }
    }

    /// Caller supplied something malformed (maps to 400).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Model(_))
    }
}
