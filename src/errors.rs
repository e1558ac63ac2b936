use thiserror::Error;

/// Failures surfaced to clients. Internal plumbing stays on `anyhow` and is
/// wrapped into `Embedding` / `Storage` at the service boundary.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Student with ID '{0}' not found")]
    NotFound(String),

    #[error("Profile with ID '{0}' already exists")]
    AlreadyExists(String),

    #[error("Not enough profiles to generate matches: have {have}, need at least {need}")]
    InsufficientProfiles { have: usize, need: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to generate embeddings: {0:#}")]
    Embedding(anyhow::Error),

    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl MatchError {
    /// Stable machine-readable code reported next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::NotFound(_) => "not_found",
            MatchError::AlreadyExists(_) => "already_exists",
            MatchError::InsufficientProfiles { .. } => "insufficient_profiles",
            MatchError::InvalidInput(_) => "invalid_input",
            MatchError::Embedding(_) => "embedding_failed",
            MatchError::Storage(_) => "storage_failed",
        }
    }
}
