pub mod enrichment;
pub mod llm_provider;
pub mod progress;
pub mod selector;
pub mod vocabulary;
pub mod word_graph;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no words available for review")]
    NoWordsAvailable,
    #[error("at least {required} words are needed, found {available}")]
    InsufficientWords { required: usize, available: usize },
    #[error("word not found or permission denied")]
    PermissionDenied,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("enrichment failed: {0}")]
    Enrichment(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
