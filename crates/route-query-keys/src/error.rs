use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to serialize key arguments: {0}")]
    Serialize(#[from] serde_json::Error),
}
