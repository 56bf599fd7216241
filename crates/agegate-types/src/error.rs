use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgegateError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Commitment mismatch: {0}")]
    CommitmentMismatch(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgegateResult<T> = Result<T, AgegateError>;
