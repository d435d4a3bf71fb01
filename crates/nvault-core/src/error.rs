use thiserror::Error;

pub type NvaultResult<T> = Result<T, NvaultError>;

#[derive(Debug, Error)]
pub enum NvaultError {
    #[error("config error: {0}")]
    Config(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("blob not found: {0}")]
    BlobNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
