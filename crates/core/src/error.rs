use thiserror::Error;

pub type OutreachResult<T> = Result<T, OutreachError>;

#[derive(Error, Debug)]
pub enum OutreachError {
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("SMS transport error: {0}")]
    Transport(String),

    #[error("SMS transport timed out after {0} ms")]
    Timeout(u64),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("Compliance record not found: {0}")]
    RecordNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
