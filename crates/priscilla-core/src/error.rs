use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriscillaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engagement rejected: {0}")]
    EngageRejected(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PriscillaError {
    /// Short, stable error code used in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            PriscillaError::Config(_) => "CONFIG_ERROR",
            PriscillaError::EngageRejected(_) => "ENGAGE_REJECTED",
            PriscillaError::Protocol(_) => "PROTOCOL_ERROR",
            PriscillaError::Serialization(_) => "SERIALIZATION_ERROR",
            PriscillaError::Io(_) => "IO_ERROR",
            PriscillaError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, PriscillaError>;
