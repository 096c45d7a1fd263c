use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    UnsupportedVariant(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::UnsupportedVariant(_) => "UNSUPPORTED_VARIANT",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Io(_) => "IO_FAILURE",
            Self::Config(_) => "CONFIG_INVALID",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Config(value.to_string())
    }
}

/// Context-wrapped failures keep their whole chain in the message. An I/O
/// root cause stays an `Io` error.
impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        let message = format!("{:#}", value);
        if value.root_cause().downcast_ref::<std::io::Error>().is_some() {
            Self::Io(message)
        } else {
            Self::Internal(message)
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
