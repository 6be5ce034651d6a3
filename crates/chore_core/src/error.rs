use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    /// Stored recurrence data the engine cannot interpret.
    #[error("recurrence_error - {0}")]
    Recurrence(String),
    #[error("io_error - {0}")]
    Io(String),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn recurrence<M: Into<String>>(message: M) -> Self {
        Self::Recurrence(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Recurrence(_) => "recurrence_error",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(message)
            | Self::InvalidData(message)
            | Self::Recurrence(message)
            | Self::Io(message) => message,
        }
    }

    /// Malformed stored data, as opposed to a rejected request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Recurrence(_) | Self::InvalidData(_))
    }
}
