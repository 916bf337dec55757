use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("validation_error - {0}")]
    Validation(String),
    #[error("store_error - {0}")]
    Store(String),
    #[error("not_found - {0}")]
    NotFound(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
    #[error("transport_error - {0}")]
    Transport(String),
}

impl AppError {
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::Validation(message.into())
    }

    pub fn store<M: Into<String>>(message: M) -> Self {
        Self::Store(message.into())
    }

    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn transport<M: Into<String>>(message: M) -> Self {
        Self::Transport(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Store(_) => "store_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
            Self::Transport(_) => "transport_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::Store(message)
            | Self::NotFound(message)
            | Self::InvalidData(message)
            | Self::Io(message)
            | Self::Transport(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn display_joins_code_and_message() {
        let err = AppError::store("disk full");
        assert_eq!(err.to_string(), "store_error - disk full");
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::validation("x").code(), "validation_error");
        assert_eq!(AppError::not_found("x").code(), "not_found");
        assert_eq!(AppError::invalid_data("x").code(), "invalid_data");
        assert_eq!(AppError::io("x").code(), "io_error");
        assert_eq!(AppError::transport("x").code(), "transport_error");
    }
}
