use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZodiacError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("an account with email {0} already exists")]
    DuplicateEmail(String),

    #[error("username {0} is already taken")]
    UsernameTaken(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("incorrect password")]
    InvalidCredential,

    #[error("today's deed is already completed")]
    AlreadyCompleted,

    #[error("validation failed: {0}")]
    ValidationFailure(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ZodiacError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ZodiacError::InvalidInput(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ZodiacError::ValidationFailure(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ZodiacError>;
