use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{message}")]
    RateLimited { message: String, retry_after: u64 },

    #[error("Security check failed")]
    BotCheckFailed,

    #[error("Code not found")]
    OtpNotFound,

    #[error("Code has expired")]
    OtpExpired,

    #[error("Wrong code")]
    OtpMismatch,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("User already exists with this {field}")]
    UserExists { field: &'static str },

    #[error("Email error: {0}")]
    Email(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::RateLimited {
                message,
                retry_after,
            } => AppError::TooManyRequests(message, Some(retry_after)),
            ServiceError::BotCheckFailed => {
                AppError::Forbidden(anyhow::anyhow!("Security check failed"))
            }
            ServiceError::OtpNotFound => AppError::NotFound(anyhow::anyhow!("Code not found")),
            ServiceError::OtpExpired => AppError::BadRequest(anyhow::anyhow!("Code has expired")),
            ServiceError::OtpMismatch => AppError::BadRequest(anyhow::anyhow!("Wrong code")),
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::UserExists { field } => {
                AppError::Conflict(anyhow::anyhow!("User already exists with this {}", field))
            }
            ServiceError::Email(e) => AppError::EmailError(e),
            ServiceError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
        }
    }
}
