use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error slugs. Callers key off these, never off
/// the human-readable message.
pub mod slugs {
    pub const INVALID_CREDENTIALS: &str = "invalid-credentials";
    pub const INVALID_TOKEN: &str = "invalid-token";
    pub const COULD_NOT_AUTHORIZE_USER: &str = "could-not-authorize-user";
    pub const CREATE_USER_ERROR: &str = "create-user-error";
    pub const USER_SAVING_ERROR: &str = "user-saving-error";
    pub const USER_NOT_FOUND: &str = "user-not-found";
    pub const INVALID_INPUT: &str = "invalid-input";
    pub const INTERNAL_SERVER_ERROR: &str = "internal-server-error";
    pub const REQUEST_TIMEOUT: &str = "request-timeout";

    pub const FIELD_EMAIL_REQUIRED: &str = "field-email-required";
    pub const FIELD_EMAIL_INVALID: &str = "field-email-invalid";
    pub const FIELD_PASSWORD_REQUIRED: &str = "field-password-required";
    pub const FIELD_PASSWORD_INVALID_LENGTH: &str = "field-password-invalid-length";
    pub const FIELD_NAME_REQUIRED: &str = "field-name-required";
    pub const FIELD_NAME_INVALID_LENGTH: &str = "field-name-invalid-length";
    pub const FIELD_CURRENCY_REQUIRED: &str = "field-currency-required";
    pub const FIELD_CURRENCY_INVALID: &str = "field-currency-invalid";
    pub const FIELD_FIRST_DAY_OF_WEEK_INVALID: &str = "field-first-day-of-week-invalid";
}

/// Error category. The engine does not prescribe transport semantics; the
/// HTTP layer maps each category onto its own status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Unknown,
    Authorization,
    IncorrectInput,
    NotFound,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Unknown => write!(f, "unknown"),
            ErrorKind::Authorization => write!(f, "authorization"),
            ErrorKind::IncorrectInput => write!(f, "incorrect-input"),
            ErrorKind::NotFound => write!(f, "not-found"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Unknown { slug: &'static str, message: String },

    #[error("{message}")]
    Authorization { slug: &'static str, message: String },

    #[error("{message}")]
    IncorrectInput { slug: &'static str, message: String },

    #[error("{message}")]
    NotFound { slug: &'static str, message: String },

    /// Store failure other than "no rows"; passed through unchanged.
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn unknown(message: impl Into<String>, slug: &'static str) -> Self {
        AppError::Unknown { slug, message: message.into() }
    }

    pub fn authorization(message: impl Into<String>, slug: &'static str) -> Self {
        AppError::Authorization { slug, message: message.into() }
    }

    pub fn incorrect_input(message: impl Into<String>, slug: &'static str) -> Self {
        AppError::IncorrectInput { slug, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>, slug: &'static str) -> Self {
        AppError::NotFound { slug, message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Unknown { .. } | AppError::Store(_) => ErrorKind::Unknown,
            AppError::Authorization { .. } => ErrorKind::Authorization,
            AppError::IncorrectInput { .. } => ErrorKind::IncorrectInput,
            AppError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            AppError::Unknown { slug, .. }
            | AppError::Authorization { slug, .. }
            | AppError::IncorrectInput { slug, .. }
            | AppError::NotFound { slug, .. } => slug,
            AppError::Store(_) => slugs::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
