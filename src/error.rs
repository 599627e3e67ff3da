use thiserror::Error;

/// Failures reported by the auth API on sign-in and sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("email not confirmed")]
    EmailNotConfirmed,

    #[error("auth error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("not found: {0}")]
    NotFound(String),

    /// A server-side check such as `subjects_limit` or `topics_limit` rejected the write.
    #[error("constraint violation ({constraint}): {message}")]
    ConstraintViolation { constraint: String, message: String },

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Name of the violated constraint, if this is a constraint violation.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            AppError::ConstraintViolation { constraint, .. } => Some(constraint),
            _ => None,
        }
    }

    /// Message shown in a view banner when no more specific text applies.
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            AppError::Remote { message, .. } | AppError::ConstraintViolation { message, .. }
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            AppError::Validation(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
