use thiserror::Error;

impl From<sqlx::Error> for ReviewError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(format!("Database error: {}", err))
    }
}

impl From<config::ConfigError> for ReviewError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// Every failure the service can report. Callers branch on the variant,
/// the message is only for humans.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("team already exists")]
    TeamExists,

    #[error("PR id already exists")]
    PrExists,

    #[error("resource not found")]
    NotFound,

    #[error("author not found")]
    AuthorNotFound,

    #[error("team not found")]
    TeamNotFound,

    #[error("cannot reassign on merged PR")]
    PrMerged,

    #[error("reviewer is not assigned to this PR")]
    NotAssigned,

    #[error("no active replacement candidate in team")]
    NoCandidate,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReviewError {
    /// Stable code exposed to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TeamExists => "TEAM_EXISTS",
            Self::PrExists => "PR_EXISTS",
            Self::NotFound => "NOT_FOUND",
            Self::AuthorNotFound => "AUTHOR_NOT_FOUND",
            Self::TeamNotFound => "TEAM_NOT_FOUND",
            Self::PrMerged => "PR_MERGED",
            Self::NotAssigned => "NOT_ASSIGNED",
            Self::NoCandidate => "NO_CANDIDATE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Timeout => "TIMEOUT",
            Self::ConfigError(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures caused by the caller rather than by infrastructure.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Timeout | Self::ConfigError(_) | Self::Internal(_)
        )
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
