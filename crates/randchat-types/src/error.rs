use thiserror::Error;

/// Errors related to user record operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,

    #[error("invalid sex: '{0}'")]
    InvalidSex(String),

    #[error("languages list cannot be empty")]
    EmptyLanguages,

    #[error("too many languages: {count} (max {max})")]
    TooManyLanguages { count: usize, max: usize },

    #[error("invalid invitation: '{0}'")]
    InvalidInvitation(String),

    #[error("users cannot invite themselves")]
    SelfReferral,

    #[error("user is unreachable: {0}")]
    Unreachable(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl UserError {
    /// Whether the error comes from bad user input rather than a failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            UserError::InvalidSex(_)
                | UserError::EmptyLanguages
                | UserError::TooManyLanguages { .. }
                | UserError::InvalidInvitation(_)
                | UserError::SelfReferral
        )
    }
}

impl From<RepositoryError> for UserError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => UserError::NotFound,
            other => UserError::StorageError(other.to_string()),
        }
    }
}

impl From<DeliveryError> for UserError {
    fn from(err: DeliveryError) -> Self {
        UserError::Unreachable(err.to_string())
    }
}

/// Errors reported by a chat transport when delivering to one user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient blocked the bot, deactivated, or is not connected.
    #[error("recipient unreachable: {0}")]
    Unreachable(String),

    #[error("unsupported content: {0}")]
    Unsupported(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors from the partner search.
#[derive(Debug, Error)]
pub enum PairingError {
    #[error("no suitable partner is waiting")]
    NoCandidateFound,

    #[error("seeker is unreachable: {0}")]
    SeekerUnreachable(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<UserError> for PairingError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Unreachable(reason) => PairingError::SeekerUnreachable(reason),
            other => PairingError::StorageError(other.to_string()),
        }
    }
}

impl From<RepositoryError> for PairingError {
    fn from(err: RepositoryError) -> Self {
        PairingError::StorageError(err.to_string())
    }
}

/// Errors when forwarding a message to the current partner.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("user has no partner")]
    MissingPartner,

    #[error("partner {0} is unreachable")]
    PartnerUnreachable(crate::user::UserId),

    #[error("unsupported content: {0}")]
    Unsupported(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors from repository operations (used by trait definitions in randchat-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}
