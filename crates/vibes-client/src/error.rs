use thiserror::Error;

/// Errors surfaced to the presentation layer.
///
/// Validation and conflict errors are raised before any network call.
/// Collaborator failures arrive as [`ClientError::Remote`] with the
/// collaborator's message passed through.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Bad or missing local input.
    #[error("{0}")]
    Validation(String),

    /// A friend request already exists between the two users.
    #[error("{0}")]
    Conflict(String),

    /// The referenced record is missing or not addressed to the actor.
    #[error("{0}")]
    NotFound(String),

    /// No authenticated actor.
    #[error("You need to be signed in to do that")]
    Auth,

    /// Backend, storage or payment collaborator failure.
    #[error("{0}")]
    Remote(String),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Message suitable for an error banner.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<anyhow::Error> for ClientError {
    fn from(e: anyhow::Error) -> Self {
        Self::Remote(format!("{:#}", e))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
