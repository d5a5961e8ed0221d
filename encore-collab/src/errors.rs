use encore_core::{EntryId, QueueError, Scope};
use thiserror::Error;

use crate::AccessToken;

pub type CollabResult<T> = Result<T, CollabError>;

/// Every way a call into the collab system can be refused.
///
/// Nothing is changed when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollabError {
    /// The token was never issued
    #[error("Access token {0} is not registered")]
    UnknownToken(AccessToken),
    /// A remote token tried to manage the local password
    #[error("A remote access token cannot manage the {0} password")]
    ScopeMismatch(Scope),
    #[error("Password must not be empty")]
    EmptyPassword,
    #[error("Password is incorrect")]
    WrongPassword,
    #[error("No {0} password has been set")]
    NoPasswordSet(Scope),
    /// Only admins may change the password that governs them
    #[error("Admin permission is required to change the password")]
    InsufficientPermission,
    #[error("Access denied")]
    AccessDenied,
    #[error("The guest system is disabled")]
    VotingDisabled,
    #[error("No votes left")]
    QuotaExhausted,
    #[error("Already voted for entry {0}")]
    DuplicateVote(EntryId),
    #[error("Entry {0} was not added on behalf of a guest")]
    NotShadowVoted(EntryId),
    #[error("Index {index} is out of range for a queue of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Entry {0} is not in the queue")]
    UnknownEntry(EntryId),
    /// The entry is playing or has already been played
    #[error("Entry {0} can no longer be voted for")]
    NotVotable(EntryId),
    #[error("Could not hash password: {0}")]
    Hash(String),
}

impl From<QueueError> for CollabError {
    fn from(value: QueueError) -> Self {
        match value {
            QueueError::IndexOutOfRange { index, len } => Self::IndexOutOfRange { index, len },
            QueueError::UnknownEntry(id) => Self::UnknownEntry(id),
            QueueError::NotVotable(id) => Self::NotVotable(id),
        }
    }
}
