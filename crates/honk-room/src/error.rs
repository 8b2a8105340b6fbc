//! Error types for the room layer.

use honk_protocol::{AccountId, ErrorCode};

/// Errors that can occur during room operations.
///
/// All of these are local to the caller; none of them affects other
/// participants of the room.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The name is too short or already held by someone in the room.
    #[error("invalid name {0:?}")]
    InvalidName(String),

    /// No subscriber with this account id.
    #[error("unknown account {0}")]
    UnknownAccount(AccountId),

    /// The connection already has a session in the room.
    #[error("account {0} already entered")]
    AlreadyEntered(AccountId),

    /// The room's actor has stopped or its command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(String),
}

impl RoomError {
    /// The wire error code for this error, if the client should see one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::InvalidName(_) => Some(ErrorCode::InvalidName),
            Self::UnknownAccount(_) => Some(ErrorCode::UnknownAccount),
            Self::AlreadyEntered(_) => Some(ErrorCode::AlreadyEntered),
            Self::Unavailable(_) => None,
        }
    }
}

/// Failures of the leaderboard collaborator. Logged, never surfaced to
/// the participant who played the sound.
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    /// The collaborator could not be reached.
    #[error("leaderboard unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered with a non-success status.
    #[error("leaderboard rejected the update with status {0}")]
    Rejected(u16),
}
