//! Unified error type for the honk server.
//!
//! Every error maps to an HTTP status and a `{"error": CODE}` body via the
//! `IntoResponse` impl. Internal details are logged, not returned.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use honk_protocol::{ErrorCode, ProtocolError};
use honk_room::{LeaderboardError, RoomError};
use honk_transport::TransportError;
use serde::Serialize;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum HonkError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload could not be decoded or encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room rejected the request or is gone.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The leaderboard collaborator failed.
    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Listener or socket I/O.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Wire error codes plus the few HTTP-only ones.
#[derive(Serialize)]
#[serde(untagged)]
enum Code {
    Wire(ErrorCode),
    Http(&'static str),
}

#[derive(Serialize)]
struct ErrorBody {
    error: Code,
}

impl HonkError {
    fn status_and_code(&self) -> (StatusCode, Code) {
        match self {
            HonkError::Protocol(_) => {
                (StatusCode::BAD_REQUEST, Code::Wire(ErrorCode::MalformedEvent))
            }
            HonkError::Room(err) => match err {
                RoomError::InvalidName(_) => {
                    (StatusCode::BAD_REQUEST, Code::Wire(ErrorCode::InvalidName))
                }
                RoomError::UnknownAccount(_) => {
                    (StatusCode::NOT_FOUND, Code::Wire(ErrorCode::UnknownAccount))
                }
                RoomError::AlreadyEntered(_) => {
                    (StatusCode::CONFLICT, Code::Wire(ErrorCode::AlreadyEntered))
                }
                RoomError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Code::Http("UNAVAILABLE"),
                ),
            },
            HonkError::Leaderboard(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Code::Http("UNAVAILABLE"),
            ),
            HonkError::Transport(_)
            | HonkError::Config(_)
            | HonkError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Code::Http("INTERNAL_ERROR"),
            ),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.status_and_code().0.as_u16()
    }
}

impl IntoResponse for HonkError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, %status, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(ErrorBody { error: code })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use honk_protocol::AccountId;

    async fn body_of(err: HonkError) -> (u16, String) {
        let response = err.into_response();
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_from_room_error() {
        let err: HonkError = RoomError::InvalidName("ab".into()).into();
        assert!(matches!(err, HonkError::Room(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_from_transport_error() {
        let err: HonkError = TransportError::SendFailed("gone".into()).into();
        assert!(matches!(err, HonkError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[tokio::test]
    async fn test_invalid_name_response() {
        let (status, body) =
            body_of(RoomError::InvalidName("ab".into()).into()).await;
        assert_eq!(status, 400);
        assert_eq!(body, r#"{"error":"INVALID_NAME"}"#);
    }

    #[tokio::test]
    async fn test_unknown_account_response() {
        let (status, body) =
            body_of(RoomError::UnknownAccount(AccountId::new("x")).into())
                .await;
        assert_eq!(status, 404);
        assert_eq!(body, r#"{"error":"UNKNOWN_ACCOUNT"}"#);
    }

    #[tokio::test]
    async fn test_malformed_event_response() {
        let (status, body) = body_of(
            ProtocolError::InvalidMessage("not a sound".into()).into(),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body, r#"{"error":"MALFORMED_EVENT"}"#);
    }

    #[tokio::test]
    async fn test_unavailable_room_response() {
        let (status, body) =
            body_of(RoomError::Unavailable("pond".into()).into()).await;
        assert_eq!(status, 503);
        assert_eq!(body, r#"{"error":"UNAVAILABLE"}"#);
    }
}
