/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener or accepting a TCP stream failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The TCP stream was accepted but the WebSocket upgrade was refused
    /// or malformed.
    #[error("upgrade failed: {0}")]
    UpgradeFailed(String),

    /// Writing a frame to the peer failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Reading a frame from the peer failed (reset, protocol violation).
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_failed_display_includes_reason() {
        let err = TransportError::UpgradeFailed("missing key".into());
        assert_eq!(err.to_string(), "upgrade failed: missing key");
    }

    #[test]
    fn test_accept_failed_keeps_io_source() {
        use std::error::Error;
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken");
        let err = TransportError::AcceptFailed(io);
        assert!(err.source().is_some());
    }
}
