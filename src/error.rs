use thiserror::Error;

/// Exhaustive error taxonomy for the runtime (see spec §7).
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Adapter process could not be spawned, or a `Server` transport
    /// could not be reached after its `connect_condition` fired.
    #[error("transport failed: {0}")]
    TransportFailed(String),

    /// The transport's channel is gone (adapter exited, socket closed)
    /// and a subsequent request was attempted against it.
    #[error("transport closed")]
    TransportClosed,

    /// A frame could not be parsed as DAP JSON; the reader resynchronizes
    /// on the next `Content-Length:` line.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The adapter responded `success: false` to a request.
    #[error("adapter rejected '{command}': {message}")]
    AdapterRejected { command: String, message: String },

    /// A pending request's callback was invoked because the owning
    /// `Client` was closed before a response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// An operation was attempted in a `Session`/`Thread` state that does
    /// not support it (e.g. stepping a running thread).
    #[error("invalid state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("source not found: {0}")]
    SourceNotFound(String),
}

impl Error {
    /// Stable numeric classification, mirroring JSON-RPC-style error
    /// codes so host processes can route errors without matching on
    /// Display text.
    pub fn error_code(&self) -> i32 {
        match self {
            Error::TransportFailed(_) => -32001,
            Error::TransportClosed => -32002,
            Error::ProtocolError(_) => -32003,
            Error::AdapterRejected { .. } => -32004,
            Error::Cancelled => -32005,
            Error::InvalidState { .. } => -32006,
            Error::SessionNotFound(_) => -32007,
            Error::SourceNotFound(_) => -32008,
            Error::Io(_) | Error::Json(_) => -32603,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(Error::TransportClosed.error_code(), -32002);
        assert_eq!(
            Error::InvalidState {
                expected: "stopped".into(),
                actual: "running".into()
            }
            .error_code(),
            -32006
        );
    }

    #[test]
    fn adapter_rejected_formats_command_and_message() {
        let err = Error::AdapterRejected {
            command: "launch".into(),
            message: "no such file".into(),
        };
        assert_eq!(err.to_string(), "adapter rejected 'launch': no such file");
    }
}
