//! Ambient configuration shared across the transport and session layers.
//!
//! This is in-process configuration the host passes in when constructing
//! a `Debugger` — not file discovery, which stays out of scope.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Static client capabilities advertised on every `initialize` request
/// (spec §4.2 "Handshake").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    pub lines_start_at_1: bool,
    pub columns_start_at_1: bool,
    pub path_format: String,
    pub supports_variable_type: bool,
    pub supports_variable_paging: bool,
    pub supports_run_in_terminal_request: bool,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self {
            lines_start_at_1: true,
            columns_start_at_1: true,
            path_format: "path".to_string(),
            supports_variable_type: true,
            supports_variable_paging: true,
            supports_run_in_terminal_request: true,
        }
    }
}

/// Runtime-wide tunables. None of these affect DAP semantics, only how
/// aggressively the runtime waits for or gives up on the adapter.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub client_capabilities: ClientCapabilities,
    /// Identifier reported to the adapter as `clientID`/`clientName`.
    pub client_id: String,
    /// Timeout for the full initialize→initialized→configurationDone
    /// handshake (spec §4.2).
    pub handshake_timeout: Duration,
    /// Timeout applied to individual control requests issued after the
    /// handshake (continue, step, evaluate, ...).
    pub request_timeout: Duration,
    /// Number of consecutive frame parse failures tolerated before a
    /// `ProtocolError` closes the Client (spec §7: "repeated errors
    /// within N frames close the Client").
    pub max_consecutive_frame_errors: u32,
    /// Caller opt-in for spec §4.2 adapter-initiated restart: when a
    /// `terminated` event carries a `restart` payload and this is
    /// `true`, the Session re-enters `initializing` on the same
    /// Transport instead of finalizing to `terminated`.
    pub allow_adapter_restart: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            client_capabilities: ClientCapabilities::default(),
            client_id: "dap_runtime".to_string(),
            handshake_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            max_consecutive_frame_errors: 3,
            allow_adapter_restart: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capabilities_match_spec_handshake() {
        let caps = ClientCapabilities::default();
        assert!(caps.lines_start_at_1);
        assert!(caps.columns_start_at_1);
        assert_eq!(caps.path_format, "path");
    }
}
