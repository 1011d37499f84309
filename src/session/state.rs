//! The session state machine (spec §4.2).

use serde::{Deserialize, Serialize};

/// Lifecycle states a `Session` moves through. Transitions are driven
/// either by the runtime issuing a request (`starting` → `initializing`
/// → `configuring`) or by the adapter emitting an event (`stopped`,
/// `terminated`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Transport is being established; no `initialize` sent yet.
    Starting,
    /// `initialize` sent, waiting on the response and `initialized` event.
    Initializing,
    /// `initialized` received; accepting `setBreakpoints`/
    /// `setExceptionBreakpoints` prior to `configurationDone`.
    Configuring,
    /// Program is running (or has just been told to continue/step).
    Running,
    /// Execution is suspended at `thread_id` for `reason`.
    Stopped {
        thread_id: i64,
        reason: StopReason,
    },
    /// `disconnect`/`terminate` has been requested; adapter teardown
    /// in progress.
    Terminating,
    /// Adapter confirmed termination (`terminated` event received, or
    /// the transport closed).
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    Breakpoint,
    Step,
    Exception,
    Pause,
    Entry,
    FunctionBreakpoint,
    DataBreakpoint,
    InstructionBreakpoint,
    Goto,
    Other(String),
}

impl From<&str> for StopReason {
    fn from(value: &str) -> Self {
        match value {
            "breakpoint" => StopReason::Breakpoint,
            "step" => StopReason::Step,
            "exception" => StopReason::Exception,
            "pause" => StopReason::Pause,
            "entry" => StopReason::Entry,
            "function breakpoint" => StopReason::FunctionBreakpoint,
            "data breakpoint" => StopReason::DataBreakpoint,
            "instruction breakpoint" => StopReason::InstructionBreakpoint,
            "goto" => StopReason::Goto,
            other => StopReason::Other(other.to_string()),
        }
    }
}

impl SessionState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, SessionState::Stopped { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }

    pub fn accepts_breakpoint_mutation(&self) -> bool {
        matches!(
            self,
            SessionState::Configuring | SessionState::Stopped { .. } | SessionState::Running
        )
    }

    pub fn accepts_execution_control(&self) -> bool {
        matches!(self, SessionState::Stopped { .. } | SessionState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reason_maps_known_strings() {
        assert_eq!(StopReason::from("breakpoint"), StopReason::Breakpoint);
        assert_eq!(
            StopReason::from("weird"),
            StopReason::Other("weird".to_string())
        );
    }

    #[test]
    fn terminated_is_terminal_and_not_stopped() {
        assert!(SessionState::Terminated.is_terminal());
        assert!(!SessionState::Terminated.is_stopped());
    }

    #[test]
    fn starting_does_not_accept_execution_control() {
        assert!(!SessionState::Starting.accepts_execution_control());
        assert!(SessionState::Running.accepts_execution_control());
    }
}
