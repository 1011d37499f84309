//! `Session`: drives one adapter through its handshake and exposes
//! typed wrappers for the spec §4.2 operation set.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::{oneshot, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::entity::{Frame, Thread as ThreadEntity};
use crate::error::Error;
use crate::session::capabilities::SessionCapabilities;
use crate::session::state::{SessionState, StopReason};
use crate::transport::client::Client;
use crate::transport::spec::AdapterSpec;
use crate::transport::types::{
    Breakpoint, BreakpointLocation, BreakpointLocationsArguments, BreakpointLocationsResponseBody,
    Capabilities, ContinueArguments, ContinueResponseBody, ContinuedEventBody, EvaluateArguments,
    EvaluateResponseBody, Event, ExitedEventBody, InitializeRequestArguments, NextArguments,
    PauseArguments, Scope, ScopesArguments, ScopesResponseBody, SetBreakpointsArguments,
    SetBreakpointsResponseBody, SetExceptionBreakpointsArguments, Source, SourceBreakpoint,
    StackFrame, StackTraceArguments, StackTraceResponseBody, StepInArguments, StepOutArguments,
    StoppedEventBody, TerminatedEventBody, Thread, ThreadsResponseBody, Variable,
    VariablesArguments, VariablesResponseBody,
};

/// The inputs needed to redo the `launch`/`attach` handshake, retained
/// so an adapter-initiated restart (spec §4.2) can reuse them without
/// the caller supplying them again.
#[derive(Clone)]
struct RestartInputs {
    adapter_id: String,
    launch_args: Value,
    is_attach: bool,
    initial_breakpoints: Vec<(Source, Vec<SourceBreakpoint>)>,
    exception_filters: Option<Vec<String>>,
}

/// One adapter connection and everything needed to drive its
/// `initialize → initialized → configurationDone` handshake and the
/// execution-control operations that follow it.
pub struct Session {
    pub id: Uuid,
    pub adapter_id: String,
    client: Arc<Client>,
    state: Arc<RwLock<SessionState>>,
    capabilities: Arc<RwLock<SessionCapabilities>>,
    config: RuntimeConfig,
    /// Exit code reported by the adapter's `exited` event, if any. Set
    /// without touching `state` — only `terminated` or an explicit
    /// `disconnect` finalize the session (spec §4.2).
    exit_code: Arc<RwLock<Option<i64>>>,
    /// Per-thread stop-scoped stack cache backing `load_current_stack`
    /// (spec §4.3 "entity graph", §8 scenario 5).
    threads_cache: Arc<RwLock<HashMap<i64, ThreadEntity>>>,
}

impl Session {
    /// Establishes a transport, runs the full handshake (`initialize`,
    /// `launch`/`attach`, wait for `initialized`, apply
    /// `initial_breakpoints` and exception filters, `configurationDone`),
    /// and returns once the adapter has begun running.
    pub async fn start(
        adapter_id: impl Into<String>,
        spec: AdapterSpec,
        config: RuntimeConfig,
        launch_args: Value,
        is_attach: bool,
        initial_breakpoints: Vec<(Source, Vec<SourceBreakpoint>)>,
        exception_filters: Option<Vec<String>>,
    ) -> Result<Self, Error> {
        let adapter_id = adapter_id.into();
        let client = Arc::new(Client::connect(spec).await?);
        let state = Arc::new(RwLock::new(SessionState::Starting));
        let capabilities = Arc::new(RwLock::new(SessionCapabilities::default()));
        let exit_code: Arc<RwLock<Option<i64>>> = Arc::new(RwLock::new(None));
        let threads_cache: Arc<RwLock<HashMap<i64, ThreadEntity>>> =
            Arc::new(RwLock::new(HashMap::new()));

        let restart_inputs = RestartInputs {
            adapter_id: adapter_id.clone(),
            launch_args: launch_args.clone(),
            is_attach,
            initial_breakpoints: initial_breakpoints.clone(),
            exception_filters: exception_filters.clone(),
        };

        {
            let state = state.clone();
            let threads_cache = threads_cache.clone();
            client
                .on_event("stopped", move |event: Event| {
                    let state = state.clone();
                    let threads_cache = threads_cache.clone();
                    if let Some(body) = event.body {
                        if let Ok(body) = serde_json::from_value::<StoppedEventBody>(body) {
                            let thread_id = body.thread_id.unwrap_or(0);
                            let reason = StopReason::from(body.reason.as_str());
                            tokio::spawn(async move {
                                *state.write().await = SessionState::Stopped { thread_id, reason };
                                if let Some(thread) =
                                    threads_cache.write().await.get_mut(&thread_id)
                                {
                                    thread.invalidate();
                                }
                            });
                        }
                    }
                })
                .await;
        }
        {
            let state = state.clone();
            let threads_cache = threads_cache.clone();
            client
                .on_event("continued", move |event: Event| {
                    let state = state.clone();
                    let threads_cache = threads_cache.clone();
                    let body: Option<ContinuedEventBody> =
                        event.body.and_then(|b| serde_json::from_value(b).ok());
                    tokio::spawn(async move {
                        *state.write().await = SessionState::Running;
                        let mut cache = threads_cache.write().await;
                        match body {
                            Some(body) if !body.all_threads_continued.unwrap_or(false) => {
                                if let Some(thread) = cache.get_mut(&body.thread_id) {
                                    thread.invalidate();
                                }
                            }
                            _ => {
                                for thread in cache.values_mut() {
                                    thread.invalidate();
                                }
                            }
                        }
                    });
                })
                .await;
        }
        {
            let state = state.clone();
            let capabilities = capabilities.clone();
            let config = config.clone();
            let client_for_restart = client.clone();
            client
                .on_event("terminated", move |event: Event| {
                    let state = state.clone();
                    let capabilities = capabilities.clone();
                    let config = config.clone();
                    let client = client_for_restart.clone();
                    let restart_inputs = restart_inputs.clone();
                    let restart_requested: Option<Value> = event
                        .body
                        .and_then(|b| serde_json::from_value::<TerminatedEventBody>(b).ok())
                        .and_then(|b| b.restart);
                    tokio::spawn(async move {
                        if restart_requested.is_some() && config.allow_adapter_restart {
                            info!("adapter requested restart, re-entering initializing");
                            let result = run_handshake(
                                &client,
                                &state,
                                &capabilities,
                                &config,
                                &restart_inputs.adapter_id,
                                restart_inputs.launch_args,
                                restart_inputs.is_attach,
                                restart_inputs.initial_breakpoints,
                                restart_inputs.exception_filters,
                            )
                            .await;
                            if let Err(e) = result {
                                warn!(error = %e, "restart handshake failed, terminating session");
                                *state.write().await = SessionState::Terminated;
                            }
                        } else {
                            *state.write().await = SessionState::Terminated;
                        }
                    });
                })
                .await;
        }
        {
            let exit_code = exit_code.clone();
            client
                .on_event("exited", move |event: Event| {
                    let exit_code = exit_code.clone();
                    if let Some(body) = event.body.clone() {
                        if let Ok(body) = serde_json::from_value::<ExitedEventBody>(body) {
                            tokio::spawn(async move {
                                *exit_code.write().await = Some(body.exit_code);
                            });
                        }
                    }
                })
                .await;
        }

        run_handshake(
            &client,
            &state,
            &capabilities,
            &config,
            &adapter_id,
            launch_args,
            is_attach,
            initial_breakpoints,
            exception_filters,
        )
        .await?;

        Ok(Self {
            id: Uuid::new_v4(),
            adapter_id,
            client,
            state,
            capabilities,
            config,
            exit_code,
            threads_cache,
        })
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn capabilities(&self) -> SessionCapabilities {
        self.capabilities.read().await.clone()
    }

    /// Exit code reported by the adapter's `exited` event, once seen.
    pub async fn exit_code(&self) -> Option<i64> {
        *self.exit_code.read().await
    }

    pub async fn on_event<F>(&self, event: &str, callback: F)
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.client.on_event(event, callback).await;
    }

    fn require_breakpoint_mutable(&self, state: &SessionState) -> Result<(), Error> {
        if !state.accepts_breakpoint_mutation() {
            return Err(Error::InvalidState {
                expected: "configuring, running, or stopped".to_string(),
                actual: format!("{state:?}"),
            });
        }
        Ok(())
    }

    pub async fn set_breakpoints(
        &self,
        source: Source,
        breakpoints: Vec<SourceBreakpoint>,
    ) -> Result<Vec<Breakpoint>, Error> {
        let state = self.state.read().await.clone();
        self.require_breakpoint_mutable(&state)?;
        let args = SetBreakpointsArguments {
            source,
            breakpoints: Some(breakpoints),
            source_modified: Some(false),
        };
        let response = self
            .client
            .send_request(
                "setBreakpoints",
                Some(serde_json::to_value(&args)?),
                self.config.request_timeout,
            )
            .await?;
        let body: SetBreakpointsResponseBody = match response.body {
            Some(body) => serde_json::from_value(body)?,
            None => return Ok(Vec::new()),
        };
        Ok(body.breakpoints)
    }

    pub async fn set_exception_breakpoints(&self, filters: Vec<String>) -> Result<(), Error> {
        let args = SetExceptionBreakpointsArguments { filters };
        self.client
            .send_request(
                "setExceptionBreakpoints",
                Some(serde_json::to_value(&args)?),
                self.config.request_timeout,
            )
            .await?;
        Ok(())
    }

    pub async fn breakpoint_locations(
        &self,
        source: Source,
        line: i64,
        column: Option<i64>,
    ) -> Result<Vec<BreakpointLocation>, Error> {
        if !self.capabilities.read().await.supports_breakpoint_locations() {
            return Ok(vec![BreakpointLocation {
                line,
                column,
                end_line: None,
                end_column: None,
            }]);
        }
        let args = BreakpointLocationsArguments {
            source,
            line,
            column,
            end_line: None,
            end_column: None,
        };
        let response = self
            .client
            .send_request(
                "breakpointLocations",
                Some(serde_json::to_value(&args)?),
                self.config.request_timeout,
            )
            .await?;
        let body: BreakpointLocationsResponseBody = match response.body {
            Some(body) => serde_json::from_value(body)?,
            None => return Ok(Vec::new()),
        };
        Ok(body.breakpoints)
    }

    fn require_running_or_stopped(&self, state: &SessionState) -> Result<(), Error> {
        if !state.accepts_execution_control() {
            return Err(Error::InvalidState {
                expected: "running or stopped".to_string(),
                actual: format!("{state:?}"),
            });
        }
        Ok(())
    }

    async fn execution_control(
        &self,
        command: &str,
        thread_id: i64,
        args: Value,
    ) -> Result<(), Error> {
        let state = self.state.read().await.clone();
        self.require_running_or_stopped(&state)?;
        self.client
            .send_request(command, Some(args), self.config.request_timeout)
            .await?;
        let _ = thread_id;
        Ok(())
    }

    pub async fn continue_execution(&self, thread_id: i64) -> Result<bool, Error> {
        let args = ContinueArguments {
            thread_id,
            single_thread: Some(false),
        };
        let state = self.state.read().await.clone();
        self.require_running_or_stopped(&state)?;
        let response = self
            .client
            .send_request(
                "continue",
                Some(serde_json::to_value(&args)?),
                self.config.request_timeout,
            )
            .await?;
        *self.state.write().await = SessionState::Running;
        for thread in self.threads_cache.write().await.values_mut() {
            thread.invalidate();
        }
        let body: ContinueResponseBody = response
            .body
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        Ok(body.all_threads_continued.unwrap_or(true))
    }

    pub async fn next(&self, thread_id: i64) -> Result<(), Error> {
        let args = NextArguments { thread_id };
        self.execution_control("next", thread_id, serde_json::to_value(&args)?)
            .await
    }

    pub async fn step_in(&self, thread_id: i64) -> Result<(), Error> {
        let args = StepInArguments { thread_id };
        self.execution_control("stepIn", thread_id, serde_json::to_value(&args)?)
            .await
    }

    pub async fn step_out(&self, thread_id: i64) -> Result<(), Error> {
        let args = StepOutArguments { thread_id };
        self.execution_control("stepOut", thread_id, serde_json::to_value(&args)?)
            .await
    }

    pub async fn pause(&self, thread_id: i64) -> Result<(), Error> {
        let args = PauseArguments { thread_id };
        self.client
            .send_request(
                "pause",
                Some(serde_json::to_value(&args)?),
                self.config.request_timeout,
            )
            .await?;
        Ok(())
    }

    pub async fn threads(&self) -> Result<Vec<Thread>, Error> {
        let response = self
            .client
            .send_request("threads", None, self.config.request_timeout)
            .await?;
        let body: ThreadsResponseBody = match response.body {
            Some(body) => serde_json::from_value(body)?,
            None => return Ok(Vec::new()),
        };
        Ok(body.threads)
    }

    pub async fn stack_trace(&self, thread_id: i64) -> Result<Vec<StackFrame>, Error> {
        let args = StackTraceArguments {
            thread_id,
            start_frame: None,
            levels: None,
        };
        let response = self
            .client
            .send_request(
                "stackTrace",
                Some(serde_json::to_value(&args)?),
                self.config.request_timeout,
            )
            .await?;
        let body: StackTraceResponseBody = match response.body {
            Some(body) => serde_json::from_value(body)?,
            None => return Ok(Vec::new()),
        };
        Ok(body.stack_frames)
    }

    /// Loads the current stack for `thread_id` through the L2 entity
    /// graph: memoized for the life of the current stop and re-fetched
    /// with a fresh `stackTrace` request after any resume (spec §4.3,
    /// §8 scenario 5).
    pub async fn load_current_stack(&self, thread_id: i64) -> Result<Vec<Frame>, Error> {
        {
            let cache = self.threads_cache.read().await;
            if let Some(thread) = cache.get(&thread_id) {
                if let Some(frames) = thread.frames() {
                    return Ok(frames.to_vec());
                }
            }
        }
        let wire_frames = self.stack_trace(thread_id).await?;
        let frames: Vec<Frame> = wire_frames.into_iter().map(Frame::from_wire).collect();
        let mut cache = self.threads_cache.write().await;
        let thread = cache.entry(thread_id).or_insert_with(|| {
            ThreadEntity::from_wire(Thread {
                id: thread_id,
                name: String::new(),
            })
        });
        thread.set_frames(frames.clone());
        Ok(frames)
    }

    /// Drops any cached stack for `thread_id`, forcing the next
    /// `load_current_stack` to issue a fresh `stackTrace` request.
    pub async fn invalidate_stack(&self, thread_id: i64) {
        if let Some(thread) = self.threads_cache.write().await.get_mut(&thread_id) {
            thread.invalidate();
        }
    }

    pub async fn scopes(&self, frame_id: i64) -> Result<Vec<Scope>, Error> {
        let args = ScopesArguments { frame_id };
        let response = self
            .client
            .send_request(
                "scopes",
                Some(serde_json::to_value(&args)?),
                self.config.request_timeout,
            )
            .await?;
        let body: ScopesResponseBody = match response.body {
            Some(body) => serde_json::from_value(body)?,
            None => return Ok(Vec::new()),
        };
        Ok(body.scopes)
    }

    pub async fn variables(&self, variables_reference: i64) -> Result<Vec<Variable>, Error> {
        let args = VariablesArguments {
            variables_reference,
        };
        let response = self
            .client
            .send_request(
                "variables",
                Some(serde_json::to_value(&args)?),
                self.config.request_timeout,
            )
            .await?;
        let body: VariablesResponseBody = match response.body {
            Some(body) => serde_json::from_value(body)?,
            None => return Ok(Vec::new()),
        };
        Ok(body.variables)
    }

    pub async fn evaluate(
        &self,
        expression: String,
        frame_id: Option<i64>,
    ) -> Result<EvaluateResponseBody, Error> {
        let args = EvaluateArguments {
            expression,
            frame_id,
            context: Some("repl".to_string()),
        };
        let response = self
            .client
            .send_request(
                "evaluate",
                Some(serde_json::to_value(&args)?),
                self.config.request_timeout,
            )
            .await?;
        let body = response
            .body
            .ok_or_else(|| Error::ProtocolError("evaluate returned no body".to_string()))?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn disconnect(&self) -> Result<(), Error> {
        *self.state.write().await = SessionState::Terminating;
        let result = self
            .client
            .send_request(
                "disconnect",
                Some(json!({"terminateDebuggee": true})),
                self.config.request_timeout,
            )
            .await;
        self.client.close().await;
        *self.state.write().await = SessionState::Terminated;
        if let Err(e) = result {
            warn!(error = %e, "adapter did not acknowledge disconnect cleanly");
        }
        Ok(())
    }
}

/// Runs `initialize` → (wait for `initialized`) → `launch`/`attach` →
/// breakpoint/exception configuration → `configurationDone`. Shared by
/// the initial handshake in `Session::start` and by an adapter-initiated
/// restart, neither of which has an `&mut Session` available — the
/// restart runs from inside an event handler registered before the
/// `Session` itself is constructed.
#[allow(clippy::too_many_arguments)]
async fn run_handshake(
    client: &Arc<Client>,
    state: &RwLock<SessionState>,
    capabilities: &RwLock<SessionCapabilities>,
    config: &RuntimeConfig,
    adapter_id: &str,
    launch_args: Value,
    is_attach: bool,
    initial_breakpoints: Vec<(Source, Vec<SourceBreakpoint>)>,
    exception_filters: Option<Vec<String>>,
) -> Result<(), Error> {
    *state.write().await = SessionState::Initializing;

    let init_args = InitializeRequestArguments {
        client_id: Some(config.client_id.clone()),
        client_name: Some(config.client_id.clone()),
        adapter_id: adapter_id.to_string(),
        locale: Some("en-US".to_string()),
        lines_start_at_1: Some(config.client_capabilities.lines_start_at_1),
        columns_start_at_1: Some(config.client_capabilities.columns_start_at_1),
        path_format: Some(config.client_capabilities.path_format.clone()),
        supports_variable_type: Some(config.client_capabilities.supports_variable_type),
        supports_variable_paging: Some(config.client_capabilities.supports_variable_paging),
        supports_run_in_terminal_request: Some(
            config.client_capabilities.supports_run_in_terminal_request,
        ),
    };
    let response = client
        .send_request(
            "initialize",
            Some(serde_json::to_value(&init_args)?),
            config.handshake_timeout,
        )
        .await?;
    let caps: Capabilities = match response.body {
        Some(body) => serde_json::from_value(body)?,
        None => Capabilities::default(),
    };
    *capabilities.write().await = SessionCapabilities::new(caps);

    *state.write().await = SessionState::Configuring;

    let (initialized_tx, initialized_rx) = oneshot::channel();
    let initialized_tx = std::sync::Mutex::new(Some(initialized_tx));
    client
        .on_event("initialized", move |_event: Event| {
            if let Some(tx) = initialized_tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
        })
        .await;

    let command = if is_attach { "attach" } else { "launch" };
    let client_for_launch = client.clone();
    let timeout = config.handshake_timeout;
    let launch_handle = tokio::spawn(async move {
        client_for_launch
            .send_request(command, Some(launch_args), timeout)
            .await
    });

    tokio::time::timeout(config.handshake_timeout, initialized_rx)
        .await
        .map_err(|_| Error::TransportFailed("timed out waiting for 'initialized'".to_string()))?
        .map_err(|_| Error::Cancelled)?;
    client.remove_event_handlers("initialized").await;

    if let Some(filters) = exception_filters {
        if !filters.is_empty() {
            set_exception_breakpoints(client, config, filters).await?;
        }
    }

    for (source, breakpoints) in initial_breakpoints {
        set_breakpoints(client, state, config, source, breakpoints).await?;
    }

    if capabilities.read().await.supports_configuration_done() {
        client
            .send_request("configurationDone", None, config.request_timeout)
            .await?;
    }

    match launch_handle.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(e),
        Err(e) => return Err(Error::TransportFailed(format!("launch task panicked: {e}"))),
    }

    let mut state_guard = state.write().await;
    if *state_guard == SessionState::Configuring {
        *state_guard = SessionState::Running;
    }
    info!("session handshake complete");
    Ok(())
}

async fn set_exception_breakpoints(
    client: &Client,
    config: &RuntimeConfig,
    filters: Vec<String>,
) -> Result<(), Error> {
    let args = SetExceptionBreakpointsArguments { filters };
    client
        .send_request(
            "setExceptionBreakpoints",
            Some(serde_json::to_value(&args)?),
            config.request_timeout,
        )
        .await?;
    Ok(())
}

async fn set_breakpoints(
    client: &Client,
    state: &RwLock<SessionState>,
    config: &RuntimeConfig,
    source: Source,
    breakpoints: Vec<SourceBreakpoint>,
) -> Result<Vec<Breakpoint>, Error> {
    let current = state.read().await.clone();
    if !current.accepts_breakpoint_mutation() {
        return Err(Error::InvalidState {
            expected: "configuring, running, or stopped".to_string(),
            actual: format!("{current:?}"),
        });
    }
    let args = SetBreakpointsArguments {
        source,
        breakpoints: Some(breakpoints),
        source_modified: Some(false),
    };
    let response = client
        .send_request(
            "setBreakpoints",
            Some(serde_json::to_value(&args)?),
            config.request_timeout,
        )
        .await?;
    let body: SetBreakpointsResponseBody = match response.body {
        Some(body) => serde_json::from_value(body)?,
        None => return Ok(Vec::new()),
    };
    Ok(body.breakpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_breakpoint_mutable_rejects_terminated() {
        let state = SessionState::Terminated;
        assert!(!state.accepts_breakpoint_mutation());
    }
}
