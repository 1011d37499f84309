//! Drives `Session::start` against a minimal in-process fake adapter
//! speaking real DAP framing over a loopback TCP socket, exercising
//! the handshake and a breakpoint round-trip end to end.

use std::time::Duration;

use dap_runtime::config::RuntimeConfig;
use dap_runtime::debugger::Debugger;
use dap_runtime::entity::Location;
use dap_runtime::session::{Session, SessionState};
use dap_runtime::transport::framing::{read_frame, write_frame};
use dap_runtime::transport::spec::{AdapterSpec, ConnectCondition};
use dap_runtime::transport::types::{
    Breakpoint, Capabilities, Message, Request, Response, SetBreakpointsResponseBody, Source,
    SourceBreakpoint,
};
use tokio::io::BufReader;
use tokio::net::TcpListener;

/// Runs one fake-adapter session on `stream`: answers every request
/// with `success: true`, and fires `initialized` right after
/// `initialize` the way a well-behaved adapter does.
async fn run_fake_adapter(stream: tokio::net::TcpStream) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            _ => break,
        };
        let message: Message = match serde_json::from_slice(&frame) {
            Ok(m) => m,
            Err(_) => continue,
        };
        let Message::Request(Request {
            seq,
            command,
            arguments,
        }) = message
        else {
            continue;
        };

        let body = match command.as_str() {
            "initialize" => Some(
                serde_json::to_value(Capabilities {
                    supports_configuration_done_request: Some(true),
                    ..Default::default()
                })
                .unwrap(),
            ),
            "setBreakpoints" => {
                let args: dap_runtime::transport::types::SetBreakpointsArguments =
                    serde_json::from_value(arguments.unwrap()).unwrap();
                let breakpoints = args
                    .breakpoints
                    .unwrap_or_default()
                    .into_iter()
                    .enumerate()
                    .map(|(i, b)| Breakpoint {
                        id: Some(i as i64 + 1),
                        verified: true,
                        message: None,
                        source: Some(args.source.clone()),
                        line: Some(b.line),
                        column: b.column,
                    })
                    .collect();
                Some(serde_json::to_value(SetBreakpointsResponseBody { breakpoints }).unwrap())
            }
            _ => None,
        };

        let response = Message::Response(Response {
            seq: seq + 1000,
            request_seq: seq,
            command: command.clone(),
            success: true,
            message: None,
            body,
        });
        write_frame(&mut write_half, &serde_json::to_vec(&response).unwrap())
            .await
            .unwrap();

        if command == "initialize" {
            let event = Message::Event(dap_runtime::transport::types::Event {
                seq: seq + 2000,
                event: "initialized".to_string(),
                body: None,
            });
            write_frame(&mut write_half, &serde_json::to_vec(&event).unwrap())
                .await
                .unwrap();
        }

        if command == "disconnect" {
            break;
        }
    }
}

async fn spawn_fake_adapter_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            run_fake_adapter(stream).await;
        }
    });
    port
}

/// Scans a spawned child's stdout for `"port NNNN"`, the shape the
/// `AdapterSpec::Server` contract expects a real adapter to print.
fn detect_port(buf: &[u8]) -> Option<(u16, Option<String>)> {
    let text = String::from_utf8_lossy(buf);
    let idx = text.find("port ")?;
    let rest = &text[idx + 5..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u16>().ok().map(|p| (p, None))
}

/// `sh` plays the role of the adapter's launcher here: it announces
/// the already-bound fake-adapter port on stdout, which is exactly
/// what a real `Server`-mode adapter does for its own listener.
fn fake_adapter_spec(port: u16) -> AdapterSpec {
    AdapterSpec::Server {
        command: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            format!("echo 'Listening on port {port}'; sleep 30"),
        ],
        env: Vec::new(),
        connect_condition: ConnectCondition::new(detect_port, Duration::from_secs(2)),
    }
}

#[tokio::test]
async fn handshake_reaches_running_state() {
    let port = spawn_fake_adapter_server().await;
    let spec = fake_adapter_spec(port);

    let session = Session::start(
        "fake",
        spec,
        RuntimeConfig::default(),
        serde_json::json!({"program": "/tmp/fixture"}),
        false,
        Vec::new(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(session.state().await, SessionState::Running);
}

#[tokio::test]
async fn initial_breakpoints_are_applied_during_handshake() {
    let port = spawn_fake_adapter_server().await;
    let spec = fake_adapter_spec(port);

    let source = Source {
        name: None,
        path: Some("/tmp/fixture.rs".to_string()),
        source_reference: None,
    };
    let breakpoints = vec![SourceBreakpoint {
        line: 10,
        column: None,
        condition: None,
        hit_condition: None,
        log_message: None,
    }];

    let session = Session::start(
        "fake",
        spec,
        RuntimeConfig::default(),
        serde_json::json!({"program": "/tmp/fixture"}),
        false,
        vec![(source, breakpoints)],
        None,
    )
    .await
    .unwrap();

    assert_eq!(session.state().await, SessionState::Running);
}

#[tokio::test]
async fn debugger_registers_and_disconnects_a_session() {
    let port = spawn_fake_adapter_server().await;
    let spec = fake_adapter_spec(port);

    let session = Session::start(
        "fake",
        spec,
        RuntimeConfig::default(),
        serde_json::json!({}),
        false,
        Vec::new(),
        None,
    )
    .await
    .unwrap();

    let debugger = Debugger::new();
    let session_id = debugger.register_session(session).await;
    assert_eq!(debugger.list_sessions().await, vec![session_id]);

    debugger
        .add_breakpoint(Location::new("/tmp/fixture.rs", 5, None))
        .await
        .unwrap();

    let session = debugger.session(session_id).await.unwrap();
    session.disconnect().await.unwrap();
    assert_eq!(session.state().await, SessionState::Terminated);
}
