//! How to reach an adapter: spawn it on stdio, or spawn it and connect
//! to a port it announces on its own stdout (spec §4.1 "Transport
//! establishment").

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout};

use crate::error::Error;

/// Scans bytes read from a spawned adapter's stdout for the point at
/// which it announces the port (and optionally host) it is now
/// listening on. Returns `None` until enough output has accumulated
/// to decide; `detect` is re-run against the whole buffer seen so far
/// on every new chunk.
#[derive(Clone)]
pub struct ConnectCondition {
    pub detect: Arc<dyn Fn(&[u8]) -> Option<(u16, Option<String>)> + Send + Sync>,
    /// How long to wait for `detect` to fire, and separately how long
    /// to keep retrying the TCP connect once a port is known (the
    /// adapter may print its port banner slightly before the listener
    /// is actually accepting).
    pub timeout: Duration,
}

impl std::fmt::Debug for ConnectCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectCondition")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ConnectCondition {
    pub fn new(
        detect: impl Fn(&[u8]) -> Option<(u16, Option<String>)> + Send + Sync + 'static,
        timeout: Duration,
    ) -> Self {
        Self {
            detect: Arc::new(detect),
            timeout,
        }
    }
}

/// Where and how to establish a transport to an adapter.
pub enum AdapterSpec {
    /// Spawn `program` and frame DAP messages over its stdin/stdout.
    Stdio { program: String, args: Vec<String> },
    /// Spawn `command`, scan its stdout with `connect_condition` until
    /// it announces a `(port, host?)`, then open a TCP connection
    /// there. The spawned process is the adapter itself; it stays
    /// alive for the life of the connection.
    Server {
        command: String,
        args: Vec<String>,
        env: Vec<(String, String)>,
        connect_condition: ConnectCondition,
    },
}

impl AdapterSpec {
    pub fn stdio(program: impl Into<String>, args: Vec<String>) -> Self {
        AdapterSpec::Stdio {
            program: program.into(),
            args,
        }
    }

    pub fn server(
        command: impl Into<String>,
        args: Vec<String>,
        env: Vec<(String, String)>,
        connect_condition: ConnectCondition,
    ) -> Self {
        AdapterSpec::Server {
            command: command.into(),
            args,
            env,
            connect_condition,
        }
    }
}

pub(crate) async fn spawn_stdio(program: &str, args: &[String]) -> Result<Child, Error> {
    Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::TransportFailed(format!("spawning '{program}': {e}")))
}

/// Spawns `command` with a piped stdout, feeds every chunk it prints
/// into `connect_condition.detect` until it resolves a `(port, host?)`,
/// then connects to that address. The child's stdout is left attached
/// (not forwarded) once connected; adapters that also write to stderr
/// are unaffected since only stdout is scanned.
pub(crate) async fn spawn_server_and_connect(
    command: &str,
    args: &[String],
    env: &[(String, String)],
    connect_condition: &ConnectCondition,
) -> Result<(Child, TcpStream), Error> {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);
    let mut child = cmd
        .spawn()
        .map_err(|e| Error::TransportFailed(format!("spawning '{command}': {e}")))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::TransportFailed("no stdout on child".to_string()))?;

    let detect = connect_condition.detect.clone();
    let scan = async {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stdout
                .read(&mut chunk)
                .await
                .map_err(|e| Error::TransportFailed(format!("reading adapter stdout: {e}")))?;
            if n == 0 {
                return Err(Error::TransportFailed(
                    "adapter closed stdout before announcing a port".to_string(),
                ));
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(found) = detect(&buf) {
                return Ok(found);
            }
        }
    };
    let (port, host) = match timeout(connect_condition.timeout, scan).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = child.start_kill();
            return Err(Error::TransportFailed(
                "timed out waiting for adapter to announce a port".to_string(),
            ));
        }
    };

    let addr = format!("{}:{port}", host.unwrap_or_else(|| "127.0.0.1".to_string()));
    match connect_with_retry(&addr, connect_condition.timeout).await {
        Ok(stream) => Ok((child, stream)),
        Err(e) => {
            let _ = child.start_kill();
            Err(e)
        }
    }
}

/// Polls `addr` every 50ms until a TCP connection succeeds or
/// `timeout` elapses — absorbs the race between an adapter printing
/// its port banner and the listener actually accepting.
pub(crate) async fn connect_with_retry(addr: &str, timeout_duration: Duration) -> Result<TcpStream, Error> {
    let deadline = timeout(timeout_duration, async {
        loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => return stream,
                Err(_) => sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;
    deadline.map_err(|_| Error::TransportFailed(format!("no adapter listening at {addr}")))
}
