//! `Client`: owns a framed transport, correlates requests with
//! responses by `seq`, and fans out events to registered callbacks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::Error;
use crate::transport::framing::{read_frame, write_frame};
use crate::transport::spec::{spawn_server_and_connect, spawn_stdio, AdapterSpec};
use crate::transport::types::{Event, Message, Request, Response};

type EventCallback = Arc<dyn Fn(Event) + Send + Sync>;

struct PendingRequest {
    reply: oneshot::Sender<Response>,
}

/// A live connection to a DAP adapter.
///
/// Reader and writer run as separate background tasks so a slow or
/// stalled adapter write never blocks delivery of events already
/// queued from the reader side.
pub struct Client {
    next_seq: AtomicI64,
    pending: Arc<Mutex<HashMap<i64, PendingRequest>>>,
    event_handlers: Arc<RwLock<HashMap<String, Vec<EventCallback>>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    closed: Arc<tokio::sync::Notify>,
    is_closed: Arc<std::sync::atomic::AtomicBool>,
    /// The adapter process, for `Stdio` and `Server` transports alike —
    /// `close()` kills it explicitly rather than relying only on
    /// `kill_on_drop` (spec §4.1 testable invariant: closing a session
    /// must not leave the adapter process running).
    child: Mutex<Option<Child>>,
}

impl Client {
    pub async fn connect(spec: AdapterSpec) -> Result<Self, Error> {
        match spec {
            AdapterSpec::Stdio { program, args } => {
                let mut child = spawn_stdio(&program, &args).await?;
                let stdin = child
                    .stdin
                    .take()
                    .ok_or_else(|| Error::TransportFailed("no stdin on child".to_string()))?;
                let stdout = child
                    .stdout
                    .take()
                    .ok_or_else(|| Error::TransportFailed("no stdout on child".to_string()))?;
                Ok(Self::from_halves(BufReader::new(stdout), stdin, Some(child)))
            }
            AdapterSpec::Server {
                command,
                args,
                env,
                connect_condition,
            } => {
                let (child, stream) =
                    spawn_server_and_connect(&command, &args, &env, &connect_condition).await?;
                let (read_half, write_half) = stream.into_split();
                Ok(Self::from_halves(
                    BufReader::new(read_half),
                    write_half,
                    Some(child),
                ))
            }
        }
    }

    fn from_halves<R, W>(mut reader: BufReader<R>, mut writer: W, child: Option<Child>) -> Self
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending: Arc<Mutex<HashMap<i64, PendingRequest>>> = Arc::new(Mutex::new(HashMap::new()));
        let event_handlers: Arc<RwLock<HashMap<String, Vec<EventCallback>>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let closed = Arc::new(tokio::sync::Notify::new());
        let is_closed = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let writer_closed = closed.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = outbound_rx.recv() => {
                        match frame {
                            Some(body) => {
                                if let Err(e) = write_frame(&mut writer, &body).await {
                                    warn!(error = %e, "write failed, closing writer task");
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    _ = writer_closed.notified() => break,
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_events = event_handlers.clone();
        let reader_closed = closed.clone();
        let reader_is_closed = is_closed.clone();
        tokio::spawn(async move {
            loop {
                let frame = read_frame(&mut reader).await;
                match frame {
                    Ok(Some(body)) => {
                        let parsed: Result<Message, _> = serde_json::from_slice(&body);
                        match parsed {
                            Ok(Message::Response(resp)) => {
                                let mut guard = reader_pending.lock().await;
                                if let Some(p) = guard.remove(&resp.request_seq) {
                                    let _ = p.reply.send(resp);
                                }
                            }
                            Ok(Message::Event(event)) => {
                                let handlers = reader_events.read().await;
                                if let Some(callbacks) = handlers.get(&event.event) {
                                    for cb in callbacks {
                                        cb(event.clone());
                                    }
                                }
                            }
                            Ok(Message::Request(_)) => {
                                debug!("ignoring reverse request from adapter");
                            }
                            Err(e) => {
                                warn!(error = %e, "failed to parse frame as DAP message");
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "frame read error, closing reader task");
                        break;
                    }
                }
            }
            reader_is_closed.store(true, Ordering::SeqCst);
            // Drop each pending reply sender rather than sending a
            // synthetic failed `Response`: a dropped oneshot sender
            // makes `send_request`'s `response.map_err(|_| Error::Cancelled)`
            // fire, which is the contract (spec §4.1) — an
            // `AdapterRejected` would misrepresent a transport loss as
            // an adapter-level refusal.
            reader_pending.lock().await.clear();
            reader_closed.notify_waiters();
        });

        Self {
            next_seq: AtomicI64::new(1),
            pending,
            event_handlers,
            outbound: outbound_tx,
            closed,
            is_closed,
            child: Mutex::new(child),
        }
    }

    /// Registers `callback` to run whenever an `event` with this name
    /// arrives. Multiple callbacks per event name fan out in
    /// registration order.
    pub async fn on_event<F>(&self, event: &str, callback: F)
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        let mut handlers = self.event_handlers.write().await;
        handlers
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(callback));
    }

    pub async fn remove_event_handlers(&self, event: &str) {
        let mut handlers = self.event_handlers.write().await;
        handlers.remove(event);
    }

    fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::SeqCst)
    }

    /// Sends `command`/`arguments` and waits for the matching response,
    /// failing if none arrives within `request_timeout` or the
    /// transport closes first.
    pub async fn send_request(
        &self,
        command: &str,
        arguments: Option<serde_json::Value>,
        request_timeout: Duration,
    ) -> Result<Response, Error> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let request = Request {
            seq,
            command: command.to_string(),
            arguments,
        };
        let message = Message::Request(request);
        let body = serde_json::to_vec(&message)?;

        let (tx, rx) = oneshot::channel();
        {
            let mut guard = self.pending.lock().await;
            guard.insert(seq, PendingRequest { reply: tx });
        }

        self.outbound
            .send(body)
            .map_err(|_| Error::TransportClosed)?;

        let response = timeout(request_timeout, rx).await.map_err(|_| {
            Error::TransportFailed(format!("timed out waiting for response to '{command}'"))
        })?;
        let response = response.map_err(|_| Error::Cancelled)?;

        if !response.success {
            return Err(Error::AdapterRejected {
                command: command.to_string(),
                message: response
                    .message
                    .clone()
                    .unwrap_or_else(|| "no message".to_string()),
            });
        }
        Ok(response)
    }

    /// Closes the transport: stops the writer/reader tasks, fails any
    /// request still in flight with `Error::Cancelled` exactly once,
    /// and kills the adapter process if this `Client` spawned one
    /// (spec §4.1: closing a session must not leave the adapter
    /// running).
    pub async fn close(&self) {
        self.is_closed.store(true, Ordering::SeqCst);
        self.pending.lock().await.clear();
        self.closed.notify_waiters();
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to kill adapter process on close");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::io::duplex;

    async fn connected_pair() -> (Client, tokio::io::DuplexStream) {
        let (client_side, adapter_side) = duplex(8192);
        let (read_half, write_half) = tokio::io::split(client_side);
        let client = Client::from_halves(BufReader::new(read_half), write_half, None);
        (client, adapter_side)
    }

    #[tokio::test]
    async fn send_request_matches_response_by_seq() {
        let (client, mut adapter) = connected_pair().await;
        let responder = tokio::spawn(async move {
            let mut reader = BufReader::new(&mut adapter);
            let body = read_frame(&mut reader).await.unwrap().unwrap();
            let req: Message = serde_json::from_slice(&body).unwrap();
            let seq = match req {
                Message::Request(r) => r.seq,
                _ => panic!("expected request"),
            };
            let resp = Message::Response(Response {
                seq: 99,
                request_seq: seq,
                command: "initialize".to_string(),
                success: true,
                message: None,
                body: Some(serde_json::json!({"ok": true})),
            });
            write_frame(&mut adapter, &serde_json::to_vec(&resp).unwrap())
                .await
                .unwrap();
            adapter
        });

        let response = client
            .send_request("initialize", None, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(response.success);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn unsuccessful_response_becomes_adapter_rejected() {
        let (client, mut adapter) = connected_pair().await;
        tokio::spawn(async move {
            let mut reader = BufReader::new(&mut adapter);
            let body = read_frame(&mut reader).await.unwrap().unwrap();
            let req: Message = serde_json::from_slice(&body).unwrap();
            let seq = match req {
                Message::Request(r) => r.seq,
                _ => unreachable!(),
            };
            let resp = Message::Response(Response {
                seq: 2,
                request_seq: seq,
                command: "launch".to_string(),
                success: false,
                message: Some("bad program".to_string()),
                body: None,
            });
            write_frame(&mut adapter, &serde_json::to_vec(&resp).unwrap())
                .await
                .unwrap();
        });

        let err = client
            .send_request("launch", None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AdapterRejected { .. }));
    }

    #[tokio::test]
    async fn event_callbacks_fire_for_registered_events() {
        let (client, mut adapter) = connected_pair().await;
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        client
            .on_event("stopped", move |_event| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        let event = Message::Event(Event {
            seq: 1,
            event: "stopped".to_string(),
            body: Some(serde_json::json!({"reason": "breakpoint"})),
        });
        write_frame(&mut adapter, &serde_json::to_vec(&event).unwrap())
            .await
            .unwrap();

        for _ in 0..50 {
            if count.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_request_fails_fast_once_closed() {
        let (client, _adapter) = connected_pair().await;
        client.close().await;
        let err = client
            .send_request("threads", None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransportClosed));
    }

    #[tokio::test]
    async fn close_cancels_requests_already_in_flight() {
        let (client, _adapter) = connected_pair().await;
        let client = Arc::new(client);
        let waiting = client.clone();
        let handle = tokio::spawn(async move {
            waiting
                .send_request("stackTrace", None, Duration::from_secs(5))
                .await
        });

        for _ in 0..50 {
            if !client.pending.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        client.close().await;
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
