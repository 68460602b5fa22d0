//! Line-delimited JSON-RPC 2.0 channel
//!
//! One writer task drains an outbound queue into the peer's input; one reader
//! task routes responses to the waiting request by id. Requests the peer sends
//! to us are answered (`ping`) or refused with `-32601`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::BackendError;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, BackendError>>>>>;

pub(crate) struct RpcChannel {
    outbound_tx: mpsc::UnboundedSender<Value>,
    pending: Pending,
    next_id: AtomicU64,
    timeout: Duration,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl RpcChannel {
    /// Start the reader and writer tasks over a byte stream pair
    pub(crate) fn spawn<R, W>(reader: R, writer: W, timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        debug!(?timeout, "RpcChannel::spawn: called");
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let writer_task = tokio::spawn(writer_loop(writer, outbound_rx, pending.clone()));
        let reader_task = tokio::spawn(reader_loop(reader, outbound_tx.clone(), pending.clone()));

        Self {
            outbound_tx,
            pending,
            next_id: AtomicU64::new(1),
            timeout,
            reader_task,
            writer_task,
        }
    }

    /// Send a request and wait for its response, bounded by the channel timeout
    pub(crate) async fn request(&self, method: &str, params: Value) -> Result<Value, BackendError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(id, %method, "RpcChannel::request: called");

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        if self.outbound_tx.send(message).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(BackendError::Closed);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BackendError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                warn!(id, %method, timeout = ?self.timeout, "RpcChannel::request: timed out");
                Err(BackendError::Timeout {
                    method: method.to_string(),
                    after: self.timeout,
                })
            }
        }
    }

    /// Fire-and-forget notification
    pub(crate) fn notify(&self, method: &str, params: Value) -> Result<(), BackendError> {
        debug!(%method, "RpcChannel::notify: called");
        self.outbound_tx
            .send(json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
            }))
            .map_err(|_| BackendError::Closed)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.reader_task.is_finished() || self.writer_task.is_finished()
    }

    /// Stop both tasks; waiting requests fail with `Closed`
    pub(crate) async fn close(&self) {
        debug!("RpcChannel::close: called");
        self.reader_task.abort();
        self.writer_task.abort();
        fail_all_pending(&self.pending).await;
    }
}

impl Drop for RpcChannel {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<IncomingError>,
}

#[derive(Debug, Deserialize)]
struct IncomingError {
    code: i64,
    message: String,
}

async fn fail_all_pending(pending: &Pending) {
    let mut pending = pending.lock().await;
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(BackendError::Closed));
    }
}

async fn writer_loop<W>(mut writer: W, mut outbound_rx: mpsc::UnboundedReceiver<Value>, pending: Pending)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound_rx.recv().await {
        let mut bytes = message.to_string().into_bytes();
        bytes.push(b'\n');
        if let Err(e) = writer.write_all(&bytes).await {
            warn!(error = %e, "writer_loop: write failed, closing channel");
            break;
        }
        let _ = writer.flush().await;
    }
    fail_all_pending(&pending).await;
}

async fn reader_loop<R>(reader: R, outbound_tx: mpsc::UnboundedSender<Value>, pending: Pending)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("reader_loop: peer closed output");
                break;
            }
            Err(e) => {
                warn!(error = %e, "reader_loop: read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let incoming = match serde_json::from_str::<IncomingMessage>(&line) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, "reader_loop: skipping non-JSON line");
                continue;
            }
        };

        // Requests from the peer
        if let Some(method) = incoming.method {
            if let Some(id) = incoming.id {
                let reply = if method == "ping" {
                    json!({ "jsonrpc": "2.0", "id": id, "result": {} })
                } else {
                    json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": -32601, "message": format!("method '{}' is not supported", method) },
                    })
                };
                let _ = outbound_tx.send(reply);
            } else {
                debug!(%method, "reader_loop: notification from peer");
            }
            continue;
        }

        let Some(id) = incoming.id.as_ref().and_then(Value::as_u64) else {
            continue;
        };
        let Some(sender) = pending.lock().await.remove(&id) else {
            debug!(id, "reader_loop: response for unknown or expired request");
            continue;
        };
        let result = match incoming.error {
            Some(err) => Err(BackendError::Rpc {
                code: err.code,
                message: err.message,
            }),
            None => Ok(incoming.result.unwrap_or(Value::Null)),
        };
        let _ = sender.send(result);
    }
    fail_all_pending(&pending).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{BufReader as TokioBufReader, DuplexStream, duplex};

    /// Minimal peer: echoes `params` back as `result`, fails `boom`, ignores `hang`
    fn spawn_peer(server: DuplexStream) {
        tokio::spawn(async move {
            let (read_half, mut write_half) = tokio::io::split(server);
            let mut lines = TokioBufReader::new(read_half).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let msg: Value = serde_json::from_str(&line).unwrap();
                let Some(id) = msg.get("id").cloned() else { continue };
                let reply = match msg["method"].as_str() {
                    Some("boom") => json!({"jsonrpc": "2.0", "id": id, "error": {"code": -1, "message": "bad"}}),
                    Some("hang") => continue,
                    _ => json!({"jsonrpc": "2.0", "id": id, "result": msg["params"].clone()}),
                };
                let mut bytes = reply.to_string().into_bytes();
                bytes.push(b'\n');
                write_half.write_all(&bytes).await.unwrap();
            }
        });
    }

    fn channel(timeout: Duration) -> RpcChannel {
        let (client, server) = duplex(64 * 1024);
        spawn_peer(server);
        let (read_half, write_half) = tokio::io::split(client);
        RpcChannel::spawn(read_half, write_half, timeout)
    }

    #[tokio::test]
    async fn test_request_response() {
        let rpc = channel(Duration::from_secs(5));
        let result = rpc.request("echo", json!({"x": 1})).await.unwrap();
        assert_eq!(result, json!({"x": 1}));
        let result = rpc.request("echo", json!({"x": 2})).await.unwrap();
        assert_eq!(result, json!({"x": 2}));
    }

    #[tokio::test]
    async fn test_error_response() {
        let rpc = channel(Duration::from_secs(5));
        let err = rpc.request("boom", json!({})).await.unwrap_err();
        assert!(matches!(err, BackendError::Rpc { code: -1, .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let rpc = channel(Duration::from_millis(50));
        let err = rpc.request("hang", json!({})).await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout { ref method, .. } if method == "hang"));
    }

    #[tokio::test]
    async fn test_closed_peer_fails_requests() {
        let (client, server) = duplex(1024);
        drop(server);
        let (read_half, write_half) = tokio::io::split(client);
        let rpc = RpcChannel::spawn(read_half, write_half, Duration::from_secs(5));
        let err = rpc.request("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, BackendError::Closed));
    }
}
