use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ulda_core::{AckChannel, Operation, UldaError};

/// Waiting calls by frame id. `None` once the connection is gone.
type Pending = Arc<Mutex<Option<HashMap<u64, oneshot::Sender<Value>>>>>;

/// Request frame, one JSON object per line.
#[derive(Debug, Serialize, Deserialize)]
struct RequestFrame {
    id: u64,
    event: String,
    payload: Value,
}

/// Acknowledgment frame, one JSON object per line.
#[derive(Debug, Serialize, Deserialize)]
struct AckFrame {
    id: u64,
    payload: Value,
}

/// Event channel over a plain TCP connection.
///
/// Wire format:
/// ```text
/// Client sends:    {"id": 7, "event": "master:get", "payload": {...}}\n
/// Store responds:  {"id": 7, "payload": {...}}\n
/// ```
///
/// Acknowledgments may arrive in any order; a background task matches them to
/// waiting calls by id. When the connection drops, every waiting call fails
/// with `UldaError::Connection`.
pub struct TcpChannel {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: Pending,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl TcpChannel {
    /// Connect to a store at the given `host:port`.
    pub async fn connect(server_addr: &str) -> Result<Self, UldaError> {
        info!("Connecting to store at {server_addr}");
        let stream = TcpStream::connect(server_addr)
            .await
            .map_err(|e| UldaError::Connection(format!("connect to {server_addr} failed: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| UldaError::Connection(format!("socket setup failed: {e}")))?;
        info!("connection established");
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        let pending: Pending = Arc::new(Mutex::new(Some(HashMap::new())));
        let reader = tokio::spawn(read_acks(read, Arc::clone(&pending)));
        Self {
            writer: tokio::sync::Mutex::new(write),
            pending,
            next_id: AtomicU64::new(1),
            reader,
        }
    }

    #[cfg(test)]
    fn waiting_calls(&self) -> usize {
        lock(&self.pending).as_ref().map_or(0, HashMap::len)
    }
}

/// Removes a call's pending entry when the call ends, including when the
/// caller drops the `emit` future before the acknowledgment arrives.
struct WaitingCall<'a> {
    pending: &'a Pending,
    id: u64,
}

impl Drop for WaitingCall<'_> {
    fn drop(&mut self) {
        if let Some(waiting) = lock(self.pending).as_mut() {
            waiting.remove(&self.id);
        }
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait(?Send)]
impl AckChannel for TcpChannel {
    async fn emit(&self, operation: Operation, request: Value) -> Result<Value, UldaError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        match lock(&self.pending).as_mut() {
            Some(waiting) => {
                waiting.insert(id, tx);
            }
            None => {
                return Err(UldaError::Connection(format!(
                    "connection closed, cannot send {operation}"
                )))
            }
        }
        let _waiting = WaitingCall {
            pending: &self.pending,
            id,
        };

        let frame = RequestFrame {
            id,
            event: operation.event_name().to_string(),
            payload: request,
        };
        let mut line =
            serde_json::to_vec(&frame).map_err(|e| UldaError::Serialization(e.to_string()))?;
        line.push(b'\n');

        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(&line).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            return Err(UldaError::Connection(format!("write failed: {e}")));
        }
        debug!(id, %operation, bytes = line.len(), "frame sent");

        rx.await.map_err(|_| {
            UldaError::Connection(format!(
                "connection closed before {operation} was acknowledged"
            ))
        })
    }
}

async fn read_acks(read: OwnedReadHalf, pending: Pending) {
    let mut lines = BufReader::new(read).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<AckFrame>(&line) {
                Ok(ack) => {
                    let waiter = lock(&pending)
                        .as_mut()
                        .and_then(|waiting| waiting.remove(&ack.id));
                    match waiter {
                        // The caller may have given up already.
                        Some(tx) => {
                            let _ = tx.send(ack.payload);
                        }
                        None => debug!(id = ack.id, "acknowledgment with no waiting call"),
                    }
                }
                Err(e) => warn!(error = %e, "discarding malformed frame"),
            },
            Ok(None) => {
                info!("store closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "read failed");
                break;
            }
        }
    }
    // Dropping the senders fails every waiting call.
    lock(&pending).take();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
