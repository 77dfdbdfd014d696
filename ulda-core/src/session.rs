use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::codec::master::Envelope;
use crate::error::{Result, UldaError};
use crate::protocol::{
    ContentCreateRequest, ContentGetRequest, ContentItem, ContentUpdateRequest, IdAck, MasterAck,
    MasterGetRequest, MasterInitRequest, MasterUpdateRequest,
};
use crate::traits::channel::{AckChannel, Operation};

/// An open connection to the remote store, owned by one `VaultClient`.
///
/// Every call sends one request and waits for exactly one acknowledgment.
/// Nothing is retried here; retry policy belongs to the caller.
pub struct RemoteSession<C> {
    channel: C,
    call_timeout: Option<Duration>,
}

impl<C: AckChannel> RemoteSession<C> {
    pub fn new(channel: C, call_timeout: Option<Duration>) -> Self {
        Self {
            channel,
            call_timeout,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Emit `request` and decode its acknowledgment as `A`.
    pub async fn call<Q: Serialize, A: DeserializeOwned>(
        &self,
        operation: Operation,
        request: &Q,
    ) -> Result<A> {
        let payload =
            serde_json::to_value(request).map_err(|e| UldaError::Serialization(e.to_string()))?;
        debug!(%operation, "emitting request");

        let pending = self.channel.emit(operation, payload);
        let ack = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| {
                UldaError::Cancelled(format!("no acknowledgment for {operation} within {limit:?}"))
            })??,
            None => pending.await?,
        };
        debug!(%operation, "acknowledged");

        serde_json::from_value(ack)
            .map_err(|e| UldaError::Protocol(format!("malformed {operation} acknowledgment: {e}")))
    }

    pub async fn master_init(&self, request: &MasterInitRequest) -> Result<Envelope> {
        let ack: MasterAck = self.call(Operation::MasterInit, request).await?;
        expect_envelope(Operation::MasterInit, ack)
    }

    pub async fn master_get(&self, key: &str) -> Result<Envelope> {
        let request = MasterGetRequest { key: key.to_string() };
        let ack: MasterAck = self.call(Operation::MasterGet, &request).await?;
        expect_envelope(Operation::MasterGet, ack)
    }

    pub async fn master_update(&self, request: &MasterUpdateRequest) -> Result<Envelope> {
        let ack: MasterAck = self.call(Operation::MasterUpdate, request).await?;
        expect_envelope(Operation::MasterUpdate, ack)
    }

    pub async fn content_get(&self, ids: Vec<u64>) -> Result<Vec<ContentItem>> {
        self.call(Operation::ContentGet, &ContentGetRequest { ids }).await
    }

    pub async fn content_create(&self, request: &ContentCreateRequest) -> Result<u64> {
        let ack: IdAck = self.call(Operation::ContentCreate, request).await?;
        expect_id(Operation::ContentCreate, ack)
    }

    pub async fn content_update(&self, request: &ContentUpdateRequest) -> Result<u64> {
        let ack: IdAck = self.call(Operation::ContentUpdate, request).await?;
        expect_id(Operation::ContentUpdate, ack)
    }
}

fn expect_envelope(operation: Operation, ack: MasterAck) -> Result<Envelope> {
    if let Some(message) = ack.error {
        return Err(classify_remote_error(operation, &message));
    }
    match ack.data {
        Some(stored) => stored.into_envelope(),
        None if operation == Operation::MasterGet => Err(UldaError::VaultNotFound(
            "store holds no master file for this key".into(),
        )),
        None => Err(UldaError::Protocol(format!(
            "{operation} acknowledgment carried no payload"
        ))),
    }
}

fn expect_id(operation: Operation, ack: IdAck) -> Result<u64> {
    match ack {
        IdAck::Id(id) => Ok(id),
        IdAck::Error { error } => Err(classify_remote_error(operation, &error)),
    }
}

/// Map a store error string onto the client taxonomy.
pub fn classify_remote_error(operation: Operation, message: &str) -> UldaError {
    let lowered = message.to_ascii_lowercase();
    let detail = format!("{operation}: {message}");

    if lowered.starts_with("conflict") {
        UldaError::Conflict(detail)
    } else if lowered.starts_with("unauthorized") || lowered.starts_with("invalid key") {
        UldaError::Auth(detail)
    } else if lowered.contains("not found") {
        if operation.is_master() {
            UldaError::VaultNotFound(detail)
        } else {
            UldaError::Consistency(detail)
        }
    } else {
        UldaError::Rejected(detail)
    }
}
