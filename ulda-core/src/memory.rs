//! In-process stand-in for the remote store.
//!
//! Implements the six operations with the same shapes a real store uses,
//! enforces that each submitted hash window starts exactly one step after the
//! last accepted one, and lets tests inject faults per operation.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use crate::constants::RING_STEP;
use crate::error::{Result, UldaError};
use crate::protocol::{
    ContentCreateRequest, ContentGetRequest, ContentItem, ContentUpdateRequest, MasterAck,
    MasterGetRequest, MasterInitRequest, MasterUpdateRequest, StoredEnvelope,
};
use crate::signature::SignatureRing;
use crate::traits::channel::{AckChannel, Operation};

/// What to do instead of serving the next call to an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Acknowledge with `{"error": message}`.
    Reject(String),
    /// Drop the channel before acknowledging.
    Disconnect,
    /// Never acknowledge.
    Hang,
}

struct StoredVault {
    envelope: StoredEnvelope,
    hashes: SignatureRing,
}

struct StoredContent {
    data: Vec<u8>,
    hashes: SignatureRing,
}

#[derive(Default)]
struct StoreState {
    vaults: HashMap<String, StoredVault>,
    contents: BTreeMap<u64, StoredContent>,
    next_id: u64,
    faults: HashMap<Operation, VecDeque<Fault>>,
    calls: Vec<Operation>,
}

/// Cheaply cloneable handle; clones share the same store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `fault` for the next call to `operation`.
    pub fn inject(&self, operation: Operation, fault: Fault) {
        self.lock()
            .faults
            .entry(operation)
            .or_default()
            .push_back(fault);
    }

    /// Every operation received, in order, including faulted ones.
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock().calls.iter().filter(|op| **op == operation).count()
    }

    pub fn content_count(&self) -> usize {
        self.lock().contents.len()
    }

    pub fn master_hashes(&self, key: &str) -> Option<SignatureRing> {
        self.lock().vaults.get(key).map(|vault| vault.hashes.clone())
    }

    pub fn content_hashes(&self, id: u64) -> Option<SignatureRing> {
        self.lock().contents.get(&id).map(|content| content.hashes.clone())
    }

    /// Truncate a stored record so it no longer fills whole cipher blocks.
    /// Returns false if the id is unknown.
    pub fn corrupt_content(&self, id: u64) -> bool {
        match self.lock().contents.get_mut(&id) {
            Some(content) => content.data.pop().is_some(),
            None => false,
        }
    }

    /// Flip one byte of a stored master envelope.
    pub fn corrupt_master(&self, key: &str) -> bool {
        match self.lock().vaults.get_mut(key) {
            Some(vault) if !vault.envelope.data.is_empty() => {
                vault.envelope.data[0] ^= 0xFF;
                true
            }
            _ => false,
        }
    }

    /// Serve one request synchronously.
    pub fn handle(&self, operation: Operation, request: Value) -> Value {
        let mut state = self.lock();
        match operation {
            Operation::MasterInit => {
                with_request(request, |req: MasterInitRequest| state.master_init(req))
            }
            Operation::MasterGet => {
                with_request(request, |req: MasterGetRequest| state.master_get(req))
            }
            Operation::MasterUpdate => {
                with_request(request, |req: MasterUpdateRequest| state.master_update(req))
            }
            Operation::ContentGet => {
                with_request(request, |req: ContentGetRequest| state.content_get(req))
            }
            Operation::ContentCreate => {
                with_request(request, |req: ContentCreateRequest| state.content_create(req))
            }
            Operation::ContentUpdate => {
                with_request(request, |req: ContentUpdateRequest| state.content_update(req))
            }
        }
    }
}

#[async_trait(?Send)]
impl AckChannel for MemoryStore {
    async fn emit(&self, operation: Operation, request: Value) -> Result<Value> {
        let fault = {
            let mut state = self.lock();
            state.calls.push(operation);
            state
                .faults
                .get_mut(&operation)
                .and_then(VecDeque::pop_front)
        };

        match fault {
            None => Ok(self.handle(operation, request)),
            Some(Fault::Reject(message)) => Ok(json!({ "error": message })),
            Some(Fault::Disconnect) => Err(UldaError::Connection(format!(
                "channel dropped before {operation} was acknowledged"
            ))),
            Some(Fault::Hang) => std::future::pending().await,
        }
    }
}

fn with_request<Q, A, F>(request: Value, serve: F) -> Value
where
    Q: DeserializeOwned,
    A: Serialize,
    F: FnOnce(Q) -> std::result::Result<A, String>,
{
    let outcome = serde_json::from_value(request)
        .map_err(|e| format!("bad request: {e}"))
        .and_then(serve);
    match outcome {
        Ok(ack) => serde_json::to_value(ack).unwrap_or(Value::Null),
        Err(message) => json!({ "error": message }),
    }
}

/// The next window must begin exactly one step past the last accepted one.
fn check_advance(
    previous: &SignatureRing,
    submitted: &SignatureRing,
) -> std::result::Result<(), String> {
    submitted
        .validate()
        .map_err(|e| format!("conflict: submitted hash ring is malformed ({e})"))?;
    let expected = previous.min_index().map(|min| min + RING_STEP);
    let got = submitted.min_index();
    if expected != got {
        return Err(format!(
            "conflict: submitted hash window starts at {got:?}, expected {expected:?}"
        ));
    }
    Ok(())
}

fn parse_hashes(raw: &str) -> std::result::Result<SignatureRing, String> {
    serde_json::from_str(raw).map_err(|e| format!("bad request: hash_signatures: {e}"))
}

impl StoreState {
    fn master_init(&mut self, req: MasterInitRequest) -> std::result::Result<MasterAck, String> {
        if self.vaults.contains_key(&req.key) {
            return Err("conflict: a vault already exists for this key".into());
        }
        let hashes = parse_hashes(&req.hash_signatures)?;
        let envelope = StoredEnvelope {
            data: req.data,
            metadata: req.metadata,
        };
        self.vaults.insert(
            req.key,
            StoredVault {
                envelope: envelope.clone(),
                hashes,
            },
        );
        Ok(MasterAck {
            data: Some(envelope),
            error: None,
        })
    }

    fn master_get(&mut self, req: MasterGetRequest) -> std::result::Result<MasterAck, String> {
        let vault = self.vaults.get(&req.key).ok_or("vault not found")?;
        Ok(MasterAck {
            data: Some(vault.envelope.clone()),
            error: None,
        })
    }

    fn master_update(&mut self, req: MasterUpdateRequest) -> std::result::Result<MasterAck, String> {
        let vault = self.vaults.get_mut(&req.key).ok_or("vault not found")?;
        check_advance(&vault.hashes, &req.new_hashes)?;
        vault.envelope = StoredEnvelope {
            data: req.data,
            metadata: req.metadata,
        };
        vault.hashes = req.new_hashes;
        Ok(MasterAck {
            data: Some(vault.envelope.clone()),
            error: None,
        })
    }

    fn content_get(&mut self, req: ContentGetRequest) -> std::result::Result<Vec<ContentItem>, String> {
        Ok(req
            .ids
            .into_iter()
            .filter_map(|id| {
                self.contents.get(&id).map(|content| ContentItem {
                    id,
                    data: content.data.clone(),
                })
            })
            .collect())
    }

    fn content_create(&mut self, req: ContentCreateRequest) -> std::result::Result<u64, String> {
        let hashes = parse_hashes(&req.hash_signatures)?;
        self.next_id += 1;
        let id = self.next_id;
        self.contents.insert(
            id,
            StoredContent {
                data: req.data,
                hashes,
            },
        );
        Ok(id)
    }

    fn content_update(&mut self, req: ContentUpdateRequest) -> std::result::Result<u64, String> {
        let content = self
            .contents
            .get_mut(&req.id)
            .ok_or_else(|| format!("content {} not found", req.id))?;
        check_advance(&content.hashes, &req.new_hashes)?;
        content.data = req.data;
        content.hashes = req.new_hashes;
        Ok(req.id)
    }
}
