use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UldaError;

/// The named request/acknowledgment operations exposed by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    MasterInit,
    MasterGet,
    MasterUpdate,
    ContentGet,
    ContentCreate,
    ContentUpdate,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::MasterInit,
        Operation::MasterGet,
        Operation::MasterUpdate,
        Operation::ContentGet,
        Operation::ContentCreate,
        Operation::ContentUpdate,
    ];

    /// Event name used on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            Operation::MasterInit => "master:init",
            Operation::MasterGet => "master:get",
            Operation::MasterUpdate => "master:update",
            Operation::ContentGet => "content:get",
            Operation::ContentCreate => "content:create",
            Operation::ContentUpdate => "content:update",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.event_name() == name)
    }

    pub fn is_master(&self) -> bool {
        matches!(
            self,
            Operation::MasterInit | Operation::MasterGet | Operation::MasterUpdate
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// A duplex channel on which every request receives exactly one acknowledgment.
///
/// Implementations must resolve a call whose channel drops before the ack
/// arrives as `UldaError::Connection`, never as an empty success.
#[async_trait(?Send)]
pub trait AckChannel {
    async fn emit(&self, operation: Operation, request: Value) -> Result<Value, UldaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_roundtrip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_event_name(op.event_name()), Some(op));
        }
        assert_eq!(Operation::from_event_name("master:delete"), None);
    }

    #[test]
    fn test_master_operations() {
        assert!(Operation::MasterUpdate.is_master());
        assert!(!Operation::ContentUpdate.is_master());
    }
}
