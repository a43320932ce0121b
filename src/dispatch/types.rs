use super::completion::{Completer, Completion, OpResult, completion_pair};
use crate::error::StoreError;
use crate::model::{Entity, collection_name};

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Get,
    Save,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Get => write!(f, "get"),
            OperationKind::Save => write!(f, "save"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

/// Identity of a key worker: `collection + "/" + key`.
///
/// Two records with the same type tag and key share one routing key, and
/// therefore one worker and one total order of operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    collection: String,
    key: String,
}

impl RoutingKey {
    pub fn new(kind: &str, key: &str) -> Result<Self, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidRecord("empty record key".to_string()));
        }
        // Dot segments would resolve to the collection itself in a URL path.
        if key == "." || key == ".." {
            return Err(StoreError::InvalidRecord(format!(
                "record key {:?} is a relative path segment",
                key
            )));
        }

        Ok(Self {
            collection: collection_name(kind)?,
            key: key.to_string(),
        })
    }

    pub fn for_entity(entity: &dyn Entity) -> Result<Self, StoreError> {
        Self::new(entity.kind(), entity.key())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

/// A request to run one store call against one record.
pub struct Operation {
    pub kind: OperationKind,
    pub record: Arc<dyn Entity>,
    completer: Completer,
}

impl Operation {
    pub fn new(kind: OperationKind, record: Arc<dyn Entity>) -> (Self, Completion) {
        let (completer, completion) = completion_pair();
        (
            Self {
                kind,
                record,
                completer,
            },
            completion,
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.completer.is_cancelled()
    }

    pub fn fulfill(self, result: OpResult) {
        self.completer.fulfill(result);
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind)
            .field("kind_tag", &self.record.kind())
            .field("key", &self.record.key())
            .finish()
    }
}
