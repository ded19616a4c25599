use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::ReceiveRequest;
use crate::errors::ListenerError;
use crate::listener::deletion::DeletionPolicy;

/// Everything the container needs to poll one queue. Fixed at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueAttributes {
    pub logical_name: String,
    pub receive_request: ReceiveRequest,
    pub is_fifo: bool,
    pub deletion_policy: DeletionPolicy,
    pub has_redrive_policy: bool,
}

impl QueueAttributes {
    pub fn queue_url(&self) -> &str {
        &self.receive_request.queue_url
    }
}

/// Registered queues by logical name. Entries are never removed.
#[derive(Debug, Default)]
pub struct QueueRegistry {
    queues: RwLock<BTreeMap<String, Arc<QueueAttributes>>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `attributes` under `logical_name`, replacing a previous
    /// registration of the same name.
    pub fn register(&self, logical_name: &str, attributes: QueueAttributes) {
        self.queues
            .write()
            .insert(logical_name.to_string(), Arc::new(attributes));
    }

    pub fn get(&self, logical_name: &str) -> Result<Arc<QueueAttributes>, ListenerError> {
        self.queues
            .read()
            .get(logical_name)
            .cloned()
            .ok_or_else(|| ListenerError::QueueNotFound(logical_name.to_string()))
    }

    /// Registered logical names, sorted.
    pub fn all_queues(&self) -> Vec<String> {
        self.queues.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.queues.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.read().is_empty()
    }
}
