//! Domain event system — decoupled observability for the context service.
//!
//! Events are published when something interesting happens in the system.
//! Other components can subscribe to react without tight coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::memory::MemoryScope;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A role was added or replaced in the registry
    RoleRegistered {
        role_id: String,
        replaced: bool,
        timestamp: DateTime<Utc>,
    },

    /// A custom role was removed
    RoleRemoved {
        role_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A memory entry was written
    MemoryWritten {
        scope: MemoryScope,
        key: String,
        expires_at: DateTime<Utc>,
    },

    /// A sweep removed expired entries
    MemorySwept {
        removed: usize,
        timestamp: DateTime<Utc>,
    },

    /// A memory read was skipped because the backend could not answer
    DegradedRead {
        role_id: String,
        scope: MemoryScope,
        key: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A prompt was composed for a role
    PromptComposed {
        role_id: String,
        memories: usize,
        prompt_len: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
