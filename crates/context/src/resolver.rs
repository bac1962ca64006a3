//! Context resolution — role lookup plus tiered memory retrieval.
//!
//! Memories are gathered in a fixed precedence order:
//!
//! 1. **knowledge** — durable facts
//! 2. **user** — long-lived personal context
//! 3. **session** — the current conversation
//!
//! so later, more ephemeral context can refine older facts when the composer
//! renders them in sequence. Within a tier, values keep the order in which
//! their keys were requested.
//!
//! A missing or expired key contributes nothing. A read the backend could not
//! answer is skipped the same way but reported as degraded; if *every* read
//! was degraded the whole resolution fails instead of returning an empty
//! context.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rolectx_core::clock::{Clock, SystemClock};
use rolectx_core::error::{MemoryError, Result};
use rolectx_core::event::{DomainEvent, EventBus};
use rolectx_core::memory::{MemoryScope, MemoryStore, MemoryValue};
use rolectx_core::role::{role_key, Role, RoleRegistry};
use rolectx_core::tone::ToneProfile;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::composer::PromptComposer;

/// The registry handle shared between the resolver and admin calls.
pub type SharedRoleRegistry = Arc<RwLock<RoleRegistry>>;

/// Tier order used when merging memories.
pub const RESOLVE_ORDER: [MemoryScope; 3] = [
    MemoryScope::Knowledge,
    MemoryScope::User,
    MemoryScope::Session,
];

/// Which keys to fetch from which tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeKeys {
    keys: BTreeMap<MemoryScope, Vec<String>>,
}

impl ScopeKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `keys` to `scope`, after any already present.
    pub fn with<I, K>(mut self, scope: MemoryScope, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keys
            .entry(scope)
            .or_default()
            .extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn insert(&mut self, scope: MemoryScope, key: impl Into<String>) {
        self.keys.entry(scope).or_default().push(key.into());
    }

    /// Requested keys for `scope`, first occurrence of each only.
    pub fn keys(&self, scope: MemoryScope) -> Vec<&str> {
        let mut seen = Vec::new();
        for key in self.keys.get(&scope).into_iter().flatten() {
            if !seen.contains(&key.as_str()) {
                seen.push(key.as_str());
            }
        }
        seen
    }

    pub fn is_empty(&self) -> bool {
        self.keys.values().all(Vec::is_empty)
    }

    /// The same request with every key moved under `role_id`'s namespace.
    pub fn for_role(&self, role_id: &str) -> Self {
        let keys = self
            .keys
            .iter()
            .map(|(scope, keys)| {
                let owned = keys.iter().map(|key| role_key(role_id, key)).collect();
                (*scope, owned)
            })
            .collect();
        Self { keys }
    }
}

impl<K: Into<String>> FromIterator<(MemoryScope, K)> for ScopeKeys {
    fn from_iter<T: IntoIterator<Item = (MemoryScope, K)>>(iter: T) -> Self {
        let mut keys = Self::new();
        for (scope, key) in iter {
            keys.insert(scope, key);
        }
        keys
    }
}

/// Address of one memory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRef {
    pub scope: MemoryScope,
    pub key: String,
}

/// A memory that survived resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMemory {
    pub scope: MemoryScope,
    pub key: String,
    pub value: MemoryValue,
}

/// The role, its tone, and the ordered memories for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedContext {
    pub role: Role,
    pub tone: ToneProfile,
    pub memories: Vec<ResolvedMemory>,
    /// Reads skipped because the backend could not answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<MemoryRef>,
}

impl ResolvedContext {
    /// Memory values in precedence order.
    pub fn memory_values(&self) -> Vec<&MemoryValue> {
        self.memories.iter().map(|m| &m.value).collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

pub struct ContextResolver {
    registry: SharedRoleRegistry,
    store: Arc<dyn MemoryStore>,
    clock: Arc<dyn Clock>,
    read_timeout: Option<Duration>,
    events: Option<Arc<EventBus>>,
}

impl ContextResolver {
    pub fn new(registry: SharedRoleRegistry, store: Arc<dyn MemoryStore>) -> Self {
        Self {
            registry,
            store,
            clock: Arc::new(SystemClock),
            read_timeout: None,
            events: None,
        }
    }

    /// Bound each memory read; an overrun counts as a degraded read.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Time source for event timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    /// Resolve the role and its memories.
    ///
    /// Fails with `RoleNotFound` for an unknown role, and with
    /// `BackendUnavailable` when every requested read was unavailable.
    pub async fn resolve(&self, role_id: &str, scope_keys: &ScopeKeys) -> Result<ResolvedContext> {
        let (role, tone) = {
            let registry = self.registry.read().await;
            let role = registry.get(role_id)?.clone();
            let tone = registry.tones().get(&role.tone)?.clone();
            (role, tone)
        };

        let mut memories = Vec::new();
        let mut degraded = Vec::new();
        let mut attempted = 0usize;

        for scope in RESOLVE_ORDER {
            let keys = scope_keys.keys(scope);
            let reads = join_all(keys.iter().map(|key| self.read(scope, key))).await;

            for (key, result) in keys.into_iter().zip(reads) {
                attempted += 1;
                match result {
                    Ok(value) => memories.push(ResolvedMemory {
                        scope,
                        key: key.to_string(),
                        value,
                    }),
                    Err(MemoryError::NotFound { .. }) => {
                        debug!(role = %role_id, scope = %scope, key = %key, "Memory miss");
                    }
                    Err(e) if e.is_unavailable() => {
                        warn!(role = %role_id, scope = %scope, key = %key, error = %e, "Degraded memory read");
                        if let Some(events) = &self.events {
                            events.publish(DomainEvent::DegradedRead {
                                role_id: role_id.to_string(),
                                scope,
                                key: key.to_string(),
                                reason: e.to_string(),
                                timestamp: self.clock.now(),
                            });
                        }
                        degraded.push(MemoryRef {
                            scope,
                            key: key.to_string(),
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if attempted > 0 && degraded.len() == attempted {
            return Err(MemoryError::BackendUnavailable(format!(
                "all {attempted} memory reads for role '{role_id}' failed on backend '{}'",
                self.store.name()
            ))
            .into());
        }

        debug!(
            role = %role_id,
            found = memories.len(),
            degraded = degraded.len(),
            "Resolved context"
        );
        Ok(ResolvedContext {
            role,
            tone,
            memories,
            degraded,
        })
    }

    /// Resolve, then compose with `composer`. Publishes `PromptComposed`.
    pub async fn prompt_for(
        &self,
        role_id: &str,
        scope_keys: &ScopeKeys,
        composer: &PromptComposer,
    ) -> Result<(ResolvedContext, String)> {
        let context = self.resolve(role_id, scope_keys).await?;
        let prompt = composer.compose(&context);
        if let Some(events) = &self.events {
            events.publish(DomainEvent::PromptComposed {
                role_id: role_id.to_string(),
                memories: context.memories.len(),
                prompt_len: prompt.len(),
                timestamp: self.clock.now(),
            });
        }
        Ok((context, prompt))
    }

    async fn read(&self, scope: MemoryScope, key: &str) -> std::result::Result<MemoryValue, MemoryError> {
        match self.read_timeout {
            None => self.store.get(scope, key).await,
            Some(timeout) => tokio::time::timeout(timeout, self.store.get(scope, key))
                .await
                .unwrap_or_else(|_| {
                    Err(MemoryError::BackendUnavailable(format!(
                        "read of {scope}/{key} exceeded {}ms",
                        timeout.as_millis()
                    )))
                }),
        }
    }
}
