//! Service wiring — one handle over catalog, registry, store and resolver.

use std::sync::Arc;
use std::time::Duration;

use rolectx_config::AppConfig;
use rolectx_core::clock::Clock;
use rolectx_core::error::{RegistryError, Result};
use rolectx_core::event::{DomainEvent, EventBus};
use rolectx_core::memory::{MemoryEntry, MemoryScope, MemoryStore, MemoryValue};
use rolectx_core::role::{role_key, strip_role_key, RoleRegistry, ROLE_KEY_SEPARATOR};
use rolectx_core::tone::ToneCatalog;
use rolectx_memory::{store_from_config, Sweeper, SweeperHandle};
use tracing::{debug, info};

use crate::admin::RoleAdmin;
use crate::composer::PromptComposer;
use crate::resolver::{ContextResolver, ResolvedContext, ScopeKeys};

/// Everything a caller needs to manage roles, write memories and build
/// prompts, sharing one registry, one store and one event bus.
pub struct ContextService {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn MemoryStore>,
    events: Arc<EventBus>,
    admin: RoleAdmin,
    resolver: ContextResolver,
    composer: PromptComposer,
}

impl ContextService {
    /// Seed the catalog and registry from `config` and select the store.
    ///
    /// `external` is the adapter used when the config names an external
    /// backend; it is ignored for the in-process tiers.
    pub fn from_config(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        external: Option<Arc<dyn MemoryStore>>,
    ) -> Result<Self> {
        let store = store_from_config(&config, Arc::clone(&clock), external)?;
        Self::with_store(config, clock, store)
    }

    /// Like [`from_config`](Self::from_config) with an already built store.
    pub fn with_store(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn MemoryStore>,
    ) -> Result<Self> {
        let tones = Arc::new(ToneCatalog::from_profiles(config.tone_seed())?);
        let tone_count = tones.len();
        let registry = RoleRegistry::with_defaults(tones, config.role_seed())?;

        let events = Arc::new(EventBus::default());
        let admin = RoleAdmin::from_registry(registry)
            .with_events(Arc::clone(&events))
            .with_clock(Arc::clone(&clock));
        let resolver = ContextResolver::new(admin.registry(), Arc::clone(&store))
            .with_read_timeout(config.backend_timeout())
            .with_events(Arc::clone(&events))
            .with_clock(Arc::clone(&clock));

        info!(
            backend = %store.name(),
            tones = tone_count,
            "Context service ready"
        );

        Ok(Self {
            config,
            clock,
            store,
            events,
            admin,
            resolver,
            composer: PromptComposer,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn roles(&self) -> &RoleAdmin {
        &self.admin
    }

    pub fn resolver(&self) -> &ContextResolver {
        &self.resolver
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Write a memory with its tier's TTL (or `ttl_override`).
    pub async fn remember(
        &self,
        scope: MemoryScope,
        key: &str,
        value: impl Into<MemoryValue>,
        ttl_override: Option<Duration>,
    ) -> Result<MemoryEntry> {
        let entry = self.store.put(scope, key, value.into(), ttl_override).await?;
        debug!(scope = %scope, key = %key, expires_at = %entry.expires_at, "Memory written");
        self.events.publish(DomainEvent::MemoryWritten {
            scope,
            key: entry.key.clone(),
            expires_at: entry.expires_at,
        });
        Ok(entry)
    }

    pub async fn forget(&self, scope: MemoryScope, key: &str) -> Result<()> {
        self.store.delete(scope, key).await?;
        Ok(())
    }

    /// Write a memory owned by `role_id`, stored under [`role_key`].
    ///
    /// Resolve it later with [`ScopeKeys::for_role`].
    pub async fn remember_for_role(
        &self,
        role_id: &str,
        scope: MemoryScope,
        key: &str,
        value: impl Into<MemoryValue>,
        ttl_override: Option<Duration>,
    ) -> Result<MemoryEntry> {
        self.admin.get(role_id).await?;
        self.remember(scope, &role_key(role_id, key), value, ttl_override).await
    }

    /// Live memories owned by `role_id`, in `scope` or across every tier.
    ///
    /// Tiers are listed session, user, knowledge; entries within a tier are
    /// sorted by key. Keys are returned as stored, role prefix included.
    pub async fn list_for_role(
        &self,
        role_id: &str,
        scope: Option<MemoryScope>,
    ) -> Result<Vec<MemoryEntry>> {
        check_owner(role_id)?;
        let scopes = match scope {
            Some(scope) => vec![scope],
            None => MemoryScope::ALL.to_vec(),
        };
        let mut owned = Vec::new();
        for scope in scopes {
            owned.extend(
                self.store
                    .list(scope)
                    .await?
                    .into_iter()
                    .filter(|entry| strip_role_key(role_id, &entry.key).is_some()),
            );
        }
        Ok(owned)
    }

    /// Delete every live memory owned by `role_id`. Works for removed roles
    /// too, so their leftovers can be cleared.
    pub async fn flush_role(&self, role_id: &str) -> Result<usize> {
        let owned = self.list_for_role(role_id, None).await?;
        for entry in &owned {
            self.store.delete(entry.scope, &entry.key).await?;
        }
        info!(role = %role_id, removed = owned.len(), "Role memories flushed");
        Ok(owned.len())
    }

    pub async fn resolve(&self, role_id: &str, keys: &ScopeKeys) -> Result<ResolvedContext> {
        self.resolver.resolve(role_id, keys).await
    }

    /// Resolve and compose the system prompt for `role_id`.
    pub async fn compose(&self, role_id: &str, keys: &ScopeKeys) -> Result<String> {
        let (_, prompt) = self.resolver.prompt_for(role_id, keys, &self.composer).await?;
        Ok(prompt)
    }

    /// Start the background sweeper at the configured interval.
    pub fn start_sweeper(&self) -> SweeperHandle {
        Sweeper::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.config.sweep_interval(),
        )
        .with_events(Arc::clone(&self.events))
        .spawn()
    }
}

fn check_owner(role_id: &str) -> Result<()> {
    if role_id.is_empty() || role_id.contains(ROLE_KEY_SEPARATOR) {
        return Err(RegistryError::Validation(format!("'{role_id}' is not a valid role id")).into());
    }
    Ok(())
}
