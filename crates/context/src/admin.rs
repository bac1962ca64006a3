//! Role administration over the shared registry.
//!
//! Wraps [`RoleRegistry`] behind an async `RwLock` so the resolver can keep
//! reading while roles are created, patched or removed, and publishes
//! registry changes on the event bus.

use std::sync::Arc;

use rolectx_core::clock::{Clock, SystemClock};
use rolectx_core::error::Result;
use rolectx_core::event::{DomainEvent, EventBus};
use rolectx_core::role::{Role, RoleFilter, RolePatch, RoleRegistry};
use rolectx_core::tone::ToneProfile;
use tokio::sync::RwLock;
use tracing::info;

use crate::resolver::SharedRoleRegistry;

#[derive(Clone)]
pub struct RoleAdmin {
    registry: SharedRoleRegistry,
    clock: Arc<dyn Clock>,
    events: Option<Arc<EventBus>>,
}

impl RoleAdmin {
    pub fn new(registry: SharedRoleRegistry) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock),
            events: None,
        }
    }

    pub fn from_registry(registry: RoleRegistry) -> Self {
        Self::new(Arc::new(RwLock::new(registry)))
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The shared handle, for wiring a resolver to the same registry.
    pub fn registry(&self) -> SharedRoleRegistry {
        Arc::clone(&self.registry)
    }

    pub async fn register(&self, role: Role, replace: bool) -> Result<()> {
        let role_id = role.id.clone();
        let replaced = {
            let mut registry = self.registry.write().await;
            let existed = registry.get(&role_id).is_ok();
            registry.register(role, replace)?;
            existed
        };
        info!(role = %role_id, replaced = replaced, "Role registered");
        self.publish(DomainEvent::RoleRegistered {
            role_id,
            replaced,
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    pub async fn update(&self, id: &str, patch: RolePatch) -> Result<Role> {
        let role = self.registry.write().await.update(id, patch)?;
        self.publish(DomainEvent::RoleRegistered {
            role_id: role.id.clone(),
            replaced: true,
            timestamp: self.clock.now(),
        });
        Ok(role)
    }

    pub async fn remove(&self, id: &str) -> Result<Role> {
        let role = self.registry.write().await.remove(id)?;
        info!(role = %id, "Role removed");
        self.publish(DomainEvent::RoleRemoved {
            role_id: role.id.clone(),
            timestamp: self.clock.now(),
        });
        Ok(role)
    }

    pub async fn get(&self, id: &str) -> Result<Role> {
        Ok(self.registry.read().await.get(id)?.clone())
    }

    /// Matching roles in registration order.
    pub async fn list(&self, filter: &RoleFilter) -> Vec<Role> {
        self.registry
            .read()
            .await
            .list(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn tones(&self) -> Vec<ToneProfile> {
        self.registry.read().await.tones().list().to_vec()
    }

    pub async fn tone(&self, id: &str) -> Result<ToneProfile> {
        Ok(self.registry.read().await.tones().get(id)?.clone())
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rolectx_config::seed;
    use rolectx_core::clock::ManualClock;
    use rolectx_core::error::{Error, RegistryError};
    use rolectx_core::tone::ToneCatalog;
    use std::collections::BTreeSet;

    fn admin() -> (RoleAdmin, tokio::sync::broadcast::Receiver<Arc<DomainEvent>>) {
        let tones = Arc::new(ToneCatalog::from_profiles(seed::default_tones()).unwrap());
        let registry = RoleRegistry::with_defaults(tones, seed::default_roles()).unwrap();
        let events = Arc::new(EventBus::new(16));
        let rx = events.subscribe();
        (RoleAdmin::from_registry(registry).with_events(events), rx)
    }

    fn tutor() -> Role {
        Role {
            id: "tutor".into(),
            name: "Tutor".into(),
            description: "Explains things patiently".into(),
            instructions: String::new(),
            domains: BTreeSet::from(["education".to_string()]),
            tone: "technical".into(),
            system_prompt: "You are a patient tutor.".into(),
            is_default: false,
        }
    }

    #[tokio::test]
    async fn register_then_list_by_domain() {
        let (admin, mut rx) = admin();
        admin.register(tutor(), false).await.unwrap();

        let found = admin.list(&RoleFilter::domain("education")).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "tutor");
        assert_eq!(admin.list(&RoleFilter::default()).await.len(), 4);

        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::RoleRegistered { role_id, replaced, .. } => {
                assert_eq!(role_id, "tutor");
                assert!(!replaced);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_register_conflicts_without_event() {
        let (admin, mut rx) = admin();
        admin.register(tutor(), false).await.unwrap();
        let _ = rx.recv().await.unwrap();

        let err = admin.register(tutor(), false).await.unwrap_err();
        assert!(matches!(err, Error::Registry(RegistryError::Conflict(_))));
        assert!(rx.try_recv().is_err());

        admin.register(tutor(), true).await.unwrap();
        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::RoleRegistered { replaced, .. } => assert!(*replaced),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_and_remove_custom_role() {
        let (admin, mut rx) = admin();
        admin.register(tutor(), false).await.unwrap();

        let patched = admin
            .update(
                "tutor",
                RolePatch {
                    tone: Some("witty".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.tone, "witty");
        assert_eq!(admin.get("tutor").await.unwrap().tone, "witty");

        admin.remove("tutor").await.unwrap();
        assert!(admin.get("tutor").await.unwrap_err().is_not_found());

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event.as_ref() {
                DomainEvent::RoleRegistered { .. } => "registered",
                DomainEvent::RoleRemoved { .. } => "removed",
                _ => "other",
            });
        }
        assert_eq!(kinds, vec!["registered", "registered", "removed"]);
    }

    #[tokio::test]
    async fn registered_role_is_never_a_default() {
        let (admin, _rx) = admin();
        let squatter = Role {
            id: "squatter".into(),
            is_default: true,
            ..tutor()
        };
        admin.register(squatter, false).await.unwrap();

        assert!(!admin.get("squatter").await.unwrap().is_default);
        let defaults = admin.registry().read().await.default_roles().len();
        assert_eq!(defaults, 3);
        admin.remove("squatter").await.unwrap();
    }

    #[tokio::test]
    async fn events_are_stamped_with_the_admin_clock() {
        let at = Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap();
        let (admin, mut rx) = admin();
        let admin = admin.with_clock(Arc::new(ManualClock::new(at)));

        admin.register(tutor(), false).await.unwrap();
        admin.remove("tutor").await.unwrap();

        for _ in 0..2 {
            match rx.recv().await.unwrap().as_ref() {
                DomainEvent::RoleRegistered { timestamp, .. }
                | DomainEvent::RoleRemoved { timestamp, .. } => assert_eq!(*timestamp, at),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn default_roles_cannot_be_removed() {
        let (admin, _rx) = admin();
        let err = admin.remove("life-coach").await.unwrap_err();
        assert!(matches!(err, Error::Registry(RegistryError::Validation(_))));
        assert!(admin.get("life-coach").await.is_ok());
    }

    #[tokio::test]
    async fn tones_are_exposed_in_catalog_order() {
        let (admin, _rx) = admin();
        let ids: Vec<String> = admin.tones().await.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["professional", "casual", "technical", "creative", "witty"]);
        assert!(admin.tone("poetic").await.unwrap_err().is_not_found());
    }
}
