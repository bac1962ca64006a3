//! Role registry — persona definitions selectable per request.
//!
//! A role bundles a base system prompt, domain tags and a preferred tone.
//! Every role's tone must resolve in the [`ToneCatalog`] at the moment it is
//! registered; the registry rejects anything else.
//!
//! Re-registering an existing id is a [`RegistryError::Conflict`] unless the
//! caller asks for an explicit replace. A replaced role keeps its slot in the
//! listing order and its default flag.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::tone::ToneCatalog;

/// Separates the owning role id from the key in a role-owned memory key.
pub const ROLE_KEY_SEPARATOR: char = '/';

/// Memory key under which `role_id` owns `key`, e.g. `life-coach/goal`.
pub fn role_key(role_id: &str, key: &str) -> String {
    format!("{role_id}{ROLE_KEY_SEPARATOR}{key}")
}

/// The role-relative part of `key` when `role_id` owns it.
pub fn strip_role_key<'a>(role_id: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(role_id)?.strip_prefix(ROLE_KEY_SEPARATOR)
}

/// A persona definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier (e.g. "financial-advisor")
    pub id: String,

    /// Display name
    pub name: String,

    /// What the role is for
    #[serde(default)]
    pub description: String,

    /// Short behavioural instructions
    #[serde(default)]
    pub instructions: String,

    /// Domain tags used for filtering; deduplicated and kept sorted
    #[serde(default)]
    pub domains: BTreeSet<String>,

    /// Tone profile id; must exist in the tone catalog
    pub tone: String,

    /// Base system prompt
    pub system_prompt: String,

    /// Whether this role ships with the service
    #[serde(default)]
    pub is_default: bool,
}

impl Role {
    /// Structural checks that don't need the catalog.
    fn check_shape(&self) -> Result<(), RegistryError> {
        if self.id.trim().is_empty() {
            return Err(RegistryError::Validation("role id must not be empty".into()));
        }
        if self.id.contains(ROLE_KEY_SEPARATOR) {
            return Err(RegistryError::Validation(format!(
                "role id '{}' must not contain '{ROLE_KEY_SEPARATOR}'",
                self.id
            )));
        }
        if self.system_prompt.trim().is_empty() {
            return Err(RegistryError::Validation(format!(
                "role '{}' has an empty system prompt",
                self.id
            )));
        }
        Ok(())
    }

    pub fn has_domain(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }
}

/// Partial update for an existing role. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Filter for [`RoleRegistry::list`]. Both criteria must match when set.
#[derive(Debug, Clone, Default)]
pub struct RoleFilter {
    pub domain: Option<String>,
    pub tone: Option<String>,
}

impl RoleFilter {
    pub fn domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            tone: None,
        }
    }

    pub fn tone(tone: impl Into<String>) -> Self {
        Self {
            domain: None,
            tone: Some(tone.into()),
        }
    }

    fn matches(&self, role: &Role) -> bool {
        let domain_ok = self.domain.as_deref().is_none_or(|d| role.has_domain(d));
        let tone_ok = self.tone.as_deref().is_none_or(|t| role.tone == t);
        domain_ok && tone_ok
    }
}

/// Registry of roles in registration order.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    tones: Arc<ToneCatalog>,
    roles: Vec<Role>,
    index: HashMap<String, usize>,
}

impl RoleRegistry {
    /// Create an empty registry validating against `tones`.
    pub fn new(tones: Arc<ToneCatalog>) -> Self {
        Self {
            tones,
            roles: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create a registry seeded with `defaults`, in order.
    ///
    /// Seeding is all-or-nothing: if any role fails validation the error is
    /// returned and no registry is produced. This is the only path that
    /// honours `is_default`.
    pub fn with_defaults(
        tones: Arc<ToneCatalog>,
        defaults: impl IntoIterator<Item = Role>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new(tones);
        for role in defaults {
            registry.insert(role, false)?;
        }
        info!(roles = registry.len(), "Seeded role registry");
        Ok(registry)
    }

    /// The tone catalog roles are validated against.
    pub fn tones(&self) -> &Arc<ToneCatalog> {
        &self.tones
    }

    /// Register a custom role.
    ///
    /// Fails with `Validation` when the tone is unknown or the role is
    /// malformed, and with `Conflict` when the id exists and `replace` is
    /// false. On failure the registry is unchanged. The caller's
    /// `is_default` is ignored: new roles are custom, replaced roles keep
    /// their flag.
    pub fn register(&mut self, role: Role, replace: bool) -> Result<(), RegistryError> {
        self.insert(
            Role {
                is_default: false,
                ..role
            },
            replace,
        )
    }

    fn insert(&mut self, role: Role, replace: bool) -> Result<(), RegistryError> {
        role.check_shape()?;
        if !self.tones.contains(&role.tone) {
            return Err(RegistryError::Validation(format!(
                "role '{}' references unknown tone '{}'",
                role.id, role.tone
            )));
        }

        match self.index.get(&role.id) {
            Some(&slot) if replace => {
                let is_default = self.roles[slot].is_default;
                debug!(role = %role.id, "Replacing role");
                self.roles[slot] = Role { is_default, ..role };
            }
            Some(_) => {
                return Err(RegistryError::Conflict(format!(
                    "role '{}' is already registered",
                    role.id
                )));
            }
            None => {
                info!(role = %role.id, tone = %role.tone, "Registered role");
                self.index.insert(role.id.clone(), self.roles.len());
                self.roles.push(role);
            }
        }
        Ok(())
    }

    /// Apply a partial update and return the updated role.
    pub fn update(&mut self, id: &str, patch: RolePatch) -> Result<Role, RegistryError> {
        let slot = *self
            .index
            .get(id)
            .ok_or_else(|| RegistryError::RoleNotFound(id.to_string()))?;

        let mut updated = self.roles[slot].clone();
        if let Some(name) = patch.name {
            updated.name = name;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(instructions) = patch.instructions {
            updated.instructions = instructions;
        }
        if let Some(domains) = patch.domains {
            updated.domains = domains;
        }
        if let Some(tone) = patch.tone {
            updated.tone = tone;
        }
        if let Some(system_prompt) = patch.system_prompt {
            updated.system_prompt = system_prompt;
        }

        self.insert(updated.clone(), true)?;
        Ok(updated)
    }

    /// Remove a custom role. Default roles cannot be removed.
    pub fn remove(&mut self, id: &str) -> Result<Role, RegistryError> {
        let slot = *self
            .index
            .get(id)
            .ok_or_else(|| RegistryError::RoleNotFound(id.to_string()))?;
        if self.roles[slot].is_default {
            return Err(RegistryError::Validation(format!(
                "default role '{id}' cannot be removed"
            )));
        }

        let removed = self.roles.remove(slot);
        self.reindex();
        info!(role = %id, "Removed role");
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Result<&Role, RegistryError> {
        self.index
            .get(id)
            .map(|&slot| &self.roles[slot])
            .ok_or_else(|| RegistryError::RoleNotFound(id.to_string()))
    }

    /// Roles matching `filter`, in registration order.
    pub fn list(&self, filter: &RoleFilter) -> Vec<&Role> {
        self.roles.iter().filter(|r| filter.matches(r)).collect()
    }

    /// Roles shipped with the service.
    pub fn default_roles(&self) -> Vec<&Role> {
        self.roles.iter().filter(|r| r.is_default).collect()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .roles
            .iter()
            .enumerate()
            .map(|(slot, role)| (role.id.clone(), slot))
            .collect();
    }
}
