//! Tone catalog — reusable style modifiers layered over a role's prompt.

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// A named speaking style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneProfile {
    /// Unique identifier (e.g. "professional")
    pub id: String,

    /// Short human-readable description
    pub description: String,

    /// Style instructions appended to the system prompt
    pub modifiers: String,
}

impl ToneProfile {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        modifiers: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            modifiers: modifiers.into(),
        }
    }
}

/// Read-mostly catalog of tone profiles, kept in load order.
#[derive(Debug, Clone, Default)]
pub struct ToneCatalog {
    profiles: Vec<ToneProfile>,
}

impl ToneCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a seed list. Fails on the first duplicate or
    /// blank id, leaving nothing half-built.
    pub fn from_profiles(
        profiles: impl IntoIterator<Item = ToneProfile>,
    ) -> Result<Self, RegistryError> {
        let mut catalog = Self::new();
        for profile in profiles {
            catalog.register(profile)?;
        }
        Ok(catalog)
    }

    /// Add a profile. Duplicate ids are a `Conflict`.
    pub fn register(&mut self, profile: ToneProfile) -> Result<(), RegistryError> {
        if profile.id.trim().is_empty() {
            return Err(RegistryError::Validation("tone id must not be empty".into()));
        }
        if self.contains(&profile.id) {
            return Err(RegistryError::Conflict(format!(
                "tone '{}' already exists",
                profile.id
            )));
        }
        self.profiles.push(profile);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&ToneProfile, RegistryError> {
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| RegistryError::ToneNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.iter().any(|p| p.id == id)
    }

    pub fn list(&self) -> &[ToneProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
