//! # rolectx core
//!
//! Domain types, traits, and error definitions for the role-specific context
//! service. Everything else in the workspace depends inward on this crate.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined here as a type or trait; implementations live in
//! their respective crates. This enables:
//! - Swapping the memory backend at startup
//! - Testing with simulated clocks and scripted stores
//! - A clean dependency graph

pub mod error;
pub mod clock;
pub mod tone;
pub mod role;
pub mod memory;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, RegistryError, Result};
pub use clock::{Clock, ManualClock, SystemClock};
pub use tone::{ToneCatalog, ToneProfile};
pub use role::{role_key, Role, RoleFilter, RolePatch, RoleRegistry};
pub use memory::{MemoryEntry, MemoryScope, MemoryStore, MemoryValue, TierTtls};
pub use event::{DomainEvent, EventBus};
