//! # rolectx context
//!
//! Turns a role id and a set of memory keys into a system prompt:
//! [`ContextResolver`] gathers the role, its tone and the live memories in
//! knowledge → user → session order, and [`PromptComposer`] renders them.
//! [`ContextService`] wires both to a seeded registry and a memory store.

pub mod admin;
pub mod composer;
pub mod resolver;
pub mod service;

pub use admin::RoleAdmin;
pub use composer::{compose, PromptComposer};
pub use resolver::{
    ContextResolver, MemoryRef, ResolvedContext, ResolvedMemory, ScopeKeys, SharedRoleRegistry,
    RESOLVE_ORDER,
};
pub use service::ContextService;
