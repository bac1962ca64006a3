pub mod compose;
pub mod config_cmd;
pub mod roles;
pub mod tones;

use std::sync::Arc;

use rolectx_config::{AppConfig, BackendKind};
use rolectx_context::ContextService;
use rolectx_core::clock::{Clock, SystemClock};
use rolectx_memory::TieredMemoryStore;
use tracing::warn;

/// Build a service over in-process tiers.
///
/// The CLI never talks to an external backend; one is only noted.
pub fn local_service(config: &AppConfig) -> Result<ContextService, Box<dyn std::error::Error>> {
    if let BackendKind::External(backend) = config.backend_kind() {
        warn!(
            backend = backend.name(),
            "External memory backend configured; the CLI uses in-process tiers"
        );
    }
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(TieredMemoryStore::new(config.tier_ttls(), Arc::clone(&clock)));
    Ok(ContextService::with_store(config.clone(), clock, store)?)
}
