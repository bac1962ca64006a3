//! Memory tier implementations for rolectx.

pub mod in_memory;
pub mod deadline;
pub mod sweeper;

pub use in_memory::TieredMemoryStore;
pub use deadline::DeadlineStore;
pub use sweeper::{Sweeper, SweeperHandle};

use std::sync::Arc;
use std::time::Duration;

use rolectx_config::{AppConfig, BackendKind};
use rolectx_core::clock::Clock;
use rolectx_core::error::MemoryError;
use rolectx_core::memory::{MemoryStore, TierTtls};
use tracing::info;

/// Pick the memory store for `kind`.
///
/// `InProcess` builds a [`TieredMemoryStore`]. `External` wraps the supplied
/// adapter in a [`DeadlineStore`]; without an adapter the configured backend
/// cannot be reached and selection fails rather than silently degrading.
pub fn select_store(
    kind: &BackendKind,
    ttls: TierTtls,
    clock: Arc<dyn Clock>,
    external: Option<Arc<dyn MemoryStore>>,
    deadline: Duration,
) -> Result<Arc<dyn MemoryStore>, MemoryError> {
    match kind {
        BackendKind::InProcess => {
            info!("Using in-process memory tiers");
            Ok(Arc::new(TieredMemoryStore::new(ttls, clock)))
        }
        BackendKind::External(backend) => match external {
            Some(adapter) => {
                info!(
                    backend = backend.name(),
                    adapter = %adapter.name(),
                    deadline_ms = deadline.as_millis() as u64,
                    "Using external memory backend"
                );
                Ok(Arc::new(DeadlineStore::new(adapter, deadline)))
            }
            None => Err(MemoryError::BackendUnavailable(format!(
                "{} backend is configured but no adapter was provided",
                backend.name()
            ))),
        },
    }
}

/// [`select_store`] driven by the loaded configuration.
pub fn store_from_config(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
    external: Option<Arc<dyn MemoryStore>>,
) -> Result<Arc<dyn MemoryStore>, MemoryError> {
    select_store(
        &config.backend_kind(),
        config.tier_ttls(),
        clock,
        external,
        config.backend_timeout(),
    )
}
