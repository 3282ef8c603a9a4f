//! Sync orchestration: reconcile provider observations into the store.
//!
//! Both services always return a report. Per-item failures land in the
//! report's `errors`; only a fatal store error ends a stage early, and
//! [`MmaSyncService::sync_all`] then skips the stages that remain.

use std::sync::Arc;

use anyhow::Result;
use octagon_adapters::{AdapterError, UfcRosterScraper};
use octagon_storage::{HttpFetcher, Store, StoreError};
use thiserror::Error;

pub mod config;
pub mod mma;
pub mod policy;
pub mod registry;
pub mod roster;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SyncConfig;
pub use mma::{MmaSyncService, SyncResult};
pub use policy::{localize_weight_class, UpdatePolicy};
pub use registry::{ProviderConfig, ProviderRegistry};
pub use roster::{RosterSyncResult, RosterSyncService};
pub use scheduler::{maybe_build_scheduler, spawn_startup_sync};

pub const CRATE_NAME: &str = "octagon-sync";
pub const DEFAULT_PAST_EVENTS_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl SyncError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_fatal())
    }
}

/// Both orchestrators wired to one store and one shared HTTP fetcher.
#[derive(Clone)]
pub struct SyncServices {
    pub mma: Arc<MmaSyncService>,
    pub roster: Arc<RosterSyncService>,
}

impl SyncServices {
    pub fn new(mma: MmaSyncService, roster: RosterSyncService) -> Self {
        Self {
            mma: Arc::new(mma),
            roster: Arc::new(roster),
        }
    }

    pub async fn from_config(config: &SyncConfig, store: Arc<dyn Store>) -> Result<Self> {
        let http = Arc::new(HttpFetcher::new(config.http_client_config())?);
        let registry = ProviderRegistry::load(&config.providers_file).await?;
        let providers = registry.build(Arc::clone(&http), config)?;
        let mma = MmaSyncService::new(Arc::clone(&store), providers)
            .with_past_events_limit(config.past_events_limit);
        let roster = RosterSyncService::new(store, Arc::new(UfcRosterScraper::new(http)));
        Ok(Self::new(mma, roster))
    }
}
