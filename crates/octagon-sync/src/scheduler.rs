use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::{MmaSyncService, SyncConfig, SyncResult};

/// Cron-driven `sync_all`, or `None` when the scheduler is disabled.
///
/// Runs are not coordinated: a scheduled run may overlap a manual one.
pub async fn maybe_build_scheduler(
    config: &SyncConfig,
    sync: Arc<MmaSyncService>,
) -> Result<Option<JobScheduler>> {
    if !config.scheduler_enabled {
        return Ok(None);
    }

    let sched = JobScheduler::new().await.context("creating scheduler")?;
    let cron = config.sync_cron.as_str();
    let job = Job::new_async(cron, move |_uuid, _l| {
        let sync = Arc::clone(&sync);
        Box::pin(async move {
            info!("scheduled sync triggered");
            let result = sync.sync_all().await;
            info!(success = result.success, errors = result.errors.len(), "scheduled sync finished");
        })
    })
    .with_context(|| format!("creating scheduler job for cron {cron}"))?;
    sched.add(job).await.context("adding scheduler job")?;
    Ok(Some(sched))
}

/// Background `sync_all` when `SYNC_ON_STARTUP` is set.
pub fn spawn_startup_sync(config: &SyncConfig, sync: Arc<MmaSyncService>) -> Option<JoinHandle<SyncResult>> {
    if !config.sync_on_startup {
        return None;
    }
    info!("starting startup sync in the background");
    Some(tokio::spawn(async move { sync.sync_all().await }))
}

#[cfg(test)]
mod tests {
    use octagon_adapters::MmaProvider;
    use octagon_storage::MemoryStore;

    use super::*;
    use crate::testing::StaticProvider;

    fn sync() -> Arc<MmaSyncService> {
        let provider = Arc::new(StaticProvider::new("UFC"));
        Arc::new(MmaSyncService::new(Arc::new(MemoryStore::new()), vec![provider as Arc<dyn MmaProvider>]))
    }

    #[tokio::test]
    async fn disabled_scheduler_is_none() {
        let config = SyncConfig::default();
        assert!(maybe_build_scheduler(&config, sync()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_cron_is_rejected() {
        let config = SyncConfig {
            scheduler_enabled: true,
            sync_cron: "every six hours".into(),
            ..SyncConfig::default()
        };
        let err = maybe_build_scheduler(&config, sync()).await.err().unwrap();
        assert!(err.to_string().contains("every six hours"));
    }

    #[tokio::test]
    async fn startup_sync_runs_when_enabled() {
        let config = SyncConfig::default();
        let handle = spawn_startup_sync(&config, sync()).unwrap();
        assert!(handle.await.unwrap().success);

        let config = SyncConfig {
            sync_on_startup: false,
            ..SyncConfig::default()
        };
        assert!(spawn_startup_sync(&config, sync()).is_none());
    }
}
