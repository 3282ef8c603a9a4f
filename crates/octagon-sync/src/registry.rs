//! `providers.yaml`: which event providers a sync run drives, in order.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use octagon_adapters::{
    MmaProvider, SourceKind, SportsDataIoProvider, TheSportsDbProvider, UfcScraperProvider,
};
use octagon_storage::HttpFetcher;
use serde::Deserialize;
use tokio::fs;
use tracing::{info, warn};

use crate::SyncConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderRegistry {
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub provider_id: String,
    pub enabled: bool,
    pub kind: SourceKind,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self {
            providers: vec![ProviderConfig {
                provider_id: "ufc".to_string(),
                enabled: true,
                kind: SourceKind::HtmlScrape,
                base_url: None,
                notes: None,
            }],
        }
    }
}

impl ProviderRegistry {
    /// Reads the registry; a missing file yields the default (UFC scraper only).
    pub async fn load(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            info!(path = %path.display(), "no provider registry file; using default providers");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let registry: Self = serde_yaml::from_str(text)?;
        Ok(registry)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }

    pub fn build(&self, http: Arc<HttpFetcher>, config: &SyncConfig) -> Result<Vec<Arc<dyn MmaProvider>>> {
        let providers = self
            .enabled()
            .map(|entry| provider_for_entry(entry, Arc::clone(&http), config))
            .collect::<Result<Vec<_>>>()?;
        if providers.is_empty() {
            bail!("provider registry enables no providers");
        }
        Ok(providers)
    }
}

pub fn provider_for_entry(
    entry: &ProviderConfig,
    http: Arc<HttpFetcher>,
    config: &SyncConfig,
) -> Result<Arc<dyn MmaProvider>> {
    let provider: Arc<dyn MmaProvider> = match entry.provider_id.as_str() {
        "ufc" => match &entry.base_url {
            Some(base) => Arc::new(UfcScraperProvider::with_base_url(http, base.as_str())),
            None => Arc::new(UfcScraperProvider::new(http)),
        },
        "thesportsdb" => match &entry.base_url {
            Some(base) => Arc::new(TheSportsDbProvider::with_base_url(http, base.as_str())),
            None => Arc::new(TheSportsDbProvider::new(http)),
        },
        "sportsdataio" => {
            let mut api = config.sportsdataio_config();
            if let Some(base) = &entry.base_url {
                api.base_url = base.clone();
            }
            Arc::new(SportsDataIoProvider::new(http, api))
        }
        other => bail!("no provider registered for {other}"),
    };
    if provider.source_kind() != entry.kind {
        warn!(
            provider_id = %entry.provider_id,
            declared = ?entry.kind,
            actual = ?provider.source_kind(),
            "provider kind in registry does not match adapter"
        );
    }
    Ok(provider)
}
