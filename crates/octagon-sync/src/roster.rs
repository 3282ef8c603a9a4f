//! Roster-sourced fighter sync.
//!
//! Fighters are matched on the exact (first name, last name) pair and merged
//! with [`UpdatePolicy::FillMissingOnly`]; the roster never overwrites a field
//! the store already knows.

use std::sync::Arc;
use std::time::Duration;

use octagon_adapters::extract::FightRecord;
use octagon_adapters::{AthleteDetails, RosterAthlete, RosterSource};
use octagon_core::{
    ExternalIds, Fighter, FighterPatch, NewFighter, NewOrganization, Organization,
    OrganizationLevel, OrganizationPatch, Stance, UNKNOWN,
};
use octagon_storage::{Field, Predicate, Store, StoreError};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::policy::{localize_weight_class, UpdatePolicy};

pub const RECORD_BATCH_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSyncResult {
    pub success: bool,
    pub fighters_added: usize,
    pub fighters_updated: usize,
    pub errors: Vec<String>,
}

impl Default for RosterSyncResult {
    fn default() -> Self {
        Self {
            success: true,
            fighters_added: 0,
            fighters_updated: 0,
            errors: Vec::new(),
        }
    }
}

impl RosterSyncResult {
    fn failed(&mut self, message: String) {
        error!("{message}");
        self.success = false;
        self.errors.push(message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reconciled {
    Added,
    Updated,
    Unchanged,
}

pub struct RosterSyncService {
    store: Arc<dyn Store>,
    source: Arc<dyn RosterSource>,
    detail_delay: Duration,
    slug_delay: Duration,
    batch_delay: Duration,
}

impl RosterSyncService {
    pub fn new(store: Arc<dyn Store>, source: Arc<dyn RosterSource>) -> Self {
        Self {
            store,
            source,
            detail_delay: Duration::from_millis(100),
            slug_delay: Duration::from_millis(200),
            batch_delay: Duration::from_millis(100),
        }
    }

    /// Every sitemap athlete as a name stub, with record and division from the
    /// roster listing where it has them.
    pub async fn sync_full_roster(&self) -> RosterSyncResult {
        info!(provider = self.source.provider_name(), "starting full roster sync");
        let mut result = RosterSyncResult::default();
        if let Err(err) = self.full_roster(&mut result).await {
            result.failed(format!("Full roster sync failed: {err}"));
        }
        log_summary("full roster sync", &result);
        result
    }

    pub async fn sync_top_fighters(&self) -> RosterSyncResult {
        info!(provider = self.source.provider_name(), "starting top fighters sync");
        let mut result = RosterSyncResult::default();
        if let Err(err) = self.top_fighters(&mut result).await {
            result.failed(format!("Top fighters sync failed: {err}"));
        }
        log_summary("top fighters sync", &result);
        result
    }

    /// Detail-enriched sync of an explicit slug list.
    pub async fn sync_fighters_by_slug(&self, slugs: &[String]) -> RosterSyncResult {
        info!(count = slugs.len(), "starting slug sync");
        let mut result = RosterSyncResult::default();
        if let Err(err) = self.fighters_by_slug(slugs, &mut result).await {
            result.failed(format!("Slug sync failed: {err}"));
        }
        log_summary("slug sync", &result);
        result
    }

    /// Refreshes win/loss/draw counts of every fighter carrying a roster slug.
    pub async fn update_all_records(&self) -> RosterSyncResult {
        let mut result = RosterSyncResult::default();
        if let Err(err) = self.all_records(&mut result).await {
            result.failed(format!("Records update failed: {err}"));
        }
        log_summary("records update", &result);
        result
    }

    async fn full_roster(&self, result: &mut RosterSyncResult) -> Result<(), StoreError> {
        self.ensure_default_organization().await?;
        let mut athletes = self.source.fetch_all_athletes().await;
        let listings = self.source.fetch_listing_records().await;
        info!(athletes = athletes.len(), listed = listings.len(), "roster fetched");
        for athlete in &mut athletes {
            if let Some(listing) = listings.get(&athlete.slug) {
                athlete.record = listing.record;
                if let Some(weight_class) = &listing.weight_class {
                    athlete.weight_class = weight_class.clone();
                }
            }
            self.reconcile(athlete, result).await?;
        }
        Ok(())
    }

    async fn top_fighters(&self, result: &mut RosterSyncResult) -> Result<(), StoreError> {
        self.ensure_default_organization().await?;
        let athletes = self.source.fetch_top_athletes().await;
        info!(athletes = athletes.len(), "top fighters fetched");
        for (index, mut athlete) in athletes.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.detail_delay).await;
            }
            match self.source.fetch_athlete_details(&athlete.slug).await {
                Some(details) => athlete.enrich(&details),
                None => debug!(slug = %athlete.slug, "no details; syncing stub"),
            }
            self.reconcile(&athlete, result).await?;
        }
        Ok(())
    }

    async fn fighters_by_slug(&self, slugs: &[String], result: &mut RosterSyncResult) -> Result<(), StoreError> {
        self.ensure_default_organization().await?;
        for (index, slug) in slugs.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.slug_delay).await;
            }
            let Some(mut athlete) = RosterAthlete::stub(slug) else {
                result.errors.push(format!("Could not parse a name from slug {slug}"));
                continue;
            };
            let Some(details) = self.source.fetch_athlete_details(slug).await else {
                result.errors.push(format!("Could not fetch details for {slug}"));
                continue;
            };
            athlete.enrich(&details);
            self.reconcile(&athlete, result).await?;
        }
        Ok(())
    }

    async fn all_records(&self, result: &mut RosterSyncResult) -> Result<(), StoreError> {
        let provider = self.source.provider_name();
        let fighters = self
            .store
            .list_fighters(Some(&Predicate::HasExternalId(provider.to_string())))
            .await?;
        info!(fighters = fighters.len(), batch_size = RECORD_BATCH_SIZE, "refreshing records");

        for (index, batch) in fighters.chunks(RECORD_BATCH_SIZE).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }
            let mut window = JoinSet::new();
            for fighter in batch {
                let store = Arc::clone(&self.store);
                let source = Arc::clone(&self.source);
                let fighter = fighter.clone();
                window.spawn(async move { refresh_record(store, source, fighter).await });
            }
            while let Some(joined) = window.join_next().await {
                match joined {
                    Ok(Ok(true)) => result.fighters_updated += 1,
                    Ok(Ok(false)) => {}
                    Ok(Err(err)) => warn!(error = %err, "record refresh failed"),
                    Err(err) => warn!(error = %err, "record refresh task aborted"),
                }
            }
            debug!(batch = index, updated = result.fighters_updated, "record batch done");
        }
        Ok(())
    }

    /// Item failures are recorded; fatal store errors are returned.
    async fn reconcile(&self, athlete: &RosterAthlete, result: &mut RosterSyncResult) -> Result<(), StoreError> {
        match self.upsert_athlete(athlete).await {
            Ok(Reconciled::Added) => result.fighters_added += 1,
            Ok(Reconciled::Updated) => result.fighters_updated += 1,
            Ok(Reconciled::Unchanged) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(slug = %athlete.slug, error = %err, "roster athlete failed");
                result.errors.push(format!(
                    "Error processing {} {}: {err}",
                    athlete.first_name, athlete.last_name
                ));
            }
        }
        Ok(())
    }

    async fn upsert_athlete(&self, athlete: &RosterAthlete) -> Result<Reconciled, StoreError> {
        let provider = self.source.provider_name();
        let incoming = athlete_fighter(provider, athlete);
        let pred = Predicate::all([
            Predicate::text(Field::FirstName, incoming.first_name.as_str()),
            Predicate::text(Field::LastName, incoming.last_name.as_str()),
        ]);

        match self.store.find_fighter(&pred).await? {
            Some(existing) => {
                let patch = UpdatePolicy::FillMissingOnly.fighter_patch(&incoming, Some(&existing));
                let changes_fields = !patch.is_fields_empty();
                let knows_slug = existing.external_ids.get(provider) == Some(athlete.slug.as_str());
                if !changes_fields && knows_slug {
                    return Ok(Reconciled::Unchanged);
                }
                self.store.update_fighter(existing.id, patch).await?;
                Ok(if changes_fields {
                    Reconciled::Updated
                } else {
                    Reconciled::Unchanged
                })
            }
            None => {
                let update = FighterPatch {
                    external_ids: incoming.external_ids.clone(),
                    ..FighterPatch::default()
                };
                let upserted = self.store.upsert_fighter(&pred, incoming, update).await?;
                Ok(if upserted.created {
                    Reconciled::Added
                } else {
                    Reconciled::Unchanged
                })
            }
        }
    }

    async fn ensure_default_organization(&self) -> Result<Organization, StoreError> {
        let pred = Predicate::text(Field::ShortName, "UFC");
        if let Some(org) = self.store.find_organization(&pred).await? {
            return Ok(org);
        }
        info!("creating default organization UFC");
        let create = NewOrganization {
            name: "Ultimate Fighting Championship".to_string(),
            short_name: "UFC".to_string(),
            country: "USA".to_string(),
            city: Some("Las Vegas".to_string()),
            website_url: Some("https://www.ufc.com".to_string()),
            logo_url: None,
            level: OrganizationLevel::Major,
            external_ids: ExternalIds::new(),
        };
        let upserted = self
            .store
            .upsert_organization(&pred, create, OrganizationPatch::default())
            .await?;
        Ok(upserted.record)
    }
}

async fn refresh_record(
    store: Arc<dyn Store>,
    source: Arc<dyn RosterSource>,
    fighter: Fighter,
) -> Result<bool, StoreError> {
    let Some(slug) = fighter.external_ids.get(source.provider_name()) else {
        return Ok(false);
    };
    let Some(details) = source.fetch_athlete_details(slug).await else {
        debug!(%slug, "no profile for record refresh");
        return Ok(false);
    };
    let Some(patch) = record_patch(&details) else {
        return Ok(false);
    };
    store.update_fighter(fighter.id, patch).await?;
    Ok(true)
}

/// Profile values overwrite the stored ones; `None` when the profile has no record.
fn record_patch(details: &AthleteDetails) -> Option<FighterPatch> {
    let FightRecord { wins, losses, draws } = details.record?;
    let known = |value: &Option<String>| value.clone().filter(|v| v != UNKNOWN);
    Some(FighterPatch {
        pro_wins: Some(wins),
        pro_losses: Some(losses),
        pro_draws: Some(draws),
        weight_class: known(&details.weight_class).map(|w| localize_weight_class(&w)),
        country: known(&details.country),
        image_url: details.image_url.clone().map(Some),
        ..FighterPatch::default()
    })
}

fn athlete_fighter(provider: &str, athlete: &RosterAthlete) -> NewFighter {
    NewFighter {
        first_name: athlete.first_name.clone(),
        last_name: athlete.last_name.clone(),
        nickname: athlete.nickname.clone(),
        country: athlete.country.clone(),
        city: None,
        team: None,
        height_cm: None,
        reach_cm: None,
        stance: Stance::Unknown,
        weight_class: localize_weight_class(&athlete.weight_class),
        is_pro: true,
        image_url: athlete.image_url.clone(),
        pro_wins: athlete.record.wins,
        pro_losses: athlete.record.losses,
        pro_draws: athlete.record.draws,
        pro_no_contests: 0,
        external_ids: ExternalIds::single(provider, athlete.slug.as_str()),
    }
}

fn log_summary(label: &str, result: &RosterSyncResult) {
    info!(
        success = result.success,
        added = result.fighters_added,
        updated = result.fighters_updated,
        errors = result.errors.len(),
        "{label} completed"
    );
}
