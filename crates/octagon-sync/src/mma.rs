//! Event-sourced sync: organizations, upcoming events with their fight cards,
//! and recent past events.

use std::sync::Arc;

use octagon_adapters::{fighter_from_corner, MmaProvider};
use octagon_core::{
    slugify, Event, ExternalEventRecord, ExternalFightRecord, ExternalFighterRecord, ExternalIds,
    ExternalOrganizationRecord, Fighter, FightResultStatus, NewEvent, NewFight, NewFighter,
    NewOrganization, Organization, OrganizationLevel, OrganizationPatch,
};
use octagon_storage::{Field, Predicate, Store};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::policy::UpdatePolicy;
use crate::{SyncError, DEFAULT_PAST_EVENTS_LIMIT};

const UFC_FULL_NAME: &str = "Ultimate Fighting Championship";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub organizations_processed: usize,
    pub events_processed: usize,
    pub fighters_processed: usize,
    pub fights_processed: usize,
    pub errors: Vec<String>,
}

impl Default for SyncResult {
    fn default() -> Self {
        Self {
            success: true,
            organizations_processed: 0,
            events_processed: 0,
            fighters_processed: 0,
            fights_processed: 0,
            errors: Vec::new(),
        }
    }
}

impl SyncResult {
    /// Records a non-fatal item failure; fatal errors are handed back to end the stage.
    fn item_failed(&mut self, context: String, err: SyncError) -> Result<(), SyncError> {
        if err.is_fatal() {
            return Err(err);
        }
        warn!(error = %err, "{context}");
        self.errors.push(format!("{context}: {err}"));
        Ok(())
    }

    fn stage_failed(&mut self, message: String) {
        error!("{message}");
        self.success = false;
        self.errors.push(message);
    }
}

pub struct MmaSyncService {
    store: Arc<dyn Store>,
    providers: Vec<Arc<dyn MmaProvider>>,
    policy: UpdatePolicy,
    past_events_limit: usize,
}

impl MmaSyncService {
    /// Providers are synced in the given order within every stage.
    pub fn new(store: Arc<dyn Store>, providers: Vec<Arc<dyn MmaProvider>>) -> Self {
        Self {
            store,
            providers,
            policy: UpdatePolicy::AuthoritativeOverwrite,
            past_events_limit: DEFAULT_PAST_EVENTS_LIMIT,
        }
    }

    /// Past-event limit used by [`Self::sync_all`].
    pub fn with_past_events_limit(mut self, limit: usize) -> Self {
        self.past_events_limit = limit;
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }

    pub async fn health(&self) -> Vec<(&'static str, bool)> {
        let mut health = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            health.push((provider.provider_name(), provider.health_check().await));
        }
        health
    }

    pub async fn sync_all(&self) -> SyncResult {
        info!(providers = ?self.provider_names(), "starting full sync");
        let mut result = SyncResult::default();
        if let Err(err) = self.run_all_stages(&mut result).await {
            result.stage_failed(format!("Sync failed: {err}"));
        }
        log_summary("full sync", &result);
        result
    }

    pub async fn sync_organizations(&self) -> SyncResult {
        let mut result = SyncResult::default();
        if let Err(err) = self.organizations_stage(&mut result).await {
            result.stage_failed(format!("Failed to sync organizations: {err}"));
        }
        log_summary("organization sync", &result);
        result
    }

    pub async fn sync_upcoming_events(&self) -> SyncResult {
        let mut result = SyncResult::default();
        if let Err(err) = self.upcoming_events_stage(&mut result).await {
            result.stage_failed(format!("Failed to sync upcoming events: {err}"));
        }
        log_summary("upcoming event sync", &result);
        result
    }

    pub async fn sync_past_events(&self, limit: usize) -> SyncResult {
        let mut result = SyncResult::default();
        if let Err(err) = self.past_events_stage(&mut result, limit).await {
            result.stage_failed(format!("Failed to sync past events: {err}"));
        }
        log_summary("past event sync", &result);
        result
    }

    async fn run_all_stages(&self, result: &mut SyncResult) -> Result<(), SyncError> {
        self.organizations_stage(result).await?;
        self.upcoming_events_stage(result).await?;
        self.past_events_stage(result, self.past_events_limit).await
    }

    async fn organizations_stage(&self, result: &mut SyncResult) -> Result<(), SyncError> {
        for provider in &self.providers {
            let provider_name = provider.provider_name();
            let organizations = provider.fetch_organizations().await;
            info!(provider = provider_name, count = organizations.len(), "syncing organizations");
            for record in &organizations {
                match self.upsert_organization(provider_name, record).await {
                    Ok(org) => {
                        result.organizations_processed += 1;
                        debug!(organization = %org.name, id = %org.id, "organization synced");
                    }
                    Err(err) => result.item_failed(
                        format!("Failed to process organization {}", record.name),
                        err,
                    )?,
                }
            }
        }
        Ok(())
    }

    async fn upcoming_events_stage(&self, result: &mut SyncResult) -> Result<(), SyncError> {
        for provider in &self.providers {
            let provider_name = provider.provider_name();
            let events = provider.fetch_upcoming_events().await;
            info!(provider = provider_name, count = events.len(), "syncing upcoming events");
            for record in &events {
                let event = match self.upsert_event(provider_name, record).await {
                    Ok(event) => {
                        result.events_processed += 1;
                        debug!(event = %event.name, slug = %event.slug, "event synced");
                        event
                    }
                    Err(err) => {
                        result.item_failed(format!("Failed to process event {}", record.name), err)?;
                        continue;
                    }
                };
                self.fight_card_stage(provider.as_ref(), &event, record, result).await?;
            }
        }
        Ok(())
    }

    async fn past_events_stage(&self, result: &mut SyncResult, limit: usize) -> Result<(), SyncError> {
        for provider in &self.providers {
            let provider_name = provider.provider_name();
            let events = provider.fetch_past_events(limit).await;
            info!(provider = provider_name, count = events.len(), limit, "syncing past events");
            for record in events.iter().take(limit) {
                match self.upsert_event(provider_name, record).await {
                    Ok(_) => result.events_processed += 1,
                    Err(err) => result.item_failed(
                        format!("Failed to process past event {}", record.name),
                        err,
                    )?,
                }
            }
        }
        Ok(())
    }

    async fn fight_card_stage(
        &self,
        provider: &dyn MmaProvider,
        event: &Event,
        record: &ExternalEventRecord,
        result: &mut SyncResult,
    ) -> Result<(), SyncError> {
        let fights = match provider.fetch_fight_card(&record.external_id).await {
            Ok(fights) => fights,
            Err(err) => {
                return result.item_failed(
                    format!("Failed to fetch fight card for {}", record.name),
                    err.into(),
                )
            }
        };
        debug!(event = %event.name, fights = fights.len(), "syncing fight card");
        for fight in &fights {
            if let Err(err) = self.upsert_fight(provider.provider_name(), event, fight, result).await {
                result.item_failed(
                    format!(
                        "Failed to process fight {} {} vs {} {}",
                        fight.fighter_a.first_name,
                        fight.fighter_a.last_name,
                        fight.fighter_b.first_name,
                        fight.fighter_b.last_name
                    ),
                    err,
                )?;
            }
        }
        Ok(())
    }

    async fn upsert_organization(
        &self,
        provider: &str,
        record: &ExternalOrganizationRecord,
    ) -> Result<Organization, SyncError> {
        let pred = Predicate::any([
            Predicate::text(Field::Name, record.name.as_str()),
            Predicate::text(Field::ShortName, record.short_name.as_str()),
        ]);
        let external_ids = ExternalIds::single(provider, record.external_id.as_str());
        let create = NewOrganization {
            name: record.name.clone(),
            short_name: record.short_name.clone(),
            country: record.country.clone(),
            city: record.city.clone(),
            website_url: record.website_url.clone(),
            logo_url: record.logo_url.clone(),
            level: record.level,
            external_ids: external_ids.clone(),
        };
        // The matched row keeps its name; a second source often spells it differently.
        let update = OrganizationPatch {
            name: None,
            short_name: Some(record.short_name.clone()),
            country: Some(record.country.clone()),
            city: Some(record.city.clone()),
            website_url: Some(record.website_url.clone()),
            logo_url: Some(record.logo_url.clone()),
            level: Some(record.level),
            external_ids,
        };
        let upserted = self.store.upsert_organization(&pred, create, update).await?;
        Ok(upserted.record)
    }

    async fn resolve_event_organization(
        &self,
        record: &ExternalEventRecord,
    ) -> Result<Organization, SyncError> {
        let reference = record.organization_ref.trim();
        let pred = Predicate::any([
            Predicate::text(Field::ShortName, reference),
            Predicate::contains(Field::Name, reference),
        ]);
        if let Some(org) = self.store.find_organization(&pred).await? {
            return Ok(org);
        }
        let name = if reference == "UFC" {
            UFC_FULL_NAME.to_string()
        } else {
            reference.to_string()
        };
        info!(organization = %name, "creating organization referenced by event");
        let create = NewOrganization {
            name,
            short_name: reference.to_string(),
            country: record.country.clone(),
            city: None,
            website_url: None,
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

    async fn upsert_event(&self, provider: &str, record: &ExternalEventRecord) -> Result<Event, SyncError> {
        let organization = self.resolve_event_organization(record).await?;
        let slug = event_slug(provider, record);
        let pred = Predicate::any([
            Predicate::external_id(provider, record.external_id.as_str()),
            Predicate::text(Field::Slug, slug.as_str()),
            Predicate::text(Field::Name, record.name.as_str()),
        ]);
        let create = NewEvent {
            organization_id: organization.id,
            name: record.name.clone(),
            slug,
            description: record.description.clone(),
            venue: record.venue.clone(),
            city: record.city.clone(),
            country: record.country.clone(),
            date_time_utc: record.date_time_utc,
            status: record.status,
            is_amateur_event: record.is_amateur_event,
            poster_url: record.poster_url.clone(),
            external_ids: ExternalIds::single(provider, record.external_id.as_str()),
        };
        let update = create.to_patch();
        let upserted = self.store.upsert_event(&pred, create, update).await?;
        Ok(upserted.record)
    }

    async fn upsert_fighter(&self, provider: &str, record: &ExternalFighterRecord) -> Result<Fighter, SyncError> {
        let pred = Predicate::any([
            Predicate::external_id(provider, record.external_id.as_str()),
            Predicate::all([
                Predicate::text(Field::FirstName, record.first_name.as_str()),
                Predicate::text(Field::LastName, record.last_name.as_str()),
            ]),
        ]);
        let create = new_fighter(provider, record);
        let update = self.policy.fighter_patch(&create, None);
        let upserted = self.store.upsert_fighter(&pred, create, update).await?;
        Ok(upserted.record)
    }

    async fn upsert_fight(
        &self,
        provider: &str,
        event: &Event,
        record: &ExternalFightRecord,
        result: &mut SyncResult,
    ) -> Result<(), SyncError> {
        let fighter_a = self
            .upsert_fighter(provider, &fighter_from_corner(&record.fighter_a, &record.weight_class))
            .await?;
        result.fighters_processed += 1;
        let fighter_b = self
            .upsert_fighter(provider, &fighter_from_corner(&record.fighter_b, &record.weight_class))
            .await?;
        result.fighters_processed += 1;

        let pred = Predicate::any([
            Predicate::external_id(provider, record.external_id.as_str()),
            Predicate::all([
                Predicate::id_field(Field::EventId, event.id),
                Predicate::id_field(Field::FighterAId, fighter_a.id),
                Predicate::id_field(Field::FighterBId, fighter_b.id),
            ]),
        ]);
        let outcome = record.result.as_ref();
        let winner_id = outcome
            .and_then(|o| o.winner_external_id.as_deref())
            .and_then(|winner| {
                if winner == record.fighter_a.external_id {
                    Some(fighter_a.id)
                } else if winner == record.fighter_b.external_id {
                    Some(fighter_b.id)
                } else {
                    None
                }
            });
        let create = NewFight {
            event_id: event.id,
            fighter_a_id: fighter_a.id,
            fighter_b_id: fighter_b.id,
            weight_class: record.weight_class.clone(),
            is_title_fight: record.is_title_fight,
            is_main_event: record.is_main_event,
            is_co_main_event: record.is_co_main_event,
            card_section: record.section,
            order: record.order,
            result_status: outcome.map_or(FightResultStatus::Scheduled, |o| o.status),
            winner_id,
            method: outcome.and_then(|o| o.method.clone()),
            round: outcome.and_then(|o| o.round),
            time: outcome.and_then(|o| o.time.clone()),
            external_ids: ExternalIds::single(provider, record.external_id.as_str()),
        };
        let update = create.to_patch();
        self.store.upsert_fight(&pred, create, update).await?;
        result.fights_processed += 1;
        Ok(())
    }
}

/// Name slug, or a provider/id slug when the name has no letters or digits.
fn event_slug(provider: &str, record: &ExternalEventRecord) -> String {
    let slug = slugify(&record.name);
    if !slug.is_empty() {
        return slug;
    }
    let fallback = slugify(&format!("{provider} {}", record.external_id));
    format!("event-{fallback}")
}

pub(crate) fn new_fighter(provider: &str, record: &ExternalFighterRecord) -> NewFighter {
    NewFighter {
        first_name: record.first_name.clone(),
        last_name: record.last_name.clone(),
        nickname: record.nickname.clone(),
        country: record.country.clone(),
        city: record.city.clone(),
        team: record.team.clone(),
        height_cm: record.height_cm,
        reach_cm: record.reach_cm,
        stance: record.stance,
        weight_class: record.weight_class.clone(),
        is_pro: true,
        image_url: record.image_url.clone(),
        pro_wins: record.wins,
        pro_losses: record.losses,
        pro_draws: record.draws,
        pro_no_contests: record.no_contests,
        external_ids: ExternalIds::single(provider, record.external_id.as_str()),
    }
}

fn log_summary(label: &str, result: &SyncResult) {
    info!(
        success = result.success,
        organizations = result.organizations_processed,
        events = result.events_processed,
        fighters = result.fighters_processed,
        fights = result.fights_processed,
        errors = result.errors.len(),
        "{label} completed"
    );
}
