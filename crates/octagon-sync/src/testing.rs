//! Test doubles for the sync services.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use octagon_adapters::{
    AdapterError, AthleteDetails, ListingRecord, MmaProvider, RosterAthlete, RosterSource, SourceKind,
};
use octagon_core::{
    Event, EventPatch, ExternalEventRecord, ExternalFightRecord, ExternalOrganizationRecord, Fight,
    FightPatch, Fighter, FighterPatch, NewEvent, NewFight, NewFighter, NewOrganization, Organization,
    OrganizationPatch,
};
use octagon_storage::{EntityKind, MemoryStore, Predicate, Store, StoreError, Upserted};
use uuid::Uuid;

pub(crate) struct StaticProvider {
    name: &'static str,
    organizations: Vec<ExternalOrganizationRecord>,
    upcoming: Vec<ExternalEventRecord>,
    past: Vec<ExternalEventRecord>,
    cards: HashMap<String, Result<Vec<ExternalFightRecord>, String>>,
    past_calls: AtomicUsize,
}

impl StaticProvider {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            organizations: Vec::new(),
            upcoming: Vec::new(),
            past: Vec::new(),
            cards: HashMap::new(),
            past_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_organizations(mut self, organizations: Vec<ExternalOrganizationRecord>) -> Self {
        self.organizations = organizations;
        self
    }

    pub(crate) fn with_upcoming(mut self, events: Vec<ExternalEventRecord>) -> Self {
        self.upcoming = events;
        self
    }

    pub(crate) fn with_past(mut self, events: Vec<ExternalEventRecord>) -> Self {
        self.past = events;
        self
    }

    pub(crate) fn with_card(mut self, event_id: &str, fights: Vec<ExternalFightRecord>) -> Self {
        self.cards.insert(event_id.to_string(), Ok(fights));
        self
    }

    pub(crate) fn with_card_error(mut self, event_id: &str, message: &str) -> Self {
        self.cards.insert(event_id.to_string(), Err(message.to_string()));
        self
    }

    pub(crate) fn past_calls(&self) -> usize {
        self.past_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MmaProvider for StaticProvider {
    fn provider_name(&self) -> &'static str {
        self.name
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::StaticFallback
    }

    async fn fetch_upcoming_events(&self) -> Vec<ExternalEventRecord> {
        self.upcoming.clone()
    }

    async fn fetch_past_events(&self, limit: usize) -> Vec<ExternalEventRecord> {
        self.past_calls.fetch_add(1, Ordering::SeqCst);
        self.past.iter().take(limit).cloned().collect()
    }

    async fn fetch_fight_card(
        &self,
        event_external_id: &str,
    ) -> Result<Vec<ExternalFightRecord>, AdapterError> {
        match self.cards.get(event_external_id) {
            Some(Ok(fights)) => Ok(fights.clone()),
            Some(Err(message)) => Err(AdapterError::Message(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_organizations(&self) -> Vec<ExternalOrganizationRecord> {
        self.organizations.clone()
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub(crate) struct FakeRoster {
    pub(crate) all: Vec<RosterAthlete>,
    pub(crate) top: Vec<RosterAthlete>,
    pub(crate) details: HashMap<String, AthleteDetails>,
    pub(crate) listings: BTreeMap<String, ListingRecord>,
    pub(crate) detail_calls: Mutex<Vec<String>>,
}

impl FakeRoster {
    pub(crate) fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RosterSource for FakeRoster {
    fn provider_name(&self) -> &'static str {
        "UFC"
    }

    async fn fetch_all_athletes(&self) -> Vec<RosterAthlete> {
        self.all.clone()
    }

    async fn fetch_top_athletes(&self) -> Vec<RosterAthlete> {
        self.top.clone()
    }

    async fn fetch_athlete_details(&self, slug: &str) -> Option<AthleteDetails> {
        if let Ok(mut calls) = self.detail_calls.lock() {
            calls.push(slug.to_string());
        }
        self.details.get(slug).cloned()
    }

    async fn fetch_listing_records(&self) -> BTreeMap<String, ListingRecord> {
        self.listings.clone()
    }
}

/// [`MemoryStore`] that fails selected operations.
#[derive(Default)]
pub(crate) struct FailingStore {
    inner: MemoryStore,
    events_unavailable: bool,
    fighters_unavailable: bool,
    rejected_event: Option<String>,
    rejected_fighter: Option<String>,
}

impl FailingStore {
    pub(crate) fn events_unavailable() -> Self {
        Self {
            events_unavailable: true,
            ..Self::default()
        }
    }

    pub(crate) fn fighters_unavailable() -> Self {
        Self {
            fighters_unavailable: true,
            ..Self::default()
        }
    }

    pub(crate) fn rejecting_event(name: &str) -> Self {
        Self {
            rejected_event: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn rejecting_fighter(last_name: &str) -> Self {
        Self {
            rejected_fighter: Some(last_name.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn fighters_gate(&self) -> Result<(), StoreError> {
        if self.fighters_unavailable {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn find_organization(&self, pred: &Predicate) -> Result<Option<Organization>, StoreError> {
        self.inner.find_organization(pred).await
    }

    async fn upsert_organization(
        &self,
        pred: &Predicate,
        create: NewOrganization,
        update: OrganizationPatch,
    ) -> Result<Upserted<Organization>, StoreError> {
        self.inner.upsert_organization(pred, create, update).await
    }

    async fn find_event(&self, pred: &Predicate) -> Result<Option<Event>, StoreError> {
        self.inner.find_event(pred).await
    }

    async fn upsert_event(
        &self,
        pred: &Predicate,
        create: NewEvent,
        update: EventPatch,
    ) -> Result<Upserted<Event>, StoreError> {
        if self.events_unavailable {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        if self.rejected_event.as_deref() == Some(create.name.as_str()) {
            return Err(StoreError::UniqueViolation {
                entity: "event",
                field: "slug",
                value: create.slug,
            });
        }
        self.inner.upsert_event(pred, create, update).await
    }

    async fn find_fighter(&self, pred: &Predicate) -> Result<Option<Fighter>, StoreError> {
        self.fighters_gate()?;
        self.inner.find_fighter(pred).await
    }

    async fn upsert_fighter(
        &self,
        pred: &Predicate,
        create: NewFighter,
        update: FighterPatch,
    ) -> Result<Upserted<Fighter>, StoreError> {
        self.fighters_gate()?;
        if self.rejected_fighter.as_deref() == Some(create.last_name.as_str()) {
            return Err(StoreError::InvalidData(format!(
                "fighter {} {} rejected",
                create.first_name, create.last_name
            )));
        }
        self.inner.upsert_fighter(pred, create, update).await
    }

    async fn update_fighter(&self, id: Uuid, patch: FighterPatch) -> Result<Fighter, StoreError> {
        self.fighters_gate()?;
        self.inner.update_fighter(id, patch).await
    }

    async fn list_fighters(&self, pred: Option<&Predicate>) -> Result<Vec<Fighter>, StoreError> {
        self.fighters_gate()?;
        self.inner.list_fighters(pred).await
    }

    async fn find_fight(&self, pred: &Predicate) -> Result<Option<Fight>, StoreError> {
        self.inner.find_fight(pred).await
    }

    async fn upsert_fight(
        &self,
        pred: &Predicate,
        create: NewFight,
        update: FightPatch,
    ) -> Result<Upserted<Fight>, StoreError> {
        self.inner.upsert_fight(pred, create, update).await
    }

    async fn count(&self, kind: EntityKind) -> Result<u64, StoreError> {
        self.inner.count(kind).await
    }
}
