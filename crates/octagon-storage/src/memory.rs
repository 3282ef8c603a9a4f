//! In-process [`Store`] used by tests and by `--memory` dry runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octagon_core::{
    Event, EventPatch, ExternalIds, Fight, FightPatch, Fighter, FighterPatch, NewEvent, NewFight,
    NewFighter, NewOrganization, Organization, OrganizationPatch,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{EntityKind, Field, FieldValue, Predicate, Store, StoreError, Upserted};

trait Row: Clone {
    const KIND: EntityKind;

    fn id(&self) -> Uuid;
    fn field(&self, field: Field) -> Option<FieldValue>;
    fn external_ids(&self) -> &ExternalIds;

    /// Column backed by a unique constraint, if any.
    fn unique_key(&self) -> Option<(&'static str, &str)> {
        None
    }
}

impl Row for Organization {
    const KIND: EntityKind = EntityKind::Organization;

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Name => Some(FieldValue::Text(self.name.clone())),
            Field::ShortName => Some(FieldValue::Text(self.short_name.clone())),
            _ => None,
        }
    }

    fn external_ids(&self) -> &ExternalIds {
        &self.external_ids
    }

    fn unique_key(&self) -> Option<(&'static str, &str)> {
        Some(("name", &self.name))
    }
}

impl Row for Event {
    const KIND: EntityKind = EntityKind::Event;

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Name => Some(FieldValue::Text(self.name.clone())),
            Field::Slug => Some(FieldValue::Text(self.slug.clone())),
            _ => None,
        }
    }

    fn external_ids(&self) -> &ExternalIds {
        &self.external_ids
    }

    fn unique_key(&self) -> Option<(&'static str, &str)> {
        Some(("slug", &self.slug))
    }
}

impl Row for Fighter {
    const KIND: EntityKind = EntityKind::Fighter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::FirstName => Some(FieldValue::Text(self.first_name.clone())),
            Field::LastName => Some(FieldValue::Text(self.last_name.clone())),
            _ => None,
        }
    }

    fn external_ids(&self) -> &ExternalIds {
        &self.external_ids
    }
}

impl Row for Fight {
    const KIND: EntityKind = EntityKind::Fight;

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::EventId => Some(FieldValue::Id(self.event_id)),
            Field::FighterAId => Some(FieldValue::Id(self.fighter_a_id)),
            Field::FighterBId => Some(FieldValue::Id(self.fighter_b_id)),
            _ => None,
        }
    }

    fn external_ids(&self) -> &ExternalIds {
        &self.external_ids
    }
}

fn matches<R: Row>(row: &R, pred: &Predicate) -> bool {
    match pred {
        Predicate::Eq(field, value) => row.field(*field).as_ref() == Some(value),
        Predicate::Contains(field, needle) => match row.field(*field) {
            Some(FieldValue::Text(text)) => text.contains(needle.as_str()),
            _ => false,
        },
        Predicate::ExternalId { provider, id } => row.external_ids().get(provider) == Some(id),
        Predicate::HasExternalId(provider) => row.external_ids().get(provider).is_some(),
        Predicate::Id(id) => row.id() == *id,
        Predicate::Any(preds) => preds.iter().any(|p| matches(row, p)),
        Predicate::All(preds) => preds.iter().all(|p| matches(row, p)),
    }
}

fn find_in<R: Row>(table: &[R], pred: &Predicate) -> Result<Option<R>, StoreError> {
    pred.validate(R::KIND)?;
    Ok(table.iter().find(|row| matches(*row, pred)).cloned())
}

fn check_unique<R: Row>(table: &[R], candidate: &R) -> Result<(), StoreError> {
    let Some((field, value)) = candidate.unique_key() else {
        return Ok(());
    };
    let clash = table
        .iter()
        .any(|row| row.id() != candidate.id() && row.unique_key() == Some((field, value)));
    if clash {
        return Err(StoreError::UniqueViolation {
            entity: R::KIND.as_str(),
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn upsert_in<R: Row>(
    table: &mut Vec<R>,
    pred: &Predicate,
    create: impl FnOnce(Uuid, DateTime<Utc>) -> R,
    update: impl FnOnce(&mut R, DateTime<Utc>),
) -> Result<Upserted<R>, StoreError> {
    pred.validate(R::KIND)?;
    let now = Utc::now();
    match table.iter().position(|row| matches(row, pred)) {
        Some(index) => {
            let mut next = table[index].clone();
            update(&mut next, now);
            check_unique(table, &next)?;
            table[index] = next.clone();
            Ok(Upserted {
                record: next,
                created: false,
            })
        }
        None => {
            let row = create(Uuid::new_v4(), now);
            check_unique(table, &row)?;
            table.push(row.clone());
            Ok(Upserted {
                record: row,
                created: true,
            })
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    organizations: Vec<Organization>,
    events: Vec<Event>,
    fighters: Vec<Fighter>,
    fights: Vec<Fight>,
}

/// Tables kept in insertion order; the first matching row wins resolution.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn organizations(&self) -> Vec<Organization> {
        self.tables.lock().await.organizations.clone()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.tables.lock().await.events.clone()
    }

    pub async fn fighters(&self) -> Vec<Fighter> {
        self.tables.lock().await.fighters.clone()
    }

    pub async fn fights(&self) -> Vec<Fight> {
        self.tables.lock().await.fights.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_organization(&self, pred: &Predicate) -> Result<Option<Organization>, StoreError> {
        find_in(&self.tables.lock().await.organizations, pred)
    }

    async fn upsert_organization(
        &self,
        pred: &Predicate,
        create: NewOrganization,
        update: OrganizationPatch,
    ) -> Result<Upserted<Organization>, StoreError> {
        let mut tables = self.tables.lock().await;
        upsert_in(
            &mut tables.organizations,
            pred,
            |id, now| create.into_entity(id, now),
            |row, now| row.apply(update, now),
        )
    }

    async fn find_event(&self, pred: &Predicate) -> Result<Option<Event>, StoreError> {
        find_in(&self.tables.lock().await.events, pred)
    }

    async fn upsert_event(
        &self,
        pred: &Predicate,
        create: NewEvent,
        update: EventPatch,
    ) -> Result<Upserted<Event>, StoreError> {
        let mut tables = self.tables.lock().await;
        upsert_in(
            &mut tables.events,
            pred,
            |id, now| create.into_entity(id, now),
            |row, now| row.apply(update, now),
        )
    }

    async fn find_fighter(&self, pred: &Predicate) -> Result<Option<Fighter>, StoreError> {
        find_in(&self.tables.lock().await.fighters, pred)
    }

    async fn upsert_fighter(
        &self,
        pred: &Predicate,
        create: NewFighter,
        update: FighterPatch,
    ) -> Result<Upserted<Fighter>, StoreError> {
        let mut tables = self.tables.lock().await;
        upsert_in(
            &mut tables.fighters,
            pred,
            |id, now| create.into_entity(id, now),
            |row, now| row.apply(update, now),
        )
    }

    async fn update_fighter(&self, id: Uuid, patch: FighterPatch) -> Result<Fighter, StoreError> {
        let mut tables = self.tables.lock().await;
        let fighter = tables
            .fighters
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(StoreError::NotFound {
                entity: "fighter",
                id,
            })?;
        fighter.apply(patch, Utc::now());
        Ok(fighter.clone())
    }

    async fn list_fighters(&self, pred: Option<&Predicate>) -> Result<Vec<Fighter>, StoreError> {
        let tables = self.tables.lock().await;
        match pred {
            Some(pred) => {
                pred.validate(EntityKind::Fighter)?;
                Ok(tables
                    .fighters
                    .iter()
                    .filter(|f| matches(*f, pred))
                    .cloned()
                    .collect())
            }
            None => Ok(tables.fighters.clone()),
        }
    }

    async fn find_fight(&self, pred: &Predicate) -> Result<Option<Fight>, StoreError> {
        find_in(&self.tables.lock().await.fights, pred)
    }

    async fn upsert_fight(
        &self,
        pred: &Predicate,
        create: NewFight,
        update: FightPatch,
    ) -> Result<Upserted<Fight>, StoreError> {
        let mut tables = self.tables.lock().await;
        upsert_in(
            &mut tables.fights,
            pred,
            |id, now| create.into_entity(id, now),
            |row, now| row.apply(update, now),
        )
    }

    async fn count(&self, kind: EntityKind) -> Result<u64, StoreError> {
        let tables = self.tables.lock().await;
        let n = match kind {
            EntityKind::Organization => tables.organizations.len(),
            EntityKind::Event => tables.events.len(),
            EntityKind::Fighter => tables.fighters.len(),
            EntityKind::Fight => tables.fights.len(),
        };
        Ok(n as u64)
    }
}
