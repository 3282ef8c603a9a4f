//! Store contract, in-memory and Postgres stores, and HTTP fetch utilities for Octagon.

use async_trait::async_trait;
use octagon_core::{
    Event, EventPatch, Fight, FightPatch, Fighter, FighterPatch, NewEvent, NewFight, NewFighter,
    NewOrganization, Organization, OrganizationPatch,
};
use thiserror::Error;
use uuid::Uuid;

pub mod http;
pub mod memory;
pub mod postgres;

pub use http::{
    BackoffPolicy, FetchError, HttpClientConfig, HttpFetcher, HttpResponse, HttpTransport,
    ReqwestTransport, ScriptedTransport,
};
pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const CRATE_NAME: &str = "octagon-storage";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("unique constraint violated on {entity}.{field}: {value}")]
    UniqueViolation {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Fatal errors abort a whole sync stage; the rest are charged to a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Database(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Organization,
    Event,
    Fighter,
    Fight,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Event => "event",
            Self::Fighter => "fighter",
            Self::Fight => "fight",
        }
    }
}

/// Entity columns a predicate may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    ShortName,
    Slug,
    FirstName,
    LastName,
    EventId,
    FighterAId,
    FighterBId,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ShortName => "short_name",
            Self::Slug => "slug",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::EventId => "event_id",
            Self::FighterAId => "fighter_a_id",
            Self::FighterBId => "fighter_b_id",
        }
    }

    pub fn belongs_to(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Organization => matches!(self, Self::Name | Self::ShortName),
            EntityKind::Event => matches!(self, Self::Name | Self::Slug),
            EntityKind::Fighter => matches!(self, Self::FirstName | Self::LastName),
            EntityKind::Fight => matches!(self, Self::EventId | Self::FighterAId | Self::FighterBId),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Id(Uuid),
}

/// Resolution predicate evaluated by a [`Store`] against one entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq(Field, FieldValue),
    /// Case-sensitive substring match on a text field.
    Contains(Field, String),
    ExternalId { provider: String, id: String },
    HasExternalId(String),
    Id(Uuid),
    Any(Vec<Predicate>),
    All(Vec<Predicate>),
}

impl Predicate {
    pub fn text(field: Field, value: impl Into<String>) -> Self {
        Self::Eq(field, FieldValue::Text(value.into()))
    }

    pub fn id_field(field: Field, id: Uuid) -> Self {
        Self::Eq(field, FieldValue::Id(id))
    }

    pub fn contains(field: Field, value: impl Into<String>) -> Self {
        Self::Contains(field, value.into())
    }

    pub fn external_id(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ExternalId {
            provider: provider.into(),
            id: id.into(),
        }
    }

    pub fn any(preds: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Any(preds.into_iter().collect())
    }

    pub fn all(preds: impl IntoIterator<Item = Predicate>) -> Self {
        Self::All(preds.into_iter().collect())
    }

    /// Rejects fields that the target table does not carry.
    pub fn validate(&self, kind: EntityKind) -> Result<(), StoreError> {
        match self {
            Self::Eq(field, _) | Self::Contains(field, _) if !field.belongs_to(kind) => {
                Err(StoreError::InvalidData(format!(
                    "{} has no field {}",
                    kind.as_str(),
                    field.column()
                )))
            }
            Self::Any(preds) | Self::All(preds) => {
                preds.iter().try_for_each(|p| p.validate(kind))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted<T> {
    pub record: T,
    pub created: bool,
}

/// Persisted store consumed by the sync layer.
///
/// `upsert_*` resolves the first row matching the predicate; when none exists the
/// create payload is inserted, otherwise the patch is applied. External ids are
/// always merged into the existing map.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_organization(&self, pred: &Predicate) -> Result<Option<Organization>, StoreError>;
    async fn upsert_organization(
        &self,
        pred: &Predicate,
        create: NewOrganization,
        update: OrganizationPatch,
    ) -> Result<Upserted<Organization>, StoreError>;

    async fn find_event(&self, pred: &Predicate) -> Result<Option<Event>, StoreError>;
    async fn upsert_event(
        &self,
        pred: &Predicate,
        create: NewEvent,
        update: EventPatch,
    ) -> Result<Upserted<Event>, StoreError>;

    async fn find_fighter(&self, pred: &Predicate) -> Result<Option<Fighter>, StoreError>;
    async fn upsert_fighter(
        &self,
        pred: &Predicate,
        create: NewFighter,
        update: FighterPatch,
    ) -> Result<Upserted<Fighter>, StoreError>;
    async fn update_fighter(&self, id: Uuid, patch: FighterPatch) -> Result<Fighter, StoreError>;
    async fn list_fighters(&self, pred: Option<&Predicate>) -> Result<Vec<Fighter>, StoreError>;

    async fn find_fight(&self, pred: &Predicate) -> Result<Option<Fight>, StoreError>;
    async fn upsert_fight(
        &self,
        pred: &Predicate,
        create: NewFight,
        update: FightPatch,
    ) -> Result<Upserted<Fight>, StoreError>;

    async fn count(&self, kind: EntityKind) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_are_connectivity_only() {
        assert!(StoreError::Unavailable("pool timed out".into()).is_fatal());
        assert!(!StoreError::UniqueViolation {
            entity: "event",
            field: "slug",
            value: "ufc-310".into(),
        }
        .is_fatal());
        assert!(!StoreError::InvalidData("bad".into()).is_fatal());
    }

    #[test]
    fn predicates_reject_foreign_fields() {
        let pred = Predicate::any([
            Predicate::text(Field::Name, "UFC"),
            Predicate::text(Field::Slug, "ufc-310"),
        ]);
        assert!(pred.validate(EntityKind::Event).is_ok());
        assert!(pred.validate(EntityKind::Organization).is_err());
        assert!(Predicate::external_id("UFC", "x")
            .validate(EntityKind::Fight)
            .is_ok());
    }
}
