//! Core domain model for Octagon: external observations and persisted entities.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use deunicode::deunicode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const CRATE_NAME: &str = "octagon-core";

/// Placeholder used by sources when a text field is not known.
pub const UNKNOWN: &str = "Unknown";

/// Provider name -> provider-specific id, the join key across repeated syncs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalIds(BTreeMap<String, String>);

impl ExternalIds {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn single(provider: impl Into<String>, id: impl Into<String>) -> Self {
        let mut ids = Self::new();
        ids.insert(provider, id);
        ids
    }

    pub fn get(&self, provider: &str) -> Option<&str> {
        self.0.get(provider).map(String::as_str)
    }

    pub fn insert(&mut self, provider: impl Into<String>, id: impl Into<String>) {
        self.0.insert(provider.into(), id.into());
    }

    /// Additive merge: keys in `other` win, keys only present here are kept.
    pub fn merge(&mut self, other: &ExternalIds) {
        for (provider, id) in &other.0 {
            self.0.insert(provider.clone(), id.clone());
        }
    }

    pub fn merged(mut self, other: &ExternalIds) -> Self {
        self.merge(other);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl From<BTreeMap<String, String>> for ExternalIds {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for EventStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(Self::Scheduled),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ParseEnumError {
                kind: "event status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FightResultStatus {
    #[default]
    Scheduled,
    Completed,
    Draw,
    NoContest,
    Cancelled,
}

impl FightResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Completed => "COMPLETED",
            Self::Draw => "DRAW",
            Self::NoContest => "NO_CONTEST",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for FightResultStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(Self::Scheduled),
            "COMPLETED" => Ok(Self::Completed),
            "DRAW" => Ok(Self::Draw),
            "NO_CONTEST" => Ok(Self::NoContest),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ParseEnumError {
                kind: "fight result status",
                value: other.to_string(),
            }),
        }
    }
}

/// Grouping of fights within an event; drives display ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardSection {
    #[default]
    Main,
    Prelim,
    EarlyPrelim,
}

impl CardSection {
    pub const ALL: [CardSection; 3] = [Self::Main, Self::Prelim, Self::EarlyPrelim];

    pub fn ordinal_base(&self) -> i32 {
        match self {
            Self::Main => 100,
            Self::Prelim => 200,
            Self::EarlyPrelim => 300,
        }
    }

    /// Ordinal of the fight at `position` (0-based, top of the section first).
    pub fn ordinal(&self, position: usize) -> i32 {
        self.ordinal_base() + i32::try_from(position).unwrap_or(99).min(99)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "MAIN",
            Self::Prelim => "PRELIM",
            Self::EarlyPrelim => "EARLY_PRELIM",
        }
    }
}

impl FromStr for CardSection {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MAIN" => Ok(Self::Main),
            "PRELIM" => Ok(Self::Prelim),
            "EARLY_PRELIM" => Ok(Self::EarlyPrelim),
            other => Err(ParseEnumError {
                kind: "card section",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationLevel {
    #[default]
    Major,
    Regional,
    Amateur,
}

impl OrganizationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "MAJOR",
            Self::Regional => "REGIONAL",
            Self::Amateur => "AMATEUR",
        }
    }
}

impl FromStr for OrganizationLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MAJOR" => Ok(Self::Major),
            "REGIONAL" => Ok(Self::Regional),
            "AMATEUR" => Ok(Self::Amateur),
            other => Err(ParseEnumError {
                kind: "organization level",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stance {
    Orthodox,
    Southpaw,
    Switch,
    Other,
    #[default]
    Unknown,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orthodox => "ORTHODOX",
            Self::Southpaw => "SOUTHPAW",
            Self::Switch => "SWITCH",
            Self::Other => "OTHER",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Lenient mapping for free-text provider values.
    pub fn from_loose(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
            Some("ORTHODOX") => Self::Orthodox,
            Some("SOUTHPAW") => Self::Southpaw,
            Some("SWITCH") => Self::Switch,
            Some("OTHER") => Self::Other,
            _ => Self::Unknown,
        }
    }
}

impl FromStr for Stance {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORTHODOX" => Ok(Self::Orthodox),
            "SOUTHPAW" => Ok(Self::Southpaw),
            "SWITCH" => Ok(Self::Switch),
            "OTHER" => Ok(Self::Other),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(ParseEnumError {
                kind: "stance",
                value: other.to_string(),
            }),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(EventStatus, FightResultStatus, CardSection, OrganizationLevel, Stance);

// ---------------------------------------------------------------------------
// External records: one observation from one provider, never persisted as-is.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalOrganizationRecord {
    pub external_id: String,
    pub name: String,
    pub short_name: String,
    pub country: String,
    pub city: Option<String>,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub level: OrganizationLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEventRecord {
    pub external_id: String,
    /// Organization by external name or shortcode, never an internal id.
    pub organization_ref: String,
    pub name: String,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub date_time_utc: DateTime<Utc>,
    pub status: EventStatus,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub is_amateur_event: bool,
}

/// Fighter as described by one corner of a fight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FightCorner {
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub country: Option<String>,
    /// "W-L-D", optionally followed by descriptor text.
    pub record: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FightOutcome {
    pub status: FightResultStatus,
    pub winner_external_id: Option<String>,
    pub method: Option<String>,
    pub round: Option<i32>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFightRecord {
    pub external_id: String,
    pub event_external_id: String,
    pub fighter_a: FightCorner,
    pub fighter_b: FightCorner,
    pub weight_class: String,
    pub is_title_fight: bool,
    pub is_main_event: bool,
    pub is_co_main_event: bool,
    pub section: CardSection,
    pub order: i32,
    pub result: Option<FightOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFighterRecord {
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub country: String,
    pub city: Option<String>,
    pub team: Option<String>,
    pub height_cm: Option<i32>,
    pub reach_cm: Option<i32>,
    pub stance: Stance,
    pub weight_class: String,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub no_contests: i32,
    pub image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Persisted entities. Owned by the store; mutated only through upserts.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub short_name: String,
    pub country: String,
    pub city: Option<String>,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub level: OrganizationLevel,
    pub external_ids: ExternalIds,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub short_name: String,
    pub country: String,
    pub city: Option<String>,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub level: OrganizationLevel,
    pub external_ids: ExternalIds,
}

/// `None` leaves a field untouched; `external_ids` is always merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub country: Option<String>,
    pub city: Option<Option<String>>,
    pub website_url: Option<Option<String>>,
    pub logo_url: Option<Option<String>>,
    pub level: Option<OrganizationLevel>,
    pub external_ids: ExternalIds,
}

impl NewOrganization {
    pub fn into_entity(self, id: Uuid, now: DateTime<Utc>) -> Organization {
        Organization {
            id,
            name: self.name,
            short_name: self.short_name,
            country: self.country,
            city: self.city,
            website_url: self.website_url,
            logo_url: self.logo_url,
            level: self.level,
            external_ids: self.external_ids,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Organization {
    pub fn apply(&mut self, patch: OrganizationPatch, now: DateTime<Utc>) {
        set(&mut self.name, patch.name);
        set(&mut self.short_name, patch.short_name);
        set(&mut self.country, patch.country);
        set(&mut self.city, patch.city);
        set(&mut self.website_url, patch.website_url);
        set(&mut self.logo_url, patch.logo_url);
        set(&mut self.level, patch.level);
        self.external_ids.merge(&patch.external_ids);
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub date_time_utc: DateTime<Utc>,
    pub status: EventStatus,
    pub is_amateur_event: bool,
    pub poster_url: Option<String>,
    pub external_ids: ExternalIds,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub date_time_utc: DateTime<Utc>,
    pub status: EventStatus,
    pub is_amateur_event: bool,
    pub poster_url: Option<String>,
    pub external_ids: ExternalIds,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    pub organization_id: Option<Uuid>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub venue: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub country: Option<String>,
    pub date_time_utc: Option<DateTime<Utc>>,
    pub status: Option<EventStatus>,
    pub is_amateur_event: Option<bool>,
    pub poster_url: Option<Option<String>>,
    pub external_ids: ExternalIds,
}

impl NewEvent {
    pub fn into_entity(self, id: Uuid, now: DateTime<Utc>) -> Event {
        Event {
            id,
            organization_id: self.organization_id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            venue: self.venue,
            city: self.city,
            country: self.country,
            date_time_utc: self.date_time_utc,
            status: self.status,
            is_amateur_event: self.is_amateur_event,
            poster_url: self.poster_url,
            external_ids: self.external_ids,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite-everything patch, used when a sync is authoritative.
    pub fn to_patch(&self) -> EventPatch {
        EventPatch {
            organization_id: Some(self.organization_id),
            name: Some(self.name.clone()),
            slug: Some(self.slug.clone()),
            description: Some(self.description.clone()),
            venue: Some(self.venue.clone()),
            city: Some(self.city.clone()),
            country: Some(self.country.clone()),
            date_time_utc: Some(self.date_time_utc),
            status: Some(self.status),
            is_amateur_event: Some(self.is_amateur_event),
            poster_url: Some(self.poster_url.clone()),
            external_ids: self.external_ids.clone(),
        }
    }
}

impl Event {
    pub fn apply(&mut self, patch: EventPatch, now: DateTime<Utc>) {
        set(&mut self.organization_id, patch.organization_id);
        set(&mut self.name, patch.name);
        set(&mut self.slug, patch.slug);
        set(&mut self.description, patch.description);
        set(&mut self.venue, patch.venue);
        set(&mut self.city, patch.city);
        set(&mut self.country, patch.country);
        set(&mut self.date_time_utc, patch.date_time_utc);
        set(&mut self.status, patch.status);
        set(&mut self.is_amateur_event, patch.is_amateur_event);
        set(&mut self.poster_url, patch.poster_url);
        self.external_ids.merge(&patch.external_ids);
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fighter {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub country: String,
    pub city: Option<String>,
    pub team: Option<String>,
    pub height_cm: Option<i32>,
    pub reach_cm: Option<i32>,
    pub stance: Stance,
    pub weight_class: String,
    pub is_pro: bool,
    pub image_url: Option<String>,
    pub pro_wins: i32,
    pub pro_losses: i32,
    pub pro_draws: i32,
    pub pro_no_contests: i32,
    pub external_ids: ExternalIds,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFighter {
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub country: String,
    pub city: Option<String>,
    pub team: Option<String>,
    pub height_cm: Option<i32>,
    pub reach_cm: Option<i32>,
    pub stance: Stance,
    pub weight_class: String,
    pub is_pro: bool,
    pub image_url: Option<String>,
    pub pro_wins: i32,
    pub pro_losses: i32,
    pub pro_draws: i32,
    pub pro_no_contests: i32,
    pub external_ids: ExternalIds,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<Option<String>>,
    pub country: Option<String>,
    pub city: Option<Option<String>>,
    pub team: Option<Option<String>>,
    pub height_cm: Option<Option<i32>>,
    pub reach_cm: Option<Option<i32>>,
    pub stance: Option<Stance>,
    pub weight_class: Option<String>,
    pub is_pro: Option<bool>,
    pub image_url: Option<Option<String>>,
    pub pro_wins: Option<i32>,
    pub pro_losses: Option<i32>,
    pub pro_draws: Option<i32>,
    pub pro_no_contests: Option<i32>,
    pub external_ids: ExternalIds,
}

impl FighterPatch {
    /// True when applying the patch would change nothing but external ids.
    pub fn is_fields_empty(&self) -> bool {
        *self
            == Self {
                external_ids: self.external_ids.clone(),
                ..Self::default()
            }
    }
}

impl NewFighter {
    pub fn into_entity(self, id: Uuid, now: DateTime<Utc>) -> Fighter {
        Fighter {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            nickname: self.nickname,
            country: self.country,
            city: self.city,
            team: self.team,
            height_cm: self.height_cm,
            reach_cm: self.reach_cm,
            stance: self.stance,
            weight_class: self.weight_class,
            is_pro: self.is_pro,
            image_url: self.image_url,
            pro_wins: self.pro_wins,
            pro_losses: self.pro_losses,
            pro_draws: self.pro_draws,
            pro_no_contests: self.pro_no_contests,
            external_ids: self.external_ids,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Fighter {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn apply(&mut self, patch: FighterPatch, now: DateTime<Utc>) {
        set(&mut self.first_name, patch.first_name);
        set(&mut self.last_name, patch.last_name);
        set(&mut self.nickname, patch.nickname);
        set(&mut self.country, patch.country);
        set(&mut self.city, patch.city);
        set(&mut self.team, patch.team);
        set(&mut self.height_cm, patch.height_cm);
        set(&mut self.reach_cm, patch.reach_cm);
        set(&mut self.stance, patch.stance);
        set(&mut self.weight_class, patch.weight_class);
        set(&mut self.is_pro, patch.is_pro);
        set(&mut self.image_url, patch.image_url);
        set(&mut self.pro_wins, patch.pro_wins);
        set(&mut self.pro_losses, patch.pro_losses);
        set(&mut self.pro_draws, patch.pro_draws);
        set(&mut self.pro_no_contests, patch.pro_no_contests);
        self.external_ids.merge(&patch.external_ids);
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fight {
    pub id: Uuid,
    pub event_id: Uuid,
    pub fighter_a_id: Uuid,
    pub fighter_b_id: Uuid,
    pub weight_class: String,
    pub is_title_fight: bool,
    pub is_main_event: bool,
    pub is_co_main_event: bool,
    pub card_section: CardSection,
    pub order: i32,
    pub result_status: FightResultStatus,
    pub winner_id: Option<Uuid>,
    pub method: Option<String>,
    pub round: Option<i32>,
    pub time: Option<String>,
    pub external_ids: ExternalIds,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFight {
    pub event_id: Uuid,
    pub fighter_a_id: Uuid,
    pub fighter_b_id: Uuid,
    pub weight_class: String,
    pub is_title_fight: bool,
    pub is_main_event: bool,
    pub is_co_main_event: bool,
    pub card_section: CardSection,
    pub order: i32,
    pub result_status: FightResultStatus,
    pub winner_id: Option<Uuid>,
    pub method: Option<String>,
    pub round: Option<i32>,
    pub time: Option<String>,
    pub external_ids: ExternalIds,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FightPatch {
    pub event_id: Option<Uuid>,
    pub fighter_a_id: Option<Uuid>,
    pub fighter_b_id: Option<Uuid>,
    pub weight_class: Option<String>,
    pub is_title_fight: Option<bool>,
    pub is_main_event: Option<bool>,
    pub is_co_main_event: Option<bool>,
    pub card_section: Option<CardSection>,
    pub order: Option<i32>,
    pub result_status: Option<FightResultStatus>,
    pub winner_id: Option<Option<Uuid>>,
    pub method: Option<Option<String>>,
    pub round: Option<Option<i32>>,
    pub time: Option<Option<String>>,
    pub external_ids: ExternalIds,
}

impl NewFight {
    pub fn into_entity(self, id: Uuid, now: DateTime<Utc>) -> Fight {
        Fight {
            id,
            event_id: self.event_id,
            fighter_a_id: self.fighter_a_id,
            fighter_b_id: self.fighter_b_id,
            weight_class: self.weight_class,
            is_title_fight: self.is_title_fight,
            is_main_event: self.is_main_event,
            is_co_main_event: self.is_co_main_event,
            card_section: self.card_section,
            order: self.order,
            result_status: self.result_status,
            winner_id: self.winner_id,
            method: self.method,
            round: self.round,
            time: self.time,
            external_ids: self.external_ids,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_patch(&self) -> FightPatch {
        FightPatch {
            event_id: Some(self.event_id),
            fighter_a_id: Some(self.fighter_a_id),
            fighter_b_id: Some(self.fighter_b_id),
            weight_class: Some(self.weight_class.clone()),
            is_title_fight: Some(self.is_title_fight),
            is_main_event: Some(self.is_main_event),
            is_co_main_event: Some(self.is_co_main_event),
            card_section: Some(self.card_section),
            order: Some(self.order),
            result_status: Some(self.result_status),
            winner_id: Some(self.winner_id),
            method: Some(self.method.clone()),
            round: Some(self.round),
            time: Some(self.time.clone()),
            external_ids: self.external_ids.clone(),
        }
    }
}

impl Fight {
    pub fn apply(&mut self, patch: FightPatch, now: DateTime<Utc>) {
        set(&mut self.event_id, patch.event_id);
        set(&mut self.fighter_a_id, patch.fighter_a_id);
        set(&mut self.fighter_b_id, patch.fighter_b_id);
        set(&mut self.weight_class, patch.weight_class);
        set(&mut self.is_title_fight, patch.is_title_fight);
        set(&mut self.is_main_event, patch.is_main_event);
        set(&mut self.is_co_main_event, patch.is_co_main_event);
        set(&mut self.card_section, patch.card_section);
        set(&mut self.order, patch.order);
        set(&mut self.result_status, patch.result_status);
        set(&mut self.winner_id, patch.winner_id);
        set(&mut self.method, patch.method);
        set(&mut self.round, patch.round);
        set(&mut self.time, patch.time);
        self.external_ids.merge(&patch.external_ids);
        self.updated_at = now;
    }
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

/// URL-safe slug: transliterated to ASCII, then lowercase alphanumerics
/// joined by single hyphens. Empty when the input has no letters or digits.
pub fn slugify(input: &str) -> String {
    let ascii = deunicode(input);
    let mut out = String::with_capacity(ascii.len());
    let mut pending_sep = false;
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_sep = true;
        }
    }
    out
}

/// Name-derived fighter id for sources that expose no stable id.
///
/// Two distinct fighters sharing a name collide on this key.
pub fn synthesize_fighter_id(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name.trim(), last_name.trim())
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
