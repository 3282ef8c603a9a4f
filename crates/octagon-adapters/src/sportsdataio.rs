//! SportsDataIO MMA API (key-authenticated JSON).
//!
//! Requests go through [`HttpFetcher::get_json_with_retry`]. Listing calls log
//! and return empty once retries are spent; fight cards return the error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use octagon_core::{
    CardSection, EventStatus, ExternalEventRecord, ExternalFightRecord, ExternalFighterRecord,
    ExternalOrganizationRecord, FightCorner, FightOutcome, FightResultStatus, OrganizationLevel,
    Stance, UNKNOWN,
};
use octagon_storage::HttpFetcher;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::{parse_timestamp, AdapterError, FighterSearch, MmaProvider, SourceKind};

pub const PROVIDER_NAME: &str = "SportsDataIO";
pub const DEFAULT_BASE_URL: &str = "https://api.sportsdata.io/v3/mma";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SportsDataIoConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub season: i32,
}

impl Default for SportsDataIoConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            season: Utc::now().year(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ScheduleEvent {
    event_id: Option<i64>,
    name: Option<String>,
    league: Option<String>,
    venue: Option<String>,
    city: Option<String>,
    country: Option<String>,
    date_time: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct EventDetails {
    #[serde(flatten)]
    event: ScheduleEvent,
    fights: Vec<ApiFight>,
    fighters: Vec<ApiFighter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ApiFight {
    fight_id: Option<i64>,
    order: Option<i32>,
    fighter_id_a: Option<i64>,
    fighter_id_b: Option<i64>,
    winner_id: Option<i64>,
    result_status: Option<String>,
    method: Option<String>,
    round: Option<i32>,
    time: Option<String>,
    weight_class: Option<String>,
    is_title_fight: Option<bool>,
    is_main_event: Option<bool>,
    is_co_main_event: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ApiFighter {
    fighter_id: Option<i64>,
    first_name: Option<String>,
    last_name: Option<String>,
    nickname: Option<String>,
    country: Option<String>,
    city: Option<String>,
    team: Option<String>,
    height_cm: Option<i32>,
    reach_cm: Option<i32>,
    stance: Option<String>,
    weight_class: Option<String>,
    image_url: Option<String>,
    wins: Option<i32>,
    losses: Option<i32>,
    draws: Option<i32>,
    no_contests: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ApiLeague {
    league_id: Option<i64>,
    name: Option<String>,
    key: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn event_status(status: Option<&str>) -> EventStatus {
    match status.map(str::to_ascii_uppercase).as_deref() {
        Some("COMPLETED" | "FINAL") => EventStatus::Completed,
        Some("CANCELLED" | "CANCELED" | "POSTPONED") => EventStatus::Cancelled,
        _ => EventStatus::Scheduled,
    }
}

fn fight_status(status: Option<&str>) -> FightResultStatus {
    match status.map(str::to_ascii_uppercase).as_deref() {
        Some("COMPLETED" | "FINAL") => FightResultStatus::Completed,
        Some("DRAW") => FightResultStatus::Draw,
        Some("NC" | "NO_CONTEST") => FightResultStatus::NoContest,
        Some("CANCELLED" | "CANCELED") => FightResultStatus::Cancelled,
        _ => FightResultStatus::Scheduled,
    }
}

fn map_event(event: &ScheduleEvent) -> Option<ExternalEventRecord> {
    let external_id = event.event_id?.to_string();
    let name = non_empty(&event.name).unwrap_or_else(|| "Unknown Event".to_string());
    let Some(date_time_utc) = event.date_time.as_deref().and_then(parse_timestamp) else {
        warn!(provider = PROVIDER_NAME, event = %name, "event without a usable date");
        return None;
    };
    Some(ExternalEventRecord {
        external_id,
        organization_ref: non_empty(&event.league).unwrap_or_else(|| "UFC".to_string()),
        name,
        venue: non_empty(&event.venue),
        city: non_empty(&event.city),
        country: non_empty(&event.country).unwrap_or_else(|| "USA".to_string()),
        date_time_utc,
        status: event_status(event.status.as_deref()),
        description: None,
        poster_url: None,
        is_amateur_event: false,
    })
}

fn map_fighter(fighter: &ApiFighter) -> Option<ExternalFighterRecord> {
    Some(ExternalFighterRecord {
        external_id: fighter.fighter_id?.to_string(),
        first_name: non_empty(&fighter.first_name).unwrap_or_default(),
        last_name: non_empty(&fighter.last_name).unwrap_or_default(),
        nickname: non_empty(&fighter.nickname),
        country: non_empty(&fighter.country).unwrap_or_else(|| UNKNOWN.to_string()),
        city: non_empty(&fighter.city),
        team: non_empty(&fighter.team),
        height_cm: fighter.height_cm,
        reach_cm: fighter.reach_cm,
        stance: Stance::from_loose(fighter.stance.as_deref()),
        weight_class: non_empty(&fighter.weight_class).unwrap_or_else(|| UNKNOWN.to_string()),
        wins: fighter.wins.unwrap_or(0),
        losses: fighter.losses.unwrap_or(0),
        draws: fighter.draws.unwrap_or(0),
        no_contests: fighter.no_contests.unwrap_or(0),
        image_url: non_empty(&fighter.image_url),
    })
}

fn corner(fighter: &ApiFighter) -> Option<FightCorner> {
    let first_name = non_empty(&fighter.first_name)?;
    let last_name = non_empty(&fighter.last_name).unwrap_or_default();
    Some(FightCorner {
        external_id: fighter.fighter_id?.to_string(),
        first_name,
        last_name,
        nickname: non_empty(&fighter.nickname),
        country: non_empty(&fighter.country),
        record: Some(format!(
            "{}-{}-{}",
            fighter.wins.unwrap_or(0),
            fighter.losses.unwrap_or(0),
            fighter.draws.unwrap_or(0)
        )),
        image_url: non_empty(&fighter.image_url),
    })
}

fn map_fight_card(details: &EventDetails, event_external_id: &str) -> Vec<ExternalFightRecord> {
    let fighters: HashMap<i64, &ApiFighter> = details
        .fighters
        .iter()
        .filter_map(|f| Some((f.fighter_id?, f)))
        .collect();

    let mut fights = Vec::new();
    for (index, fight) in details.fights.iter().enumerate() {
        let lookup = |id: Option<i64>| id.and_then(|id| fighters.get(&id)).and_then(|f| corner(f));
        let (Some(fighter_a), Some(fighter_b)) = (lookup(fight.fighter_id_a), lookup(fight.fighter_id_b)) else {
            warn!(provider = PROVIDER_NAME, event = event_external_id, index, "fight without both fighters, skipped");
            continue;
        };
        let position = fight
            .order
            .and_then(|o| usize::try_from(o).ok())
            .unwrap_or(index);
        let status = fight_status(fight.result_status.as_deref());
        let winner_external_id = fight.winner_id.map(|id| id.to_string());
        let result = (status != FightResultStatus::Scheduled || winner_external_id.is_some()).then(|| {
            FightOutcome {
                status: if status == FightResultStatus::Scheduled {
                    FightResultStatus::Completed
                } else {
                    status
                },
                winner_external_id,
                method: non_empty(&fight.method),
                round: fight.round,
                time: non_empty(&fight.time),
            }
        });

        fights.push(ExternalFightRecord {
            external_id: fight
                .fight_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| format!("{event_external_id}-{}-vs-{}", fighter_a.external_id, fighter_b.external_id)),
            event_external_id: event_external_id.to_string(),
            fighter_a,
            fighter_b,
            weight_class: non_empty(&fight.weight_class).unwrap_or_else(|| UNKNOWN.to_string()),
            is_title_fight: fight.is_title_fight.unwrap_or(false),
            is_main_event: fight.is_main_event.unwrap_or(false),
            is_co_main_event: fight.is_co_main_event.unwrap_or(false),
            section: CardSection::Main,
            order: CardSection::Main.ordinal(position),
            result,
        });
    }
    fights
}

#[derive(Debug, Clone)]
pub struct SportsDataIoProvider {
    http: Arc<HttpFetcher>,
    config: SportsDataIoConfig,
}

impl SportsDataIoProvider {
    pub fn new(http: Arc<HttpFetcher>, config: SportsDataIoConfig) -> Self {
        Self { http, config }
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    fn url(&self, path: &str, key: &str) -> String {
        format!(
            "{}/scores/json/{path}?key={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(key)
        )
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AdapterError> {
        let key = self
            .api_key()
            .ok_or_else(|| AdapterError::Message(format!("{PROVIDER_NAME} API key not configured")))?;
        let url = self.url(path, key);
        Ok(self.http.get_json_with_retry(PROVIDER_NAME, &url).await?)
    }

    /// Season schedule; empty when the key is missing or the API keeps failing.
    async fn schedule(&self) -> Vec<ExternalEventRecord> {
        if self.api_key().is_none() {
            warn!(provider = PROVIDER_NAME, "API key not configured");
            return Vec::new();
        }
        match self
            .get::<Vec<ScheduleEvent>>(&format!("Schedule/{}", self.config.season))
            .await
        {
            Ok(events) => events.iter().filter_map(map_event).collect(),
            Err(err) => {
                error!(provider = PROVIDER_NAME, error = %err, "schedule unavailable");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl MmaProvider for SportsDataIoProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::AuthenticatedApi
    }

    async fn fetch_upcoming_events(&self) -> Vec<ExternalEventRecord> {
        let now = Utc::now();
        let mut events: Vec<_> = self
            .schedule()
            .await
            .into_iter()
            .filter(|e| e.status != EventStatus::Completed && e.date_time_utc >= now)
            .collect();
        events.sort_by_key(|e| e.date_time_utc);
        events
    }

    async fn fetch_past_events(&self, limit: usize) -> Vec<ExternalEventRecord> {
        let mut events: Vec<_> = self
            .schedule()
            .await
            .into_iter()
            .filter(|e| e.status == EventStatus::Completed)
            .collect();
        events.sort_by(|a, b| b.date_time_utc.cmp(&a.date_time_utc));
        events.truncate(limit);
        events
    }

    async fn fetch_fight_card(
        &self,
        event_external_id: &str,
    ) -> Result<Vec<ExternalFightRecord>, AdapterError> {
        let details: EventDetails = self
            .get(&format!("Event/{}", urlencoding::encode(event_external_id)))
            .await
            .inspect_err(|err| {
                error!(provider = PROVIDER_NAME, event = event_external_id, error = %err, "event details unavailable")
            })?;
        let fights = map_fight_card(&details, event_external_id);
        debug!(provider = PROVIDER_NAME, event = event_external_id, fights = fights.len(), "fight card mapped");
        Ok(fights)
    }

    async fn fetch_organizations(&self) -> Vec<ExternalOrganizationRecord> {
        if self.api_key().is_none() {
            warn!(provider = PROVIDER_NAME, "API key not configured");
            return Vec::new();
        }
        let leagues: Vec<ApiLeague> = match self.get("Leagues").await {
            Ok(leagues) => leagues,
            Err(err) => {
                error!(provider = PROVIDER_NAME, error = %err, "leagues unavailable");
                return Vec::new();
            }
        };
        leagues
            .iter()
            .filter_map(|league| {
                let name = non_empty(&league.name)?;
                Some(ExternalOrganizationRecord {
                    external_id: league
                        .league_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| name.clone()),
                    short_name: non_empty(&league.key).unwrap_or_else(|| name.clone()),
                    name,
                    country: "USA".to_string(),
                    city: None,
                    website_url: None,
                    logo_url: None,
                    level: OrganizationLevel::Major,
                })
            })
            .collect()
    }

    async fn health_check(&self) -> bool {
        if self.api_key().is_none() {
            return false;
        }
        self.get::<serde_json::Value>("Leagues").await.is_ok()
    }

    fn fighter_search(&self) -> Option<&dyn FighterSearch> {
        Some(self)
    }
}

#[async_trait]
impl FighterSearch for SportsDataIoProvider {
    async fn search_fighters(&self, query: &str) -> Vec<ExternalFighterRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || self.api_key().is_none() {
            return Vec::new();
        }
        match self.get::<Vec<ApiFighter>>("Fighters").await {
            Ok(fighters) => fighters
                .iter()
                .filter_map(map_fighter)
                .filter(|f| {
                    format!("{} {}", f.first_name, f.last_name)
                        .to_lowercase()
                        .contains(&needle)
                })
                .collect(),
            Err(err) => {
                error!(provider = PROVIDER_NAME, error = %err, "fighter list unavailable");
                Vec::new()
            }
        }
    }

    async fn fetch_fighter(&self, external_id: &str) -> Option<ExternalFighterRecord> {
        if self.api_key().is_none() {
            warn!(provider = PROVIDER_NAME, "API key not configured");
            return None;
        }
        match self
            .get::<ApiFighter>(&format!("Fighter/{}", urlencoding::encode(external_id)))
            .await
        {
            Ok(fighter) => map_fighter(&fighter),
            Err(err) => {
                error!(provider = PROVIDER_NAME, fighter = external_id, error = %err, "fighter unavailable");
                None
            }
        }
    }
}
