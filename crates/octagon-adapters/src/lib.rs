//! Provider capability contracts + the provider adapters that fulfil them.
//!
//! Event providers implement [`MmaProvider`]. Listing calls never fail: an
//! unreachable or malformed source degrades to an empty or static list, logged
//! at `warn`. Only [`MmaProvider::fetch_fight_card`] reports errors, and only
//! for sources that retry before giving up.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use octagon_core::{
    ExternalEventRecord, ExternalFightRecord, ExternalFighterRecord, ExternalOrganizationRecord,
    FightCorner, Stance, UNKNOWN,
};
use octagon_storage::FetchError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod extract;
pub mod roster;
pub mod sportsdataio;
pub mod thesportsdb;
pub mod ufc;

pub use roster::{AthleteDetails, ListingRecord, RosterAthlete, RosterSource, UfcRosterScraper};
pub use sportsdataio::SportsDataIoProvider;
pub use thesportsdb::TheSportsDbProvider;
pub use ufc::UfcScraperProvider;

pub const CRATE_NAME: &str = "octagon-adapters";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    AuthenticatedApi,
    PublicApi,
    HtmlScrape,
    StaticFallback,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[async_trait]
pub trait MmaProvider: Send + Sync {
    /// Key under which this provider's ids are merged into `external_ids`.
    fn provider_name(&self) -> &'static str;
    fn source_kind(&self) -> SourceKind;

    async fn fetch_upcoming_events(&self) -> Vec<ExternalEventRecord>;

    /// At most `limit` records.
    async fn fetch_past_events(&self, limit: usize) -> Vec<ExternalEventRecord>;

    async fn fetch_fight_card(
        &self,
        event_external_id: &str,
    ) -> Result<Vec<ExternalFightRecord>, AdapterError>;

    async fn fetch_organizations(&self) -> Vec<ExternalOrganizationRecord>;

    async fn health_check(&self) -> bool;

    /// Optional per-fighter lookups.
    fn fighter_search(&self) -> Option<&dyn FighterSearch> {
        None
    }
}

#[async_trait]
pub trait FighterSearch: Send + Sync {
    async fn search_fighters(&self, query: &str) -> Vec<ExternalFighterRecord>;
    async fn fetch_fighter(&self, external_id: &str) -> Option<ExternalFighterRecord>;
}

/// Fighter observation derived from one corner of a fight card.
pub fn fighter_from_corner(corner: &FightCorner, weight_class: &str) -> ExternalFighterRecord {
    let record = corner
        .record
        .as_deref()
        .map(extract::parse_record)
        .unwrap_or_default();
    ExternalFighterRecord {
        external_id: corner.external_id.clone(),
        first_name: corner.first_name.clone(),
        last_name: corner.last_name.clone(),
        nickname: corner.nickname.clone(),
        country: corner.country.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        city: None,
        team: None,
        height_cm: None,
        reach_cm: None,
        stance: Stance::Unknown,
        weight_class: weight_class.to_string(),
        wins: record.wins,
        losses: record.losses,
        draws: record.draws,
        no_contests: 0,
        image_url: corner.image_url.clone(),
    }
}

pub(crate) fn json_str<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// String or numeric id.
pub(crate) fn json_id(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM:SS` read as UTC.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_record_feeds_fighter_counts() {
        let corner = FightCorner {
            external_id: "alexandre-pantoja".into(),
            first_name: "Alexandre".into(),
            last_name: "Pantoja".into(),
            nickname: None,
            country: None,
            record: Some("28-5-0".into()),
            image_url: None,
        };
        let fighter = fighter_from_corner(&corner, "Flyweight");
        assert_eq!((fighter.wins, fighter.losses, fighter.draws), (28, 5, 0));
        assert_eq!(fighter.country, UNKNOWN);
        assert_eq!(fighter.weight_class, "Flyweight");
    }

    #[test]
    fn timestamps_with_and_without_zone() {
        let zoned = parse_timestamp("2024-12-07T22:00:00Z").unwrap();
        assert_eq!(parse_timestamp("2024-12-07T22:00:00"), Some(zoned));
        assert_eq!(parse_timestamp("2024-12-07T23:00:00+01:00"), Some(zoned));
        assert_eq!(parse_timestamp("next week"), None);
    }

    #[test]
    fn json_paths() {
        let value = serde_json::json!({"content": {"name": " UFC 310 ", "blank": ""}});
        assert_eq!(json_str(&value, &["content", "name"]), Some("UFC 310"));
        assert_eq!(json_str(&value, &["content", "blank"]), None);
        assert_eq!(json_str(&value, &["missing"]), None);
        assert_eq!(json_id(Some(&serde_json::json!(1234))).as_deref(), Some("1234"));
        assert_eq!(json_id(Some(&serde_json::json!(" ufc-310 "))).as_deref(), Some("ufc-310"));
        assert_eq!(json_id(None), None);
    }
}
