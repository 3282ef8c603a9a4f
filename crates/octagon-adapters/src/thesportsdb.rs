//! TheSportsDB public JSON API, one league id per promotion.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use octagon_core::{
    EventStatus, ExternalEventRecord, ExternalFightRecord, ExternalFighterRecord,
    ExternalOrganizationRecord, OrganizationLevel, Stance, UNKNOWN,
};
use octagon_storage::HttpFetcher;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::extract;
use crate::{json_str, parse_timestamp, AdapterError, FighterSearch, MmaProvider, SourceKind};

pub const PROVIDER_NAME: &str = "TheSportsDB";
pub const DEFAULT_BASE_URL: &str = "https://www.thesportsdb.com/api/v1/json/3";

/// Promotion short name and its league id.
pub const LEAGUES: [(&str, &str); 4] = [
    ("UFC", "4443"),
    ("Bellator", "4444"),
    ("ONE", "4445"),
    ("PFL", "4489"),
];

#[derive(Debug, Clone)]
pub struct TheSportsDbProvider {
    http: Arc<HttpFetcher>,
    base_url: String,
}

impl TheSportsDbProvider {
    pub fn new(http: Arc<HttpFetcher>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Arc<HttpFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_json(&self, path: &str) -> Option<JsonValue> {
        let url = format!("{}/{path}", self.base_url);
        match self.http.get_json(PROVIDER_NAME, &url).await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(provider = PROVIDER_NAME, error = %err, "request failed, skipping");
                None
            }
        }
    }

    async fn league_events(&self, endpoint: &str, league: &str, org: &str) -> Vec<ExternalEventRecord> {
        let Some(data) = self.fetch_json(&format!("{endpoint}?id={league}")).await else {
            return Vec::new();
        };
        items(&data, "events")
            .iter()
            .filter_map(|event| map_event(event, org))
            .collect()
    }

    pub async fn fetch_event(&self, external_id: &str) -> Option<ExternalEventRecord> {
        let data = self
            .fetch_json(&format!("lookupevent.php?id={}", urlencoding::encode(external_id)))
            .await?;
        let event = items(&data, "events").first()?;
        let org = json_str(event, &["idLeague"])
            .and_then(short_name_for_league)
            .or_else(|| json_str(event, &["strLeague"]))
            .unwrap_or(UNKNOWN)
            .to_string();
        map_event(event, &org)
    }
}

fn items<'a>(data: &'a JsonValue, key: &str) -> &'a [JsonValue] {
    data.get(key)
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn short_name_for_league(league_id: &str) -> Option<&'static str> {
    LEAGUES
        .iter()
        .find(|(_, id)| *id == league_id)
        .map(|(name, _)| *name)
}

fn map_event(event: &JsonValue, org: &str) -> Option<ExternalEventRecord> {
    let external_id = json_str(event, &["idEvent"])?.to_string();
    let name = json_str(event, &["strEvent"])
        .or_else(|| json_str(event, &["strEventAlternate"]))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{org} Event"));
    let Some(date_time_utc) = event_timestamp(event) else {
        warn!(provider = PROVIDER_NAME, event = %name, "event without a usable date");
        return None;
    };

    Some(ExternalEventRecord {
        external_id,
        organization_ref: org.to_string(),
        name,
        venue: json_str(event, &["strVenue"]).map(str::to_string),
        city: json_str(event, &["strCity"]).map(str::to_string),
        country: json_str(event, &["strCountry"]).unwrap_or("USA").to_string(),
        date_time_utc,
        status: event_status(event),
        description: json_str(event, &["strDescriptionEN"]).map(str::to_string),
        poster_url: json_str(event, &["strPoster"])
            .or_else(|| json_str(event, &["strThumb"]))
            .map(str::to_string),
        is_amateur_event: false,
    })
}

/// `strTimestamp`, else `dateEvent` + `strTime`, else midnight of `dateEvent`.
fn event_timestamp(event: &JsonValue) -> Option<DateTime<Utc>> {
    if let Some(ts) = json_str(event, &["strTimestamp"]) {
        if let Some(parsed) = parse_timestamp(ts) {
            return Some(parsed);
        }
    }
    let date = NaiveDate::parse_from_str(json_str(event, &["dateEvent"])?, "%Y-%m-%d").ok()?;
    let time = json_str(event, &["strTime"])
        .and_then(|t| {
            NaiveTime::parse_from_str(t, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
                .ok()
        })
        .unwrap_or(NaiveTime::MIN);
    Some(date.and_time(time).and_utc())
}

fn event_status(event: &JsonValue) -> EventStatus {
    let status = json_str(event, &["strStatus"]);
    let has_score = event
        .get("intHomeScore")
        .is_some_and(|score| !score.is_null());
    match status {
        Some("Match Finished") => EventStatus::Completed,
        _ if has_score => EventStatus::Completed,
        Some("Cancelled" | "Postponed") => EventStatus::Cancelled,
        _ => EventStatus::Scheduled,
    }
}

fn map_fighter(player: &JsonValue) -> Option<ExternalFighterRecord> {
    let external_id = json_str(player, &["idPlayer"])?.to_string();
    let (first_name, last_name) = extract::split_full_name(json_str(player, &["strPlayer"])?);
    let weight_class = json_str(player, &["strWeight"])
        .and_then(extract::parse_weight_pounds)
        .map(|lbs| extract::weight_class_for_pounds(lbs).to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let stance = match json_str(player, &["strSide"]) {
        Some(side) => Stance::from_loose(Some(side)),
        None => Stance::Orthodox,
    };

    Some(ExternalFighterRecord {
        external_id,
        first_name,
        last_name,
        nickname: None,
        country: json_str(player, &["strNationality"]).unwrap_or(UNKNOWN).to_string(),
        city: json_str(player, &["strBirthLocation"]).map(str::to_string),
        team: json_str(player, &["strTeam"]).map(str::to_string),
        height_cm: json_str(player, &["strHeight"]).and_then(extract::parse_height_cm),
        reach_cm: None,
        stance,
        weight_class,
        wins: 0,
        losses: 0,
        draws: 0,
        no_contests: 0,
        image_url: json_str(player, &["strThumb"])
            .or_else(|| json_str(player, &["strCutout"]))
            .map(str::to_string),
    })
}

fn is_mma_player(player: &JsonValue) -> bool {
    let sport = json_str(player, &["strSport"]).unwrap_or_default().to_lowercase();
    let position = json_str(player, &["strPosition"]).unwrap_or_default().to_lowercase();
    sport.contains("mma") || sport.contains("fighting") || position.contains("fighter")
}

#[async_trait]
impl MmaProvider for TheSportsDbProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::PublicApi
    }

    async fn fetch_upcoming_events(&self) -> Vec<ExternalEventRecord> {
        let mut events = Vec::new();
        for (org, league) in LEAGUES {
            events.extend(self.league_events("eventsnextleague.php", league, org).await);
        }
        events.sort_by_key(|e| e.date_time_utc);
        events
    }

    async fn fetch_past_events(&self, limit: usize) -> Vec<ExternalEventRecord> {
        let mut events = Vec::new();
        for (org, league) in LEAGUES {
            let league_events = self.league_events("eventspastleague.php", league, org).await;
            events.extend(league_events.into_iter().take(limit));
        }
        events.sort_by(|a, b| b.date_time_utc.cmp(&a.date_time_utc));
        events.truncate(limit);
        events
    }

    /// No per-fight data on this API.
    async fn fetch_fight_card(
        &self,
        event_external_id: &str,
    ) -> Result<Vec<ExternalFightRecord>, AdapterError> {
        debug!(provider = PROVIDER_NAME, event = event_external_id, "fight cards not offered");
        Ok(Vec::new())
    }

    async fn fetch_organizations(&self) -> Vec<ExternalOrganizationRecord> {
        let mut orgs = Vec::new();
        for (org, league_id) in LEAGUES {
            let Some(data) = self.fetch_json(&format!("lookupleague.php?id={league_id}")).await else {
                continue;
            };
            let Some(league) = items(&data, "leagues").first() else {
                continue;
            };
            let Some(name) = json_str(league, &["strLeague"]) else {
                continue;
            };
            orgs.push(ExternalOrganizationRecord {
                external_id: json_str(league, &["idLeague"]).unwrap_or(league_id).to_string(),
                name: name.to_string(),
                short_name: org.to_string(),
                country: json_str(league, &["strCountry"]).unwrap_or("USA").to_string(),
                city: None,
                website_url: json_str(league, &["strWebsite"]).map(|site| format!("https://{site}")),
                logo_url: json_str(league, &["strBadge"])
                    .or_else(|| json_str(league, &["strLogo"]))
                    .map(str::to_string),
                level: if org == "UFC" {
                    OrganizationLevel::Major
                } else {
                    OrganizationLevel::Regional
                },
            });
        }
        orgs
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/lookupleague.php?id={}", self.base_url, LEAGUES[0].1);
        self.http
            .get(PROVIDER_NAME, &url, &[])
            .await
            .is_ok_and(|resp| resp.is_success())
    }

    fn fighter_search(&self) -> Option<&dyn FighterSearch> {
        Some(self)
    }
}

#[async_trait]
impl FighterSearch for TheSportsDbProvider {
    async fn search_fighters(&self, query: &str) -> Vec<ExternalFighterRecord> {
        let mut fighters = Vec::new();
        for (org, _) in LEAGUES {
            let path = format!(
                "searchplayers.php?t={}&p={}",
                urlencoding::encode(org),
                urlencoding::encode(query)
            );
            let Some(data) = self.fetch_json(&path).await else {
                continue;
            };
            fighters.extend(
                items(&data, "player")
                    .iter()
                    .filter(|p| is_mma_player(p))
                    .filter_map(map_fighter),
            );
        }
        fighters
    }

    async fn fetch_fighter(&self, external_id: &str) -> Option<ExternalFighterRecord> {
        let data = self
            .fetch_json(&format!("lookupplayer.php?id={}", urlencoding::encode(external_id)))
            .await?;
        items(&data, "players").first().and_then(map_fighter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octagon_storage::{HttpClientConfig, ScriptedTransport};

    const BASE: &str = "https://tsdb.test";

    fn provider(transport: Arc<ScriptedTransport>) -> TheSportsDbProvider {
        let http = HttpFetcher::with_transport(transport, &HttpClientConfig::default());
        TheSportsDbProvider::with_base_url(Arc::new(http), BASE)
    }

    #[tokio::test]
    async fn upcoming_events_merge_leagues_by_date() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .respond(
                format!("{BASE}/eventsnextleague.php?id=4443"),
                200,
                r#"{"events":[{"idEvent":"2","strEvent":"UFC 320","strTimestamp":"2025-10-04T22:00:00",
                               "strVenue":"T-Mobile Arena","strCity":"Las Vegas"}]}"#,
            )
            .respond(
                format!("{BASE}/eventsnextleague.php?id=4489"),
                200,
                r#"{"events":[{"idEvent":"9","strEventAlternate":"PFL 10","dateEvent":"2025-09-01","strTime":"19:30",
                               "strCountry":"Saudi Arabia","strStatus":"Postponed"}]}"#,
            )
            .respond(format!("{BASE}/eventsnextleague.php?id=4444"), 200, r#"{"events":null}"#);

        let events = provider(transport).fetch_upcoming_events().await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "PFL 10");
        assert_eq!(events[0].organization_ref, "PFL");
        assert_eq!(events[0].status, EventStatus::Cancelled);
        assert_eq!(events[0].country, "Saudi Arabia");
        assert_eq!(events[1].organization_ref, "UFC");
        assert_eq!(events[1].country, "USA");
        assert_eq!(events[1].venue.as_deref(), Some("T-Mobile Arena"));
    }

    #[tokio::test]
    async fn past_events_are_newest_first_and_limited() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            format!("{BASE}/eventspastleague.php?id=4443"),
            200,
            r#"{"events":[
                {"idEvent":"1","strEvent":"UFC 308","dateEvent":"2024-10-26","intHomeScore":"1"},
                {"idEvent":"2","strEvent":"UFC 309","dateEvent":"2024-11-16","strStatus":"Match Finished"},
                {"idEvent":"3","strEvent":"UFC 307","dateEvent":"2024-10-05"}
            ]}"#,
        );

        let events = provider(transport).fetch_past_events(2).await;

        let names: Vec<_> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["UFC 309", "UFC 308"]);
        assert!(events.iter().all(|e| e.status == EventStatus::Completed));
    }

    #[tokio::test]
    async fn organizations_from_league_lookup() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            format!("{BASE}/lookupleague.php?id=4443"),
            200,
            r#"{"leagues":[{"idLeague":"4443","strLeague":"UFC","strWebsite":"www.ufc.com",
                            "strLogo":"https://img.test/logo.png"}]}"#,
        );
        transport.respond(
            format!("{BASE}/lookupleague.php?id=4444"),
            200,
            r#"{"leagues":[{"idLeague":"4444","strLeague":"Bellator MMA","strCountry":"United States"}]}"#,
        );

        let orgs = provider(transport).fetch_organizations().await;

        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[0].website_url.as_deref(), Some("https://www.ufc.com"));
        assert_eq!(orgs[0].logo_url.as_deref(), Some("https://img.test/logo.png"));
        assert_eq!(orgs[0].level, OrganizationLevel::Major);
        assert_eq!(orgs[1].short_name, "Bellator");
        assert_eq!(orgs[1].level, OrganizationLevel::Regional);
    }

    #[tokio::test]
    async fn fighter_search_filters_and_maps() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            format!("{BASE}/searchplayers.php?t=UFC&p=Jon%20Jones"),
            200,
            r#"{"player":[
                {"idPlayer":"34145","strPlayer":"Jon Jones","strSport":"Fighting","strHeight":"6 ft 4 in",
                 "strWeight":"248 lbs","strNationality":"United States","strSide":"Orthodox"},
                {"idPlayer":"1","strPlayer":"Jon Jones","strSport":"Soccer","strPosition":"Midfielder"}
            ]}"#,
        );
        let tsdb = provider(transport);

        let search = tsdb.fighter_search().unwrap();
        let fighters = search.search_fighters("Jon Jones").await;

        assert_eq!(fighters.len(), 1);
        let jones = &fighters[0];
        assert_eq!(jones.height_cm, Some(193));
        assert_eq!(jones.weight_class, "Heavyweight");
        assert_eq!(jones.stance, Stance::Orthodox);
        assert_eq!(jones.last_name, "Jones");
        assert!(tsdb.fetch_fight_card("2").await.unwrap().is_empty());
    }

    #[test]
    fn missing_side_defaults_to_orthodox() {
        let player = serde_json::json!({"idPlayer": "7", "strPlayer": "Kai Asakura"});
        let fighter = map_fighter(&player).unwrap();
        assert_eq!(fighter.stance, Stance::Orthodox);
        assert_eq!(fighter.weight_class, UNKNOWN);
        assert_eq!(fighter.country, UNKNOWN);
    }
}
