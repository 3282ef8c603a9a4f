//! UFC website adapter: public JSON event listing, scraped fight cards, and a
//! static fallback table used whenever the listing is unavailable.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use octagon_core::{
    slugify, EventStatus, ExternalEventRecord, ExternalFightRecord, ExternalOrganizationRecord,
    OrganizationLevel,
};
use octagon_storage::HttpFetcher;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::{extract, json_id, json_str, parse_timestamp, AdapterError, MmaProvider, SourceKind};

pub const PROVIDER_NAME: &str = "UFC";
pub const DEFAULT_BASE_URL: &str = "https://www.ufc.com";

struct FallbackEvent {
    external_id: &'static str,
    name: &'static str,
    date_time_utc: &'static str,
    venue: &'static str,
    city: &'static str,
    country: &'static str,
    description: &'static str,
}

const UPCOMING_FALLBACK: [FallbackEvent; 5] = [
    FallbackEvent {
        external_id: "ufc-310",
        name: "UFC 310: Pantoja vs. Asakura",
        date_time_utc: "2024-12-07T22:00:00Z",
        venue: "T-Mobile Arena",
        city: "Las Vegas",
        country: "USA",
        description: "UFC Flyweight Championship: Alexandre Pantoja vs Kai Asakura",
    },
    FallbackEvent {
        external_id: "ufc-fn-247",
        name: "UFC Fight Night: Moreno vs. Albazi",
        date_time_utc: "2024-12-14T22:00:00Z",
        venue: "UFC APEX",
        city: "Las Vegas",
        country: "USA",
        description: "UFC Flyweight: Brandon Moreno vs Amir Albazi",
    },
    FallbackEvent {
        external_id: "ufc-311",
        name: "UFC 311: Makhachev vs. Tsarukyan",
        date_time_utc: "2025-01-18T22:00:00Z",
        venue: "Intuit Dome",
        city: "Inglewood",
        country: "USA",
        description: "UFC Lightweight Championship: Islam Makhachev vs Arman Tsarukyan",
    },
    FallbackEvent {
        external_id: "ufc-312",
        name: "UFC 312: Du Plessis vs. Strickland 2",
        date_time_utc: "2025-02-08T04:00:00Z",
        venue: "Qudos Bank Arena",
        city: "Sydney",
        country: "Australia",
        description: "UFC Middleweight Championship: Dricus Du Plessis vs Sean Strickland",
    },
    FallbackEvent {
        external_id: "ufc-313",
        name: "UFC 313: Pereira vs. Ankalaev",
        date_time_utc: "2025-03-08T23:00:00Z",
        venue: "T-Mobile Arena",
        city: "Las Vegas",
        country: "USA",
        description: "UFC Light Heavyweight Championship: Alex Pereira vs Magomed Ankalaev",
    },
];

const PAST_FALLBACK: [FallbackEvent; 2] = [
    FallbackEvent {
        external_id: "ufc-309",
        name: "UFC 309: Jones vs. Miocic",
        date_time_utc: "2024-11-16T22:00:00Z",
        venue: "Madison Square Garden",
        city: "New York",
        country: "USA",
        description: "UFC Heavyweight Championship: Jon Jones vs Stipe Miocic",
    },
    FallbackEvent {
        external_id: "ufc-308",
        name: "UFC 308: Topuria vs. Holloway",
        date_time_utc: "2024-10-26T18:00:00Z",
        venue: "Etihad Arena",
        city: "Abu Dhabi",
        country: "UAE",
        description: "UFC Featherweight Championship: Ilia Topuria vs Max Holloway",
    },
];

impl FallbackEvent {
    fn to_record(&self, status: EventStatus) -> Option<ExternalEventRecord> {
        Some(ExternalEventRecord {
            external_id: self.external_id.to_string(),
            organization_ref: PROVIDER_NAME.to_string(),
            name: self.name.to_string(),
            venue: Some(self.venue.to_string()),
            city: Some(self.city.to_string()),
            country: self.country.to_string(),
            date_time_utc: parse_timestamp(self.date_time_utc)?,
            status,
            description: Some(self.description.to_string()),
            poster_url: None,
            is_amateur_event: false,
        })
    }
}

fn fallback(table: &[FallbackEvent], status: EventStatus) -> Vec<ExternalEventRecord> {
    table.iter().filter_map(|e| e.to_record(status)).collect()
}

/// Curated promotions; the UFC site has no organization feed.
pub fn curated_organizations() -> Vec<ExternalOrganizationRecord> {
    let org = |id: &str, name: &str, short: &str, country: &str, city: &str, site: &str| {
        ExternalOrganizationRecord {
            external_id: id.to_string(),
            name: name.to_string(),
            short_name: short.to_string(),
            country: country.to_string(),
            city: Some(city.to_string()),
            website_url: Some(site.to_string()),
            logo_url: None,
            level: OrganizationLevel::Major,
        }
    };
    let mut ufc = org(
        "UFC",
        "Ultimate Fighting Championship",
        "UFC",
        "USA",
        "Las Vegas",
        "https://www.ufc.com",
    );
    ufc.logo_url = Some(
        "https://upload.wikimedia.org/wikipedia/commons/thumb/9/92/UFC_Logo.svg/1200px-UFC_Logo.svg.png"
            .to_string(),
    );
    vec![
        ufc,
        org("BELLATOR", "Bellator MMA", "Bellator", "USA", "Hollywood", "https://www.bellator.com"),
        org("ONE", "ONE Championship", "ONE", "Singapore", "Singapore", "https://www.onefc.com"),
        org(
            "PFL",
            "Professional Fighters League",
            "PFL",
            "USA",
            "New York",
            "https://www.pflmma.com",
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct UfcScraperProvider {
    http: Arc<HttpFetcher>,
    base_url: String,
}

impl UfcScraperProvider {
    pub fn new(http: Arc<HttpFetcher>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Arc<HttpFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn listing_url(&self, upcoming: bool) -> String {
        format!("{}/api/v1/events?is_upcoming={upcoming}", self.base_url)
    }

    /// Live listing; `None` on any failure so callers can fall back.
    async fn fetch_listing(&self, upcoming: bool) -> Option<Vec<ExternalEventRecord>> {
        let url = self.listing_url(upcoming);
        let data: JsonValue = match self.http.get_json(PROVIDER_NAME, &url).await {
            Ok(data) => data,
            Err(err) => {
                warn!(provider = PROVIDER_NAME, error = %err, "event listing unavailable");
                return None;
            }
        };
        let status = if upcoming {
            EventStatus::Scheduled
        } else {
            EventStatus::Completed
        };
        let events: Vec<ExternalEventRecord> = data
            .pointer("/content/eventList")
            .and_then(JsonValue::as_array)
            .map(|items| items.iter().filter_map(|item| map_listing_event(item, status)).collect())
            .unwrap_or_default();
        debug!(provider = PROVIDER_NAME, upcoming, count = events.len(), "event listing parsed");
        Some(events)
    }
}

/// Listing events are keyed by their `/event/{slug}` page so the fight card
/// can be fetched from the same id. Numeric ids are the last resort.
fn map_listing_event(item: &JsonValue, status: EventStatus) -> Option<ExternalEventRecord> {
    let name = json_str(item, &["name"]).or_else(|| json_str(item, &["title"]))?;
    let external_id = ["url", "link", "eventUrl"]
        .iter()
        .find_map(|key| json_str(item, &[*key]).and_then(event_page_slug))
        .or_else(|| Some(slugify(name)).filter(|slug| !slug.is_empty()))
        .or_else(|| json_id(item.get("eventId")))
        .or_else(|| json_id(item.get("id")))?;
    let date_time_utc = item
        .get("startTime")
        .or_else(|| item.get("eventDttm"))
        .and_then(timestamp_value);
    let Some(date_time_utc) = date_time_utc else {
        warn!(provider = PROVIDER_NAME, event = name, "listing event without a usable start time");
        return None;
    };
    Some(ExternalEventRecord {
        external_id,
        organization_ref: PROVIDER_NAME.to_string(),
        name: name.to_string(),
        venue: json_str(item, &["venue"]).map(str::to_string),
        city: json_str(item, &["city"]).map(str::to_string),
        country: json_str(item, &["country"]).unwrap_or("USA").to_string(),
        date_time_utc,
        status,
        description: None,
        poster_url: json_str(item, &["posterImage"]).map(str::to_string),
        is_amateur_event: false,
    })
}

fn event_page_slug(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?.trim_end_matches('/');
    let (_, slug) = path.rsplit_once("/event/")?;
    (!slug.is_empty() && !slug.contains('/')).then(|| slug.to_string())
}

fn timestamp_value(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::String(s) => parse_timestamp(s),
        JsonValue::Number(n) => Utc.timestamp_opt(n.as_i64()?, 0).single(),
        _ => None,
    }
}

#[async_trait]
impl MmaProvider for UfcScraperProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::HtmlScrape
    }

    async fn fetch_upcoming_events(&self) -> Vec<ExternalEventRecord> {
        match self.fetch_listing(true).await {
            Some(events) if !events.is_empty() => events,
            _ => {
                info!(provider = PROVIDER_NAME, "using fallback upcoming events");
                fallback(&UPCOMING_FALLBACK, EventStatus::Scheduled)
            }
        }
    }

    async fn fetch_past_events(&self, limit: usize) -> Vec<ExternalEventRecord> {
        let mut events = match self.fetch_listing(false).await {
            Some(events) if !events.is_empty() => events,
            _ => {
                info!(provider = PROVIDER_NAME, "using fallback past events");
                fallback(&PAST_FALLBACK, EventStatus::Completed)
            }
        };
        events.sort_by(|a, b| b.date_time_utc.cmp(&a.date_time_utc));
        events.truncate(limit);
        events
    }

    async fn fetch_fight_card(
        &self,
        event_external_id: &str,
    ) -> Result<Vec<ExternalFightRecord>, AdapterError> {
        let url = format!("{}/event/{event_external_id}", self.base_url);
        let html = match self.http.get_text(PROVIDER_NAME, &url, &[]).await {
            Ok(html) => html,
            Err(err) => {
                warn!(provider = PROVIDER_NAME, event = event_external_id, error = %err, "fight card unavailable");
                return Ok(Vec::new());
            }
        };
        let fights = extract::parse_fight_card(&html, event_external_id)?;
        debug!(provider = PROVIDER_NAME, event = event_external_id, fights = fights.len(), "fight card parsed");
        Ok(fights)
    }

    async fn fetch_organizations(&self) -> Vec<ExternalOrganizationRecord> {
        curated_organizations()
    }

    async fn health_check(&self) -> bool {
        match self.http.get(PROVIDER_NAME, &self.base_url, &[]).await {
            Ok(resp) => resp.is_success(),
            Err(err) => {
                debug!(provider = PROVIDER_NAME, error = %err, "health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octagon_storage::{HttpClientConfig, ScriptedTransport};

    const BASE: &str = "https://ufc.test";

    fn provider(transport: Arc<ScriptedTransport>) -> UfcScraperProvider {
        let http = HttpFetcher::with_transport(transport, &HttpClientConfig::default());
        UfcScraperProvider::with_base_url(Arc::new(http), BASE)
    }

    #[tokio::test]
    async fn server_error_falls_back_to_static_events() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(format!("{BASE}/api/v1/events?is_upcoming=true"), 500, "");

        let events = provider(transport).fetch_upcoming_events().await;

        assert_eq!(events.len(), 5);
        assert_eq!(events[0].external_id, "ufc-310");
        assert_eq!(events[0].organization_ref, "UFC");
        assert!(events.iter().all(|e| e.status == EventStatus::Scheduled));
    }

    #[tokio::test]
    async fn empty_listing_falls_back_too() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            format!("{BASE}/api/v1/events?is_upcoming=true"),
            200,
            r#"{"content":{"eventList":[]}}"#,
        );
        assert_eq!(provider(transport).fetch_upcoming_events().await.len(), 5);
    }

    #[tokio::test]
    async fn live_listing_is_mapped() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            format!("{BASE}/api/v1/events?is_upcoming=true"),
            200,
            r#"{"content":{"eventList":[
                {"eventId": 1234, "name": "UFC 320: Ankalaev vs. Pereira 2",
                 "url": "https://www.ufc.com/event/ufc-320?lang=en",
                 "startTime": "2025-10-04T22:00:00Z", "venue": "T-Mobile Arena",
                 "city": "Las Vegas", "posterImage": "https://img.test/320.jpg"},
                {"eventId": 1240, "name": "UFC Fight Night: Oliveira vs. Gamrot",
                 "startTime": "2025-10-11T22:00:00Z"},
                {"id": "no-date", "title": "Broken"}
            ]}}"#,
        );

        let events = provider(transport).fetch_upcoming_events().await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].external_id, "ufc-fight-night-oliveira-vs-gamrot");
        let event = &events[0];
        assert_eq!(event.external_id, "ufc-320");
        assert_eq!(event.country, "USA");
        assert_eq!(event.poster_url.as_deref(), Some("https://img.test/320.jpg"));
        assert_eq!(event.date_time_utc, parse_timestamp("2025-10-04T22:00:00Z").unwrap());
    }

    #[tokio::test]
    async fn past_events_respect_limit() {
        let transport = Arc::new(ScriptedTransport::new());
        let ufc = provider(transport);

        let one = ufc.fetch_past_events(1).await;
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].external_id, "ufc-309");
        assert_eq!(one[0].status, EventStatus::Completed);
        assert_eq!(ufc.fetch_past_events(5).await.len(), 2);
        assert!(ufc.fetch_past_events(0).await.is_empty());
    }

    #[tokio::test]
    async fn fight_card_is_scraped_and_failures_are_empty() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            format!("{BASE}/event/ufc-310"),
            200,
            r#"<div class="main-card"><div class="c-listing-fight" data-fmid="1">
                 <div class="c-listing-fight__corner-name--red">John Doe</div>
                 <div class="c-listing-fight__corner-name--blue">Jim Roe</div>
               </div></div>"#,
        );
        let ufc = provider(transport);

        let fights = ufc.fetch_fight_card("ufc-310").await.unwrap();
        assert_eq!(fights.len(), 1);
        assert_eq!(fights[0].fighter_a.external_id, "john-doe");

        assert!(ufc.fetch_fight_card("ufc-999").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn live_event_card_uses_the_event_page() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            format!("{BASE}/api/v1/events?is_upcoming=true"),
            200,
            r#"{"content":{"eventList":[
                {"eventId": 1234, "name": "UFC 320: Ankalaev vs. Pereira 2",
                 "link": "/event/ufc-320", "startTime": "2025-10-04T22:00:00Z"}
            ]}}"#,
        );
        transport.respond(
            format!("{BASE}/event/ufc-320"),
            200,
            r#"<div class="main-card"><div class="c-listing-fight" data-fmid="9">
                 <div class="c-listing-fight__corner-name--red">Magomed Ankalaev</div>
                 <div class="c-listing-fight__corner-name--blue">Alex Pereira</div>
               </div></div>"#,
        );
        let ufc = provider(Arc::clone(&transport));

        let events = ufc.fetch_upcoming_events().await;
        let fights = ufc.fetch_fight_card(&events[0].external_id).await.unwrap();

        assert_eq!(fights.len(), 1);
        assert_eq!(fights[0].event_external_id, "ufc-320");
        assert_eq!(transport.request_count(&format!("{BASE}/event/ufc-320")), 1);
    }

    #[test]
    fn event_page_slug_takes_the_last_segment() {
        assert_eq!(event_page_slug("https://www.ufc.com/event/ufc-320/").as_deref(), Some("ufc-320"));
        assert_eq!(
            event_page_slug("/event/ufc-fight-night-october-11-2025#card").as_deref(),
            Some("ufc-fight-night-october-11-2025")
        );
        assert_eq!(event_page_slug("https://www.ufc.com/events"), None);
    }

    #[tokio::test]
    async fn health_check_and_organizations() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(BASE, 200, "<html></html>");
        let ufc = provider(transport);

        assert!(ufc.health_check().await);
        let orgs = ufc.fetch_organizations().await;
        let shorts: Vec<_> = orgs.iter().map(|o| o.short_name.as_str()).collect();
        assert_eq!(shorts, ["UFC", "Bellator", "ONE", "PFL"]);
        assert!(orgs[0].logo_url.is_some());
    }
}
