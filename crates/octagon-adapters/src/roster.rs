//! UFC athlete roster scraping: sitemap slugs, rankings, athlete profiles and
//! roster listing pages.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use octagon_core::UNKNOWN;
use octagon_storage::HttpFetcher;
use tracing::{debug, info, warn};

use crate::extract::{self, FightRecord};

pub const PROVIDER_NAME: &str = "UFC";
pub const MAX_SITEMAP_PAGES: u32 = 50;
pub const MAX_LISTING_PAGES: u32 = 50;

const BROWSER_HEADERS: [(&str, &str); 3] = [
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    ),
    ("accept", "text/html,application/xhtml+xml"),
    ("accept-language", "en-US,en;q=0.9"),
];

/// One roster observation, keyed by the athlete's profile slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterAthlete {
    pub slug: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub weight_class: String,
    pub record: FightRecord,
    pub image_url: Option<String>,
    pub country: String,
}

impl RosterAthlete {
    /// Name-only stub; `None` when the slug has fewer than two name parts.
    pub fn stub(slug: &str) -> Option<Self> {
        let (first_name, last_name) = extract::name_from_slug(slug)?;
        Some(Self::named(slug, first_name, last_name))
    }

    pub fn named(slug: &str, first_name: String, last_name: String) -> Self {
        Self {
            slug: slug.to_string(),
            first_name,
            last_name,
            nickname: None,
            weight_class: UNKNOWN.to_string(),
            record: FightRecord::default(),
            image_url: None,
            country: UNKNOWN.to_string(),
        }
    }

    /// Detail values win over the stub's where present.
    pub fn enrich(&mut self, details: &AthleteDetails) {
        if details.nickname.is_some() {
            self.nickname = details.nickname.clone();
        }
        if let Some(weight_class) = &details.weight_class {
            self.weight_class = weight_class.clone();
        }
        if let Some(country) = &details.country {
            self.country = country.clone();
        }
        if details.image_url.is_some() {
            self.image_url = details.image_url.clone();
        }
        if let Some(record) = details.record {
            self.record = record;
        }
    }
}

/// Fields read from an athlete profile page; each is `None` when its marker is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AthleteDetails {
    pub nickname: Option<String>,
    pub weight_class: Option<String>,
    pub country: Option<String>,
    pub image_url: Option<String>,
    pub record: Option<FightRecord>,
}

impl AthleteDetails {
    pub fn from_profile_html(html: &str) -> Self {
        Self {
            nickname: extract::extract_nickname(html),
            weight_class: extract::extract_division(html),
            country: extract::extract_bio_country(html),
            image_url: extract::extract_headshot(html),
            record: extract::extract_profile_record(html),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub record: FightRecord,
    pub weight_class: Option<String>,
}

/// Source of roster data. Every call is best-effort and never fails.
#[async_trait]
pub trait RosterSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_all_athletes(&self) -> Vec<RosterAthlete>;
    async fn fetch_top_athletes(&self) -> Vec<RosterAthlete>;
    async fn fetch_athlete_details(&self, slug: &str) -> Option<AthleteDetails>;
    async fn fetch_listing_records(&self) -> BTreeMap<String, ListingRecord>;
}

#[derive(Debug, Clone)]
pub struct UfcRosterScraper {
    http: Arc<HttpFetcher>,
    base_url: String,
    sitemap_delay: Duration,
    listing_delay: Duration,
}

impl UfcRosterScraper {
    pub fn new(http: Arc<HttpFetcher>) -> Self {
        Self::with_base_url(http, crate::ufc::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Arc<HttpFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sitemap_delay: Duration::from_millis(100),
            listing_delay: Duration::from_millis(200),
        }
    }

    async fn fetch_page(&self, url: &str) -> Option<String> {
        match self.http.get_text(PROVIDER_NAME, url, &BROWSER_HEADERS).await {
            Ok(body) => Some(body),
            Err(err) => {
                debug!(url, error = %err, "roster page unavailable");
                None
            }
        }
    }

    /// Athlete slugs across sitemap pages, in discovery order.
    pub async fn fetch_sitemap_slugs(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut slugs = Vec::new();

        for page in 1..=MAX_SITEMAP_PAGES {
            let url = format!("{}/sitemap.xml?page={page}", self.base_url);
            let Some(xml) = self.fetch_page(&url).await else {
                break;
            };
            let before = slugs.len();
            for slug in extract::extract_sitemap_slugs(&xml) {
                if seen.insert(slug.clone()) {
                    slugs.push(slug);
                }
            }
            let added = slugs.len() - before;
            if added == 0 {
                info!(page, "sitemap page has no new athletes, stopping");
                break;
            }
            debug!(page, added, total = slugs.len(), "sitemap page parsed");
            tokio::time::sleep(self.sitemap_delay).await;
        }
        slugs
    }
}

#[async_trait]
impl RosterSource for UfcRosterScraper {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch_all_athletes(&self) -> Vec<RosterAthlete> {
        let slugs = self.fetch_sitemap_slugs().await;
        let athletes: Vec<RosterAthlete> = slugs.iter().filter_map(|s| RosterAthlete::stub(s)).collect();
        info!(slugs = slugs.len(), athletes = athletes.len(), "roster athletes from sitemap");
        athletes
    }

    async fn fetch_top_athletes(&self) -> Vec<RosterAthlete> {
        let url = format!("{}/rankings", self.base_url);
        let Some(html) = self.fetch_page(&url).await else {
            warn!(provider = PROVIDER_NAME, "rankings page unavailable");
            return Vec::new();
        };
        let links = match extract::extract_ranking_links(&html) {
            Ok(links) => links,
            Err(err) => {
                warn!(provider = PROVIDER_NAME, error = %err, "rankings page not parsed");
                return Vec::new();
            }
        };
        let athletes: Vec<RosterAthlete> = links
            .into_iter()
            .filter_map(|link| {
                let from_text = link
                    .name
                    .as_deref()
                    .map(extract::split_full_name)
                    .filter(|(first, last)| !first.is_empty() && !last.is_empty());
                match from_text {
                    Some((first, last)) => Some(RosterAthlete::named(&link.slug, first, last)),
                    None => RosterAthlete::stub(&link.slug),
                }
            })
            .collect();
        info!(count = athletes.len(), "ranked athletes found");
        athletes
    }

    async fn fetch_athlete_details(&self, slug: &str) -> Option<AthleteDetails> {
        let url = format!("{}/athlete/{slug}", self.base_url);
        let html = self.fetch_page(&url).await?;
        Some(AthleteDetails::from_profile_html(&html))
    }

    async fn fetch_listing_records(&self) -> BTreeMap<String, ListingRecord> {
        let mut records = BTreeMap::new();

        for page in 0..MAX_LISTING_PAGES {
            let url = format!("{}/athletes/all?page={page}", self.base_url);
            let Some(html) = self.fetch_page(&url).await else {
                break;
            };
            let cards = match extract::extract_roster_cards(&html) {
                Ok(cards) => cards,
                Err(err) => {
                    warn!(page, error = %err, "roster listing not parsed");
                    break;
                }
            };
            let mut page_count = 0;
            for card in cards {
                if let Some(record) = card.record {
                    records.insert(
                        card.slug,
                        ListingRecord {
                            record,
                            weight_class: card.weight_class,
                        },
                    );
                    page_count += 1;
                }
            }
            if page_count == 0 {
                info!(page, "roster listing page has no records, stopping");
                break;
            }
            debug!(page, page_count, total = records.len(), "roster listing page parsed");
            tokio::time::sleep(self.listing_delay).await;
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octagon_storage::{HttpClientConfig, ScriptedTransport};

    const BASE: &str = "https://ufc.test";

    fn scraper(transport: Arc<ScriptedTransport>) -> UfcRosterScraper {
        let http = HttpFetcher::with_transport(transport, &HttpClientConfig::default());
        UfcRosterScraper::with_base_url(Arc::new(http), BASE)
    }

    fn sitemap(slugs: &[&str]) -> String {
        slugs
            .iter()
            .map(|s| format!("<url><loc>https://www.ufc.com/athlete/{s}</loc></url>"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn sitemap_stops_on_page_without_new_athletes() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .respond(format!("{BASE}/sitemap.xml?page=1"), 200, sitemap(&["jon-jones", "islam-makhachev"]))
            .respond(format!("{BASE}/sitemap.xml?page=2"), 200, sitemap(&["jon-jones", "mononym"]))
            .respond(format!("{BASE}/sitemap.xml?page=3"), 200, sitemap(&["jon-jones"]))
            .respond(format!("{BASE}/sitemap.xml?page=4"), 200, sitemap(&["never-reached"]));

        let roster = scraper(transport.clone());
        let athletes = roster.fetch_all_athletes().await;

        let slugs: Vec<_> = athletes.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, ["jon-jones", "islam-makhachev"]);
        assert_eq!(athletes[0].first_name, "Jon");
        assert_eq!(athletes[0].country, UNKNOWN);
        assert_eq!(transport.request_count(&format!("{BASE}/sitemap.xml?page=4")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sitemap_stops_on_http_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(format!("{BASE}/sitemap.xml?page=1"), 200, sitemap(&["alex-pereira"]));

        let slugs = scraper(transport.clone()).fetch_sitemap_slugs().await;

        assert_eq!(slugs, ["alex-pereira"]);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn top_athletes_prefer_link_text_names() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            format!("{BASE}/rankings"),
            200,
            r#"<a href="/athlete/dricus-du-plessis">Dricus Du Plessis</a>
               <a href="/athlete/alex-pereira" class="e-button--black"><img src="p.png"></a>
               <a href="/athlete/alex-pereira">Alex Pereira</a>"#,
        );

        let athletes = scraper(transport).fetch_top_athletes().await;

        assert_eq!(athletes.len(), 2);
        assert_eq!(athletes[0].last_name, "Du Plessis");
        assert_eq!(athletes[1].first_name, "Alex");
        assert_eq!(athletes[1].last_name, "Pereira");
    }

    #[tokio::test]
    async fn details_missing_page_is_none() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            format!("{BASE}/athlete/jon-jones"),
            200,
            r#"<p class="hero-profile__nickname">"Bones"</p><p class="hero-profile__tag">Heavyweight Division</p>"#,
        );
        let roster = scraper(transport);

        let details = roster.fetch_athlete_details("jon-jones").await.unwrap();
        assert_eq!(details.nickname.as_deref(), Some("Bones"));
        assert_eq!(details.weight_class.as_deref(), Some("Heavyweight"));
        assert_eq!(details.country, None);
        assert!(roster.fetch_athlete_details("nobody-here").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn listing_records_until_empty_page() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .respond(
                format!("{BASE}/athletes/all?page=0"),
                200,
                r#"<div class="c-listing-athlete-flipcard white">
                     <span class="c-listing-athlete__title"><div class="field__item">Flyweight</div></span>
                     <span class="c-listing-athlete__record">28-5-0 (W-L-D)</span>
                     <a href="/athlete/alexandre-pantoja">View Profile</a>
                   </div>"#,
            )
            .respond(format!("{BASE}/athletes/all?page=1"), 200, "<div></div>");

        let records = scraper(transport).fetch_listing_records().await;

        assert_eq!(records.len(), 1);
        let pantoja = &records["alexandre-pantoja"];
        assert_eq!(pantoja.record.wins, 28);
        assert_eq!(pantoja.weight_class.as_deref(), Some("Flyweight"));
    }

    #[test]
    fn enrich_keeps_stub_values_where_details_are_silent() {
        let mut athlete = RosterAthlete::stub("kai-asakura").unwrap();
        athlete.enrich(&AthleteDetails {
            country: Some("Japan".into()),
            ..AthleteDetails::default()
        });
        assert_eq!(athlete.country, "Japan");
        assert_eq!(athlete.weight_class, UNKNOWN);
        assert_eq!(athlete.nickname, None);
    }
}
