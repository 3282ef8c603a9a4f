//! Pure extractors over provider text and markup.
//!
//! Every extractor is best-effort: a missing marker yields `None` (or an empty
//! list), never an error about the page itself.

use octagon_core::{
    synthesize_fighter_id, CardSection, ExternalFightRecord, FightCorner, FightOutcome,
    FightResultStatus, UNKNOWN,
};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::AdapterError;

pub const UFC_HEADSHOT_BASE: &str = "https://ufc.com/images/styles/event_results_athlete_headshot/s3/";

const HEADSHOT_STYLE: &str = "event_results_athlete_headshot";

static RECORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*-\s*(\d+)\s*-\s*(\d+)\b").expect("record regex"));
static HEIGHT_CM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*cm\b").expect("cm regex"));
static HEIGHT_FT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*ft\s*(\d+)?\s*in\b").expect("ft regex"));
static FIRST_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("number regex"));
static STYLE_SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/styles/[^/]+/s3/").expect("style regex"));
static CORNER_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_[LR]_(\d|BELT|CHAMP)").expect("corner regex"));
static NICKNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<p class="hero-profile__nickname">\s*(?:"|&quot;)?([^"<&]+?)(?:"|&quot;)?\s*</p>"#)
        .expect("nickname regex")
});
static DIVISION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<p class="hero-profile__tag">\s*([^<]+?)\s*Division"#).expect("division regex")
});
static BIO_COUNTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)(?:Fighting out of|Place of Birth|Venant de).*?<(?:dd|div) class="c-bio__text">\s*([^<]+?)\s*<"#,
    )
    .expect("bio country regex")
});
static HEADSHOT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"event_results_athlete_headshot/s3/([^"?\s]+)"#).expect("headshot regex")
});
static DIVISION_BODY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<p class="hero-profile__division-body">\s*([^<]+)</p>"#)
        .expect("division body regex")
});
static DIVISION_TITLE_RECORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<p class="hero-profile__division-title">[^<]*</p>.*?(\d+)\s*-\s*(\d+)(?:\s*-\s*(\d+))?"#,
    )
    .expect("division title regex")
});
static SPAN_RECORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*<span[^>]*>-</span>\s*(\d+)(?:\s*<span[^>]*>-</span>\s*(\d+))?")
        .expect("span record regex")
});
static SITEMAP_ATHLETE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<loc>https://www\.ufc\.com/athlete/([^<]+)</loc>").expect("sitemap regex")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FightRecord {
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
}

impl FightRecord {
    pub fn has_result(&self) -> bool {
        self.wins > 0 || self.losses > 0
    }
}

/// Parses `"W-L-D"`, ignoring trailing text. Malformed input is `0-0-0`.
pub fn parse_record(text: &str) -> FightRecord {
    try_parse_record(text).unwrap_or_default()
}

fn try_parse_record(text: &str) -> Option<FightRecord> {
    let caps = RECORD_RE.captures(text)?;
    Some(FightRecord {
        wins: caps[1].parse().ok()?,
        losses: caps[2].parse().ok()?,
        draws: caps[3].parse().ok()?,
    })
}

/// `"<n> cm"` or `"<f> ft <i> in"`; anything else is `None`.
pub fn parse_height_cm(text: &str) -> Option<i32> {
    if let Some(caps) = HEIGHT_CM_RE.captures(text) {
        return caps[1].parse().ok();
    }
    let caps = HEIGHT_FT_RE.captures(text)?;
    let feet: f64 = caps[1].parse().ok()?;
    let inches: f64 = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0);
    Some((feet * 30.48 + inches * 2.54).round() as i32)
}

const WEIGHT_LIMITS: [(u32, &str); 8] = [
    (115, "Strawweight"),
    (125, "Flyweight"),
    (135, "Bantamweight"),
    (145, "Featherweight"),
    (155, "Lightweight"),
    (170, "Welterweight"),
    (185, "Middleweight"),
    (205, "Light Heavyweight"),
];

/// Division limits are inclusive on the lighter class.
pub fn weight_class_for_pounds(pounds: u32) -> &'static str {
    WEIGHT_LIMITS
        .iter()
        .find(|(limit, _)| pounds <= *limit)
        .map(|(_, name)| *name)
        .unwrap_or("Heavyweight")
}

/// First number in a free-text weight; kilograms are converted to pounds.
pub fn parse_weight_pounds(text: &str) -> Option<u32> {
    let value: u32 = FIRST_NUMBER_RE.captures(text)?[1].parse().ok()?;
    let lower = text.to_ascii_lowercase();
    if lower.contains("kg") && !lower.contains("lb") {
        return Some((f64::from(value) * 2.20462).round() as u32);
    }
    Some(value)
}

/// Canonical headshot URL for a fight-card photo.
///
/// The style segment becomes the headshot crop and the `_L_`/`_R_` corner
/// marker before a date or keyword token is dropped, so both corners of a
/// fighter resolve to the same image.
pub fn headshot_url(url: &str) -> String {
    let restyled = STYLE_SEGMENT_RE.replace(url, format!("/styles/{HEADSHOT_STYLE}/s3/").as_str());
    CORNER_SUFFIX_RE.replace_all(&restyled, "_${1}").into_owned()
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// First whitespace token is the first name, the rest is the last name.
pub fn split_full_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// `"dricus-du-plessis"` -> `("Dricus", "Du Plessis")`.
pub fn name_from_slug(slug: &str) -> Option<(String, String)> {
    let mut parts = slug.trim().split('-').filter(|p| !p.is_empty());
    let first = capitalize(parts.next()?);
    let last = parts.map(capitalize).collect::<Vec<_>>().join(" ");
    if first.is_empty() || last.is_empty() {
        return None;
    }
    Some((first, last))
}

pub fn extract_nickname(html: &str) -> Option<String> {
    NICKNAME_RE
        .captures(html)
        .and_then(|c| text_or_none(c[1].to_string()))
}

pub fn extract_division(html: &str) -> Option<String> {
    DIVISION_RE
        .captures(html)
        .and_then(|c| text_or_none(c[1].to_string()))
}

/// Country from the bio block; `"City, Country"` keeps the last segment.
pub fn extract_bio_country(html: &str) -> Option<String> {
    let raw = BIO_COUNTRY_RE.captures(html)?[1].to_string();
    let country = raw.rsplit(',').next().unwrap_or(&raw);
    text_or_none(country.to_string())
}

pub fn extract_headshot(html: &str) -> Option<String> {
    HEADSHOT_RE
        .captures(html)
        .map(|c| format!("{UFC_HEADSHOT_BASE}{}", &c[1]))
}

pub fn extract_profile_record(html: &str) -> Option<FightRecord> {
    if let Some(record) = DIVISION_BODY_RE
        .captures(html)
        .and_then(|c| try_parse_record(&c[1]))
    {
        return Some(record);
    }
    let caps = DIVISION_TITLE_RECORD_RE
        .captures(html)
        .or_else(|| SPAN_RECORD_RE.captures(html))?;
    Some(FightRecord {
        wins: caps[1].parse().ok()?,
        losses: caps[2].parse().ok()?,
        draws: caps
            .get(3)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0),
    })
}

pub fn extract_sitemap_slugs(xml: &str) -> Vec<String> {
    SITEMAP_ATHLETE_RE
        .captures_iter(xml)
        .map(|c| c[1].trim().to_string())
        .filter(|slug| !slug.is_empty() && !slug.contains('"'))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedAthlete {
    pub slug: String,
    pub name: Option<String>,
}

/// Athlete links on the rankings page, first occurrence of each slug.
pub fn extract_ranking_links(html: &str) -> Result<Vec<RankedAthlete>, AdapterError> {
    let document = Html::parse_document(html);
    let link_sel = selector(r#"a[href^="/athlete/"]"#)?;
    let mut out: Vec<RankedAthlete> = Vec::new();
    for link in document.select(&link_sel) {
        let Some(slug) = athlete_slug(link) else {
            continue;
        };
        if out.iter().any(|a| a.slug == slug) {
            continue;
        }
        let name = text_or_none(link.text().collect::<String>()).filter(|n| n.len() > 2);
        out.push(RankedAthlete { slug, name });
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterCard {
    pub slug: String,
    pub name: Option<String>,
    pub weight_class: Option<String>,
    pub record: Option<FightRecord>,
}

/// Athlete cards from a roster listing page.
pub fn extract_roster_cards(html: &str) -> Result<Vec<RosterCard>, AdapterError> {
    let document = Html::parse_document(html);
    let card_sel = selector(".c-listing-athlete-flipcard")?;
    let link_sel = selector(r#"a[href^="/athlete/"]"#)?;
    let mut out: Vec<RosterCard> = Vec::new();
    for card in document.select(&card_sel) {
        let Some(slug) = card.select(&link_sel).find_map(athlete_slug) else {
            continue;
        };
        if out.iter().any(|c| c.slug == slug) {
            continue;
        }
        out.push(RosterCard {
            slug,
            name: first_text(card, ".c-listing-athlete__name")?,
            weight_class: first_text(card, ".c-listing-athlete__title .field__item")?,
            record: first_text(card, ".c-listing-athlete__record")?
                .and_then(|r| try_parse_record(&r)),
        });
    }
    Ok(out)
}

const CARD_SECTIONS: [(CardSection, &str); 3] = [
    (CardSection::Main, ".main-card"),
    (CardSection::Prelim, ".fight-card-prelims"),
    (CardSection::EarlyPrelim, ".fight-card-prelims-early"),
];

/// Fights from an event page, section by section. A missing or empty section is skipped.
pub fn parse_fight_card(
    html: &str,
    event_external_id: &str,
) -> Result<Vec<ExternalFightRecord>, AdapterError> {
    let document = Html::parse_document(html);
    let fight_sel = selector(".c-listing-fight")?;
    let mut fights = Vec::new();

    for (section, css) in CARD_SECTIONS {
        let Some(container) = document.select(&selector(css)?).next() else {
            continue;
        };
        for (position, node) in container.select(&fight_sel).enumerate() {
            if let Some(fight) = parse_fight(node, section, position, event_external_id)? {
                fights.push(fight);
            }
        }
    }
    Ok(fights)
}

fn parse_fight(
    node: ElementRef<'_>,
    section: CardSection,
    position: usize,
    event_external_id: &str,
) -> Result<Option<ExternalFightRecord>, AdapterError> {
    let (Some(fighter_a), Some(fighter_b)) = (parse_corner(node, "red")?, parse_corner(node, "blue")?)
    else {
        return Ok(None);
    };

    let (weight_class, is_title_fight) = match first_text(node, ".c-listing-fight__class-text")? {
        Some(text) => parse_bout_class(&text),
        None => (UNKNOWN.to_string(), false),
    };

    let external_id = node
        .value()
        .attr("data-fmid")
        .and_then(|id| text_or_none(id.to_string()))
        .unwrap_or_else(|| {
            format!(
                "{event_external_id}-{}-vs-{}",
                fighter_a.external_id, fighter_b.external_id
            )
        });

    let result = parse_outcome(node, &fighter_a, &fighter_b)?;

    Ok(Some(ExternalFightRecord {
        external_id,
        event_external_id: event_external_id.to_string(),
        fighter_a,
        fighter_b,
        weight_class,
        is_title_fight,
        is_main_event: section == CardSection::Main && position == 0,
        is_co_main_event: section == CardSection::Main && position == 1,
        section,
        order: section.ordinal(position),
        result,
    }))
}

fn parse_corner(node: ElementRef<'_>, color: &str) -> Result<Option<FightCorner>, AdapterError> {
    let name_css = format!(".c-listing-fight__corner-name--{color}");
    let given = first_text(node, &format!("{name_css} .c-listing-fight__corner-given-name"))?;
    let family = first_text(node, &format!("{name_css} .c-listing-fight__corner-family-name"))?;

    let (first_name, last_name) = match (given, family) {
        (None, None) => match first_text(node, &name_css)? {
            Some(full) => split_full_name(&full),
            None => return Ok(None),
        },
        (given, family) => (given.unwrap_or_default(), family.unwrap_or_default()),
    };
    if first_name.is_empty() && last_name.is_empty() {
        return Ok(None);
    }

    Ok(Some(FightCorner {
        external_id: synthesize_fighter_id(&first_name, &last_name),
        first_name,
        last_name,
        nickname: None,
        country: first_text(
            node,
            &format!(".c-listing-fight__country--{color} .c-listing-fight__country-text"),
        )?,
        record: first_text(node, &format!(".c-listing-fight__record--{color}"))?,
        image_url: first_attr(
            node,
            &format!(".c-listing-fight__corner-image--{color} img"),
            "src",
        )?
        .map(|src| headshot_url(&src)),
    }))
}

/// `"Flyweight Title Bout"` -> `("Flyweight", true)`.
fn parse_bout_class(text: &str) -> (String, bool) {
    let is_title = text.to_ascii_lowercase().contains("title");
    let weight = text
        .replace("Title Bout", "")
        .replace("Bout", "")
        .trim()
        .to_string();
    if weight.is_empty() {
        (UNKNOWN.to_string(), is_title)
    } else {
        (weight, is_title)
    }
}

fn parse_outcome(
    node: ElementRef<'_>,
    fighter_a: &FightCorner,
    fighter_b: &FightCorner,
) -> Result<Option<FightOutcome>, AdapterError> {
    let red_won = exists(node, ".c-listing-fight__corner-body--red .c-listing-fight__outcome--win")?;
    let blue_won = exists(node, ".c-listing-fight__corner-body--blue .c-listing-fight__outcome--win")?;

    let (status, winner_external_id) = if red_won {
        (FightResultStatus::Completed, Some(fighter_a.external_id.clone()))
    } else if blue_won {
        (FightResultStatus::Completed, Some(fighter_b.external_id.clone()))
    } else if exists(node, ".c-listing-fight__outcome--draw")? {
        (FightResultStatus::Draw, None)
    } else if exists(node, ".c-listing-fight__outcome--no-contest")? {
        (FightResultStatus::NoContest, None)
    } else {
        return Ok(None);
    };

    Ok(Some(FightOutcome {
        status,
        winner_external_id,
        method: first_text(node, ".c-listing-fight__result-text.method")?,
        round: first_text(node, ".c-listing-fight__result-text.round")?
            .and_then(|r| r.parse().ok()),
        time: first_text(node, ".c-listing-fight__result-text.time")?,
    }))
}

fn athlete_slug(link: ElementRef<'_>) -> Option<String> {
    let href = link.value().attr("href")?;
    let slug = href.strip_prefix("/athlete/")?.trim();
    if slug.is_empty() || slug.contains('/') {
        return None;
    }
    Some(slug.to_string())
}

pub(crate) fn text_or_none(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Message(e.to_string()))
}

fn first_text(scope: ElementRef<'_>, css: &str) -> Result<Option<String>, AdapterError> {
    let sel = selector(css)?;
    Ok(scope
        .select(&sel)
        .next()
        .and_then(|n| text_or_none(n.text().collect::<String>())))
}

fn first_attr(scope: ElementRef<'_>, css: &str, attr: &str) -> Result<Option<String>, AdapterError> {
    let sel = selector(css)?;
    Ok(scope
        .select(&sel)
        .next()
        .and_then(|n| n.value().attr(attr))
        .and_then(|s| text_or_none(s.to_string())))
}

fn exists(scope: ElementRef<'_>, css: &str) -> Result<bool, AdapterError> {
    let sel = selector(css)?;
    Ok(scope.select(&sel).next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_strings() {
        assert_eq!(
            parse_record("28-5-0"),
            FightRecord {
                wins: 28,
                losses: 5,
                draws: 0
            }
        );
        assert_eq!(
            parse_record("12-5-1 (W-L-D)"),
            FightRecord {
                wins: 12,
                losses: 5,
                draws: 1
            }
        );
        for malformed in ["", "28-5", "W-L-D", "abc-1-2", "99999999999-1-1"] {
            assert_eq!(parse_record(malformed), FightRecord::default(), "{malformed}");
        }
    }

    #[test]
    fn heights() {
        assert_eq!(parse_height_cm("193 cm"), Some(193));
        assert_eq!(parse_height_cm("6 ft 4 in"), Some(193));
        assert_eq!(parse_height_cm("5 ft 11 in"), Some(180));
        assert_eq!(parse_height_cm("6 ft in"), Some(183));
        assert_eq!(parse_height_cm("6 ft 4 in (193 cm)"), Some(193));
        assert_eq!(parse_height_cm("tall"), None);
        assert_eq!(parse_height_cm("6'4\""), None);
    }

    #[test]
    fn weight_class_boundaries_fall_to_lighter_class() {
        assert_eq!(weight_class_for_pounds(1), "Strawweight");
        assert_eq!(weight_class_for_pounds(115), "Strawweight");
        assert_eq!(weight_class_for_pounds(116), "Flyweight");
        assert_eq!(weight_class_for_pounds(155), "Lightweight");
        assert_eq!(weight_class_for_pounds(170), "Welterweight");
        assert_eq!(weight_class_for_pounds(205), "Light Heavyweight");
        assert_eq!(weight_class_for_pounds(206), "Heavyweight");
        assert_eq!(weight_class_for_pounds(u32::MAX), "Heavyweight");

        let mut last_index = 0;
        for pounds in 1..=300u32 {
            let class = weight_class_for_pounds(pounds);
            let index = WEIGHT_LIMITS
                .iter()
                .position(|(_, name)| *name == class)
                .unwrap_or(WEIGHT_LIMITS.len());
            assert!(index >= last_index, "not monotonic at {pounds}");
            last_index = index;
        }
    }

    #[test]
    fn weights_in_text() {
        assert_eq!(parse_weight_pounds("205 lbs"), Some(205));
        assert_eq!(parse_weight_pounds("93 kg"), Some(205));
        assert_eq!(parse_weight_pounds("unknown"), None);
    }

    #[test]
    fn headshots_are_canonical_for_both_corners() {
        let red = "https://dmxg5wxfqgb4u.cloudfront.net/styles/event_fight_card_upper_body_of_standing_athlete/s3/2024-12/PANTOJA_ALEXANDRE_L_12-07.png?itok=abc";
        let blue = "https://dmxg5wxfqgb4u.cloudfront.net/styles/event_fight_card_upper_body_of_standing_athlete/s3/2024-12/PANTOJA_ALEXANDRE_R_12-07.png?itok=abc";
        let expected = "https://dmxg5wxfqgb4u.cloudfront.net/styles/event_results_athlete_headshot/s3/2024-12/PANTOJA_ALEXANDRE_12-07.png?itok=abc";
        assert_eq!(headshot_url(red), expected);
        assert_eq!(headshot_url(blue), expected);

        let belt = "https://x.test/styles/athlete_bio_full_body/s3/2024-07/PEREIRA_ALEX_L_BELT_10-05.png";
        assert_eq!(
            headshot_url(belt),
            "https://x.test/styles/event_results_athlete_headshot/s3/2024-07/PEREIRA_ALEX_BELT_10-05.png"
        );
        assert_eq!(headshot_url("https://x.test/plain.png"), "https://x.test/plain.png");
    }

    #[test]
    fn names() {
        assert_eq!(
            name_from_slug("dricus-du-plessis"),
            Some(("Dricus".to_string(), "Du Plessis".to_string()))
        );
        assert_eq!(
            name_from_slug("JON-JONES"),
            Some(("Jon".to_string(), "Jones".to_string()))
        );
        assert_eq!(name_from_slug("mononym"), None);
        assert_eq!(
            split_full_name("  Jose  Aldo Junior "),
            ("Jose".to_string(), "Aldo Junior".to_string())
        );
    }

    const ATHLETE_PAGE: &str = r#"
        <div class="hero-profile">
          <p class="hero-profile__nickname">"Bones"</p>
          <p class="hero-profile__tag">
            Heavyweight Division
          </p>
          <p class="hero-profile__division-title">Heavyweight Division</p>
          <p class="hero-profile__division-body">28-1-0 (W-L-D)</p>
          <img src="https://dmxg5wxfqgb4u.cloudfront.net/styles/event_results_athlete_headshot/s3/2023-03/JONES_JON_BELT.png?itok=x">
        </div>
        <div class="c-bio__field">
          <div class="c-bio__label">Place of Birth</div>
          <div class="c-bio__text">Rochester, United States</div>
        </div>
    "#;

    #[test]
    fn athlete_detail_fields() {
        assert_eq!(extract_nickname(ATHLETE_PAGE).as_deref(), Some("Bones"));
        assert_eq!(extract_division(ATHLETE_PAGE).as_deref(), Some("Heavyweight"));
        assert_eq!(extract_bio_country(ATHLETE_PAGE).as_deref(), Some("United States"));
        assert_eq!(
            extract_headshot(ATHLETE_PAGE).as_deref(),
            Some("https://ufc.com/images/styles/event_results_athlete_headshot/s3/2023-03/JONES_JON_BELT.png")
        );
        assert_eq!(
            extract_profile_record(ATHLETE_PAGE),
            Some(FightRecord {
                wins: 28,
                losses: 1,
                draws: 0
            })
        );
    }

    #[test]
    fn missing_markers_are_unknown() {
        let html = "<html><body><p>nothing here</p></body></html>";
        assert_eq!(extract_nickname(html), None);
        assert_eq!(extract_division(html), None);
        assert_eq!(extract_bio_country(html), None);
        assert_eq!(extract_headshot(html), None);
        assert_eq!(extract_profile_record(html), None);
        assert!(extract_sitemap_slugs(html).is_empty());
        assert!(extract_ranking_links(html).unwrap().is_empty());
        assert!(parse_fight_card(html, "ufc-310").unwrap().is_empty());
    }

    #[test]
    fn record_from_split_spans() {
        let html = r#"<p class="hero-profile__division-title">Lightweight Division</p>
            <div>21 - 9 - 0</div>"#;
        assert_eq!(
            extract_profile_record(html),
            Some(FightRecord {
                wins: 21,
                losses: 9,
                draws: 0
            })
        );
    }

    #[test]
    fn record_from_separator_spans() {
        let html = r#"<div class="stats">14 <span class="sep">-</span> 2 <span class="sep">-</span> 1</div>"#;
        assert_eq!(
            extract_profile_record(html),
            Some(FightRecord {
                wins: 14,
                losses: 2,
                draws: 1
            })
        );
    }

    #[test]
    fn sitemap_and_rankings() {
        let xml = r#"<urlset>
            <url><loc>https://www.ufc.com/athlete/jon-jones</loc></url>
            <url><loc>https://www.ufc.com/athlete/islam-makhachev</loc></url>
            <url><loc>https://www.ufc.com/event/ufc-310</loc></url>
        </urlset>"#;
        assert_eq!(extract_sitemap_slugs(xml), vec!["jon-jones", "islam-makhachev"]);

        let html = r#"
            <a href="/athlete/islam-makhachev">Islam Makhachev</a>
            <a href="/athlete/islam-makhachev" class="e-button--black">View</a>
            <a href="/athlete/charles-oliveira"><img src="x.png"></a>
            <a href="/athlete/foo/bar">Nested</a>
        "#;
        let links = extract_ranking_links(html).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].name.as_deref(), Some("Islam Makhachev"));
        assert_eq!(links[1].slug, "charles-oliveira");
        assert_eq!(links[1].name, None);
    }

    #[test]
    fn roster_cards() {
        let html = r#"
          <div class="c-listing-athlete-flipcard white">
            <span class="c-listing-athlete__name"> Alexandre Pantoja </span>
            <span class="c-listing-athlete__title"><div class="field__item">Flyweight</div></span>
            <span class="c-listing-athlete__record">28-5-0 (W-L-D)</span>
            <a href="/athlete/alexandre-pantoja">View Profile</a>
          </div>
          <div class="c-listing-athlete-flipcard white">
            <span class="c-listing-athlete__name">Kai Asakura</span>
            <span class="c-listing-athlete__record">n/a</span>
            <a href="/athlete/kai-asakura">View Profile</a>
          </div>
        "#;
        let cards = extract_roster_cards(html).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].slug, "alexandre-pantoja");
        assert_eq!(cards[0].name.as_deref(), Some("Alexandre Pantoja"));
        assert_eq!(cards[0].weight_class.as_deref(), Some("Flyweight"));
        assert_eq!(
            cards[0].record,
            Some(FightRecord {
                wins: 28,
                losses: 5,
                draws: 0
            })
        );
        assert_eq!(cards[1].weight_class, None);
        assert_eq!(cards[1].record, None);
    }

    const EVENT_PAGE: &str = r#"
      <div class="main-card">
        <div class="c-listing-fight" data-fmid="11001">
          <div class="c-listing-fight__class-text">Flyweight Title Bout</div>
          <div class="c-listing-fight__corner-name--red">
            <span class="c-listing-fight__corner-given-name">Alexandre</span>
            <span class="c-listing-fight__corner-family-name">Pantoja</span>
          </div>
          <div class="c-listing-fight__corner-name--blue">
            <span class="c-listing-fight__corner-given-name">Kai</span>
            <span class="c-listing-fight__corner-family-name">Asakura</span>
          </div>
          <div class="c-listing-fight__corner-image--red"><img src="https://cdn.test/styles/event_fight_card_upper_body_of_standing_athlete/s3/2024-12/PANTOJA_ALEXANDRE_L_BELT_12-07.png"></div>
          <div class="c-listing-fight__corner-image--blue"><img src="https://cdn.test/styles/event_fight_card_upper_body_of_standing_athlete/s3/2024-12/ASAKURA_KAI_R_12-07.png"></div>
          <div class="c-listing-fight__country--red"><div class="c-listing-fight__country-text">Brazil</div></div>
          <div class="c-listing-fight__country--blue"><div class="c-listing-fight__country-text">Japan</div></div>
          <span class="c-listing-fight__record--red">28-5-0</span>
          <span class="c-listing-fight__record--blue">21-4-0</span>
        </div>
        <div class="c-listing-fight" data-fmid="11002">
          <div class="c-listing-fight__class-text">Welterweight Bout</div>
          <div class="c-listing-fight__corner-name--red">Shavkat Rakhmonov</div>
          <div class="c-listing-fight__corner-name--blue">Ian Machado Garry</div>
        </div>
      </div>
      <div class="fight-card-prelims">
        <div class="c-listing-fight">
          <div class="c-listing-fight__class-text">Lightweight Bout</div>
          <div class="c-listing-fight__corner-name--red">John Doe</div>
          <div class="c-listing-fight__corner-name--blue">Jane Roe</div>
          <div class="c-listing-fight__corner-body--blue"><div class="c-listing-fight__outcome--win">Win</div></div>
          <div class="c-listing-fight__result-text method">KO/TKO</div>
          <div class="c-listing-fight__result-text round">2</div>
          <div class="c-listing-fight__result-text time">3:12</div>
        </div>
      </div>
    "#;

    #[test]
    fn fight_card_sections_and_ordinals() {
        let fights = parse_fight_card(EVENT_PAGE, "ufc-310").unwrap();
        assert_eq!(fights.len(), 3);

        let main = &fights[0];
        assert_eq!(main.external_id, "11001");
        assert_eq!(main.order, 100);
        assert!(main.is_main_event && main.is_title_fight);
        assert_eq!(main.weight_class, "Flyweight");
        assert_eq!(main.fighter_a.external_id, "alexandre-pantoja");
        assert_eq!(main.fighter_a.record.as_deref(), Some("28-5-0"));
        assert_eq!(main.fighter_b.country.as_deref(), Some("Japan"));
        assert_eq!(
            main.fighter_a.image_url.as_deref(),
            Some("https://cdn.test/styles/event_results_athlete_headshot/s3/2024-12/PANTOJA_ALEXANDRE_BELT_12-07.png")
        );
        assert!(main.result.is_none());

        let co_main = &fights[1];
        assert!(co_main.is_co_main_event && !co_main.is_title_fight);
        assert_eq!(co_main.order, 101);
        assert_eq!(co_main.fighter_b.first_name, "Ian");
        assert_eq!(co_main.fighter_b.last_name, "Machado Garry");
        assert_eq!(co_main.fighter_b.external_id, "ian-machado-garry");

        let prelim = &fights[2];
        assert_eq!(prelim.section, CardSection::Prelim);
        assert_eq!(prelim.order, 200);
        assert_eq!(prelim.external_id, "ufc-310-john-doe-vs-jane-roe");
        let outcome = prelim.result.as_ref().unwrap();
        assert_eq!(outcome.winner_external_id.as_deref(), Some("jane-roe"));
        assert_eq!(outcome.round, Some(2));
        assert_eq!(outcome.method.as_deref(), Some("KO/TKO"));
    }
}
