//! Fighter update policies and the store's weight-class naming convention.

use octagon_core::{Fighter, FighterPatch, NewFighter, UNKNOWN};
use serde::{Deserialize, Serialize};

/// How an incoming observation is folded into an existing fighter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Event-sourced data: record, country, weight class and image follow the
    /// latest observation.
    AuthoritativeOverwrite,
    /// Roster-sourced data: a field is written only while the stored value is
    /// still a placeholder, and only with a non-placeholder value.
    FillMissingOnly,
}

impl UpdatePolicy {
    /// Patch to apply on top of `existing`; `None` is treated as a row whose
    /// fields are all placeholders. External ids are always carried.
    pub fn fighter_patch(&self, incoming: &NewFighter, existing: Option<&Fighter>) -> FighterPatch {
        match self {
            Self::AuthoritativeOverwrite => authoritative_patch(incoming),
            Self::FillMissingOnly => fill_missing_patch(incoming, existing),
        }
    }
}

fn authoritative_patch(incoming: &NewFighter) -> FighterPatch {
    FighterPatch {
        country: Some(incoming.country.clone()),
        weight_class: Some(incoming.weight_class.clone()),
        image_url: incoming.image_url.clone().map(Some),
        pro_wins: Some(incoming.pro_wins),
        pro_losses: Some(incoming.pro_losses),
        pro_draws: Some(incoming.pro_draws),
        pro_no_contests: Some(incoming.pro_no_contests),
        external_ids: incoming.external_ids.clone(),
        ..FighterPatch::default()
    }
}

fn fill_missing_patch(incoming: &NewFighter, existing: Option<&Fighter>) -> FighterPatch {
    let mut patch = FighterPatch {
        external_ids: incoming.external_ids.clone(),
        ..FighterPatch::default()
    };

    let nickname_missing = existing.map_or(true, |f| f.nickname.is_none());
    if nickname_missing && incoming.nickname.is_some() {
        patch.nickname = Some(incoming.nickname.clone());
    }

    let country_missing = existing.map_or(true, |f| is_placeholder(&f.country));
    if country_missing && !is_placeholder(&incoming.country) {
        patch.country = Some(incoming.country.clone());
    }

    let image_missing = existing.map_or(true, |f| f.image_url.is_none());
    if image_missing && incoming.image_url.is_some() {
        patch.image_url = Some(incoming.image_url.clone());
    }

    let record_missing =
        existing.map_or(true, |f| f.pro_wins == 0 && f.pro_losses == 0 && f.pro_draws == 0);
    let incoming_has_record = incoming.pro_wins > 0 || incoming.pro_losses > 0 || incoming.pro_draws > 0;
    if record_missing && incoming_has_record {
        patch.pro_wins = Some(incoming.pro_wins);
        patch.pro_losses = Some(incoming.pro_losses);
        patch.pro_draws = Some(incoming.pro_draws);
    }

    let weight_missing = existing.map_or(true, |f| is_placeholder(&f.weight_class));
    if weight_missing && !is_placeholder(&incoming.weight_class) {
        patch.weight_class = Some(incoming.weight_class.clone());
    }

    patch
}

fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == UNKNOWN
}

/// English division name -> the store's French label.
const WEIGHT_CLASS_LABELS: [(&str, &str); 13] = [
    ("Strawweight", "Poids paille"),
    ("Flyweight", "Poids mouche"),
    ("Bantamweight", "Poids coq"),
    ("Featherweight", "Poids plume"),
    ("Lightweight", "Poids léger"),
    ("Welterweight", "Poids mi-moyen"),
    ("Middleweight", "Poids moyen"),
    ("Light Heavyweight", "Poids mi-lourd"),
    ("Heavyweight", "Poids lourd"),
    ("Women's Strawweight", "Poids paille féminin"),
    ("Women's Flyweight", "Poids mouche féminin"),
    ("Women's Bantamweight", "Poids coq féminin"),
    ("Women's Featherweight", "Poids plume féminin"),
];

/// Translates a division name through the bilingual table.
///
/// Lookup ignores case and a trailing " Division"; names outside the table
/// (including labels that are already French) pass through trimmed.
pub fn localize_weight_class(name: &str) -> String {
    let trimmed = name.trim();
    let key = trimmed
        .strip_suffix(" Division")
        .or_else(|| trimmed.strip_suffix(" division"))
        .unwrap_or(trimmed)
        .replace('\u{2019}', "'");
    WEIGHT_CLASS_LABELS
        .iter()
        .find(|(english, _)| english.eq_ignore_ascii_case(&key))
        .map(|(_, french)| (*french).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use octagon_core::{ExternalIds, Stance};
    use uuid::Uuid;

    fn incoming() -> NewFighter {
        NewFighter {
            first_name: "Alexandre".into(),
            last_name: "Pantoja".into(),
            nickname: Some("The Cannibal".into()),
            country: "Brazil".into(),
            city: None,
            team: None,
            height_cm: None,
            reach_cm: None,
            stance: Stance::Unknown,
            weight_class: "Poids mouche".into(),
            is_pro: true,
            image_url: Some("https://ufc.com/images/pantoja.png".into()),
            pro_wins: 28,
            pro_losses: 5,
            pro_draws: 0,
            pro_no_contests: 0,
            external_ids: ExternalIds::single("UFC", "alexandre-pantoja"),
        }
    }

    fn stored() -> Fighter {
        NewFighter {
            nickname: None,
            country: UNKNOWN.into(),
            weight_class: UNKNOWN.into(),
            image_url: None,
            pro_wins: 0,
            pro_losses: 0,
            external_ids: ExternalIds::new(),
            ..incoming()
        }
        .into_entity(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn fill_missing_fills_placeholders() {
        let patch = UpdatePolicy::FillMissingOnly.fighter_patch(&incoming(), Some(&stored()));
        assert_eq!(patch.nickname, Some(Some("The Cannibal".into())));
        assert_eq!(patch.country.as_deref(), Some("Brazil"));
        assert_eq!(patch.weight_class.as_deref(), Some("Poids mouche"));
        assert_eq!(patch.pro_wins, Some(28));
        assert_eq!(patch.external_ids.get("UFC"), Some("alexandre-pantoja"));
    }

    #[test]
    fn fill_missing_never_regresses_populated_fields() {
        let mut existing = stored();
        existing.nickname = Some("Cannibal".into());
        existing.country = "Brasil".into();
        existing.pro_wins = 27;
        existing.weight_class = "Poids coq".into();
        existing.image_url = Some("https://example.com/old.png".into());

        let patch = UpdatePolicy::FillMissingOnly.fighter_patch(&incoming(), Some(&existing));
        assert!(patch.is_fields_empty());

        let blank = NewFighter {
            nickname: None,
            country: UNKNOWN.into(),
            weight_class: UNKNOWN.into(),
            image_url: None,
            pro_wins: 0,
            pro_losses: 0,
            ..incoming()
        };
        let patch = UpdatePolicy::FillMissingOnly.fighter_patch(&blank, Some(&stored()));
        assert!(patch.is_fields_empty());
    }

    #[test]
    fn authoritative_overwrites_populated_fields() {
        let mut existing = stored();
        existing.country = "Brasil".into();
        existing.pro_wins = 27;
        let patch = UpdatePolicy::AuthoritativeOverwrite.fighter_patch(&incoming(), Some(&existing));
        assert_eq!(patch.country.as_deref(), Some("Brazil"));
        assert_eq!(patch.pro_wins, Some(28));
        assert_eq!(patch.first_name, None);

        let mut no_image = incoming();
        no_image.image_url = None;
        let patch = UpdatePolicy::AuthoritativeOverwrite.fighter_patch(&no_image, None);
        assert_eq!(patch.image_url, None);
    }

    #[test]
    fn weight_classes_translate_to_french() {
        assert_eq!(localize_weight_class("Lightweight"), "Poids léger");
        assert_eq!(localize_weight_class("light heavyweight"), "Poids mi-lourd");
        assert_eq!(localize_weight_class("Women's Strawweight Division"), "Poids paille féminin");
        assert_eq!(localize_weight_class("Women\u{2019}s Flyweight"), "Poids mouche féminin");
        assert_eq!(localize_weight_class("Poids coq"), "Poids coq");
        assert_eq!(localize_weight_class(UNKNOWN), UNKNOWN);
    }
}
