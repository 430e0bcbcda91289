use crate::content::{ContentLibrary, GameType};
use crate::plan::{ClassPlan, Section};
use serde::Serialize;

/// Fallback contribution for an entry whose game is missing from the
/// library, and the default round time when a game carries no duration.
pub const FALLBACK_MINUTES: f64 = 5.0;
pub const DEFAULT_PLAYERS: u32 = 2;

/// Pacing band half-width in minutes: within ±2 of target counts as on pace.
const PACE_TOLERANCE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pacing {
    OnPace,
    Over,
    Under,
}

/// Minutes one entry adds to its section. Round-Switching games run one
/// round per player, so their round time multiplies by player count.
pub fn entry_contribution(library: &ContentLibrary, game_id: &str) -> f64 {
    let Some(game) = library.find_game(game_id) else {
        return FALLBACK_MINUTES;
    };
    let round_time = game.duration_minutes.unwrap_or(FALLBACK_MINUTES);
    match game.game_type {
        Some(GameType::RoundSwitching) => {
            round_time * f64::from(game.players.unwrap_or(DEFAULT_PLAYERS))
        }
        _ => round_time,
    }
}

/// Sum of contributions across a section's entries; 0.0 when empty.
pub fn section_total(plan: &ClassPlan, library: &ContentLibrary, section_id: &str) -> f64 {
    plan.entries(section_id)
        .iter()
        .map(|e| entry_contribution(library, &e.game_id))
        .sum()
}

/// What the section badge shows: a manual override wins; otherwise the
/// computed total; an empty section falls back to its target.
pub fn display_duration(section: &Section, computed_total: f64, manual: Option<u32>) -> f64 {
    if let Some(minutes) = manual {
        return f64::from(minutes);
    }
    if computed_total == 0.0 {
        return section.target_duration;
    }
    computed_total
}

/// Pure function of (displayed, target): within ±2 minutes is on pace.
pub fn pacing(display: f64, target: f64) -> Pacing {
    let diff = display - target;
    if diff.abs() <= PACE_TOLERANCE {
        Pacing::OnPace
    } else if diff > PACE_TOLERANCE {
        Pacing::Over
    } else {
        Pacing::Under
    }
}

/// Render minutes as "M:SS". Seconds round half-up and carry into the
/// minute when they hit 60.
pub fn format_duration(value: f64) -> String {
    let mut minutes = value.floor() as u64;
    let mut seconds = ((value - value.floor()) * 60.0).round() as u64;
    if seconds >= 60 {
        minutes += 1;
        seconds = 0;
    }
    format!("{}:{:02}", minutes, seconds)
}

// --- Derived view model -------------------------------------------------
//
// The renderer consumes this instead of poking at ClassPlan + library
// itself, so the same mutation operations drive it headlessly in tests.

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub game_id: String,
    pub title: String,
    pub known: bool,
    pub contribution_minutes: f64,
    pub goals: String,
    pub purpose: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub section_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: crate::plan::SectionType,
    pub target_duration: f64,
    pub computed_total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_minutes: Option<u32>,
    pub display_duration: f64,
    pub display_badge: String,
    pub pacing: Pacing,
    pub entries: Vec<EntryView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptView {
    pub concept_id: String,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<ConceptView>,
    pub sections: Vec<SectionView>,
    pub total_display_minutes: f64,
}

pub fn plan_view(plan: &ClassPlan, library: &ContentLibrary) -> PlanView {
    let concept = plan
        .concept_id
        .as_deref()
        .and_then(|id| library.find_concept(id))
        .map(|c| ConceptView {
            concept_id: c.id.clone(),
            title: c.title.clone(),
            content: c.content.clone(),
            images: c.images.clone(),
        });

    let sections: Vec<SectionView> = plan
        .sections
        .iter()
        .map(|section| {
            let entries: Vec<EntryView> = plan
                .entries(&section.id)
                .iter()
                .map(|entry| match library.find_game(&entry.game_id) {
                    Some(game) => EntryView {
                        game_id: entry.game_id.clone(),
                        title: game.title.clone(),
                        known: true,
                        contribution_minutes: entry_contribution(library, &entry.game_id),
                        goals: game.goals.clone(),
                        purpose: game.purpose.clone(),
                    },
                    None => EntryView {
                        game_id: entry.game_id.clone(),
                        title: "Unknown Game".to_string(),
                        known: false,
                        contribution_minutes: FALLBACK_MINUTES,
                        goals: String::new(),
                        purpose: String::new(),
                    },
                })
                .collect();

            let computed_total: f64 = entries.iter().map(|e| e.contribution_minutes).sum();
            let override_minutes = plan.overrides.get(&section.id).copied();
            let display = display_duration(section, computed_total, override_minutes);
            SectionView {
                section_id: section.id.clone(),
                title: section.title.clone(),
                section_type: section.section_type,
                target_duration: section.target_duration,
                computed_total,
                override_minutes,
                display_duration: display,
                display_badge: format_duration(display),
                pacing: pacing(display, section.target_duration),
                entries,
            }
        })
        .collect();

    let total_display_minutes = sections.iter().map(|s| s.display_duration).sum();

    PlanView {
        title: plan.title.clone(),
        date: plan.date.clone(),
        concept,
        sections,
        total_display_minutes,
    }
}
