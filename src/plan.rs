use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Rendering hint for a section. Carries no behavior beyond display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Standing,
    Game,
    Takedown,
    Discussion,
    Review,
    Rolling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub title: String,
    pub target_duration: f64,
    #[serde(rename = "type")]
    pub section_type: SectionType,
}

/// One placement of a game inside a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    pub game_id: String,
}

/// The aggregate root: everything a saved class file holds.
///
/// Invariants kept by the mutation methods below: section ids are unique,
/// and `segments`/`overrides` never hold keys for a removed section.
/// Entries referencing games that no longer exist in the content library
/// are tolerated; the view layer renders them as "Unknown Game".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPlan {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub segments: HashMap<String, Vec<PlanEntry>>,
    #[serde(default)]
    pub overrides: HashMap<String, u32>,
}

pub const DEFAULT_TARGET_DURATION: f64 = 10.0;

impl ClassPlan {
    /// The stock class structure a fresh plan starts from. The section list
    /// stays fully editable afterwards.
    pub fn from_default_template() -> ClassPlan {
        let template: [(&str, f64, SectionType); 7] = [
            ("1. Standing", 10.0, SectionType::Standing),
            ("2. Mobility", 15.0, SectionType::Game),
            ("3. Takedowns", 15.0, SectionType::Takedown),
            ("4. Discussion", 5.0, SectionType::Discussion),
            ("5. Concept Applications", 30.0, SectionType::Game),
            ("6. Review", 5.0, SectionType::Review),
            ("7. Free Roll", 15.0, SectionType::Rolling),
        ];
        let mut plan = ClassPlan::default();
        for (title, target, section_type) in template {
            plan.push_section(title.to_string(), target, section_type);
        }
        plan
    }

    fn push_section(
        &mut self,
        title: String,
        target_duration: f64,
        section_type: SectionType,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        self.segments.insert(id.clone(), Vec::new());
        self.sections.push(Section {
            id: id.clone(),
            title,
            target_duration,
            section_type,
        });
        id
    }

    pub fn section_index(&self, section_id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == section_id)
    }

    pub fn entries(&self, section_id: &str) -> &[PlanEntry] {
        self.segments
            .get(section_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Store the selected concept id as given. The plan does not know the
    /// library, so checking that the id exists (and skipping the call when
    /// it does not) is the caller's job.
    pub fn select_concept(&mut self, concept_id: &str) {
        self.concept_id = Some(concept_id.to_string());
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Append a section and return its generated id.
    pub fn add_section(
        &mut self,
        title: &str,
        target_duration: Option<f64>,
        section_type: Option<SectionType>,
    ) -> String {
        self.push_section(
            title.to_string(),
            target_duration.unwrap_or(DEFAULT_TARGET_DURATION),
            section_type.unwrap_or(SectionType::Game),
        )
    }

    /// Remove the section at `index` along with its entry list and any
    /// manual override. Out of range is a no-op.
    pub fn delete_section(&mut self, index: usize) -> bool {
        if index >= self.sections.len() {
            return false;
        }
        let removed = self.sections.remove(index);
        self.segments.remove(&removed.id);
        self.overrides.remove(&removed.id);
        true
    }

    /// Pairwise swap with the neighbor at `index + direction`. When the
    /// target lands out of bounds nothing moves at all.
    pub fn move_section(&mut self, index: usize, direction: i64) -> bool {
        match swap_target(index, direction, self.sections.len()) {
            Some(target) => {
                self.sections.swap(index, target);
                true
            }
            None => false,
        }
    }

    /// Rename, ignoring empty/whitespace titles so a cleared input never
    /// wipes the existing name.
    pub fn rename_section(&mut self, index: usize, new_title: &str) -> bool {
        let trimmed = new_title.trim();
        if trimmed.is_empty() {
            return false;
        }
        match self.sections.get_mut(index) {
            Some(section) => {
                section.title = trimmed.to_string();
                true
            }
            None => false,
        }
    }

    /// Append an entry to the section's list, creating the list if the
    /// loaded plan came without one. Unknown sections are rejected so no
    /// entry can ever point at a section that is not in the plan.
    pub fn add_game_to_section(&mut self, section_id: &str, game_id: &str) -> bool {
        if self.section_index(section_id).is_none() {
            return false;
        }
        self.segments
            .entry(section_id.to_string())
            .or_default()
            .push(PlanEntry {
                game_id: game_id.to_string(),
            });
        true
    }

    pub fn remove_game_from_section(&mut self, section_id: &str, index: usize) -> bool {
        match self.segments.get_mut(section_id) {
            Some(entries) if index < entries.len() => {
                entries.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn move_game_within_section(
        &mut self,
        section_id: &str,
        index: usize,
        direction: i64,
    ) -> bool {
        let Some(entries) = self.segments.get_mut(section_id) else {
            return false;
        };
        match swap_target(index, direction, entries.len()) {
            Some(target) => {
                entries.swap(index, target);
                true
            }
            None => false,
        }
    }

    /// Store or replace the manual duration override for a section.
    /// `None` clears it, falling back to the computed display.
    pub fn set_section_duration_override(
        &mut self,
        section_id: &str,
        minutes: Option<u32>,
    ) -> bool {
        if self.section_index(section_id).is_none() {
            return false;
        }
        match minutes {
            Some(m) => {
                self.overrides.insert(section_id.to_string(), m);
            }
            None => {
                self.overrides.remove(section_id);
            }
        }
        true
    }
}

/// Index of the swap partner for a pairwise move, or None when either end
/// of the swap is out of bounds. `index` itself must be in range too.
fn swap_target(index: usize, direction: i64, len: usize) -> Option<usize> {
    if index >= len {
        return None;
    }
    let target = index as i64 + direction;
    if target < 0 || target as usize >= len || target as usize == index {
        return None;
    }
    Some(target as usize)
}
