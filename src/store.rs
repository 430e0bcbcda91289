use crate::plan::ClassPlan;
use anyhow::Context;
use std::path::{Component, Path, PathBuf};

const SAVED_CLASSES_DIR: &str = "Saved Classes";
const CONCEPTS_DIR: &str = "Concepts";

/// Store failure with a stable code the IPC layer maps straight into an
/// error response (`conflict`, `not_found`, `forbidden_path`, `io_failed`).
#[derive(Debug)]
pub struct StoreError {
    pub code: &'static str,
    pub message: String,
}

impl StoreError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn io(err: impl std::fmt::Display) -> Self {
        Self::new("io_failed", err.to_string())
    }
}

/// Keep alphanumerics, spaces, hyphens and underscores; drop the rest.
/// Matches the original server's name sanitizer for saved files.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect()
}

fn class_file_name(name: &str) -> String {
    format!("{}.json", sanitize_name(name).replace(' ', "_"))
}

pub fn saved_classes_dir(workspace: &Path) -> PathBuf {
    workspace.join(SAVED_CLASSES_DIR)
}

/// Persist the plan as a named JSON snapshot, last write wins.
pub fn save_class(workspace: &Path, name: &str, plan: &ClassPlan) -> Result<PathBuf, StoreError> {
    if sanitize_name(name).trim().is_empty() {
        return Err(StoreError::new("bad_params", "class name must not be empty"));
    }
    let dir = saved_classes_dir(workspace);
    std::fs::create_dir_all(&dir).map_err(StoreError::io)?;
    let path = dir.join(class_file_name(name));
    let text = serde_json::to_string_pretty(plan).map_err(StoreError::io)?;
    std::fs::write(&path, text).map_err(StoreError::io)?;
    Ok(path)
}

/// Names of saved plans, underscores mapped back to spaces, sorted.
pub fn list_classes(workspace: &Path) -> Result<Vec<String>, StoreError> {
    let dir = saved_classes_dir(workspace);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(&dir).map_err(StoreError::io)? {
        let path = entry.map_err(StoreError::io)?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.replace('_', " "));
        }
    }
    names.sort();
    Ok(names)
}

pub fn load_class(workspace: &Path, name: &str) -> Result<ClassPlan, StoreError> {
    let path = saved_classes_dir(workspace).join(class_file_name(name));
    if !path.is_file() {
        return Err(StoreError::new("not_found", format!("class not found: {}", name)));
    }
    let text = std::fs::read_to_string(&path).map_err(StoreError::io)?;
    serde_json::from_str(&text)
        .map_err(|e| StoreError::new("bad_data", format!("invalid class file: {}", e)))
}

/// Resolve a caller-supplied path (absolute or workspace-relative) and
/// reject anything that escapes the workspace.
pub fn resolve_in_workspace(workspace: &Path, raw: &str) -> Result<PathBuf, StoreError> {
    let candidate = PathBuf::from(raw);
    let joined = if candidate.is_absolute() {
        candidate
    } else {
        workspace.join(candidate)
    };
    // Lexical containment check: no parent-dir hops, prefix must hold.
    let mut clean = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                return Err(StoreError::new(
                    "forbidden_path",
                    format!("path escapes workspace: {}", raw),
                ))
            }
            Component::CurDir => {}
            other => clean.push(other.as_os_str()),
        }
    }
    if !clean.starts_with(workspace) {
        return Err(StoreError::new(
            "forbidden_path",
            format!("path outside workspace: {}", raw),
        ));
    }
    Ok(clean)
}

/// Overwrite a content file's raw text (free-text body edits).
pub fn save_file(workspace: &Path, raw_path: &str, content: &str) -> Result<PathBuf, StoreError> {
    let path = resolve_in_workspace(workspace, raw_path)?;
    std::fs::write(&path, content).map_err(StoreError::io)?;
    Ok(path)
}

/// Delete a file or folder inside the workspace (concept/game removal).
pub fn delete_path(workspace: &Path, raw_path: &str) -> Result<(), StoreError> {
    let path = resolve_in_workspace(workspace, raw_path)?;
    if !path.exists() {
        return Err(StoreError::new(
            "not_found",
            format!("path not found: {}", raw_path),
        ));
    }
    if path.is_dir() {
        std::fs::remove_dir_all(&path).map_err(StoreError::io)?;
    } else {
        std::fs::remove_file(&path).map_err(StoreError::io)?;
    }
    Ok(())
}

/// Creation payload for a new game file; raw strings land in frontmatter
/// as given and are validated on the next library scan.
#[derive(Debug, Default, Clone)]
pub struct GameDraft {
    pub name: String,
    pub category: String,
    pub players: Option<String>,
    pub duration: Option<String>,
    pub game_type: Option<String>,
    pub intensity: Option<String>,
    pub difficulty: Option<String>,
    pub initiation: Option<String>,
    pub goals: Option<String>,
    pub purpose: Option<String>,
    pub focus: Option<String>,
    pub parent_id: Option<String>,
    pub variation_name: Option<String>,
    pub description: Option<String>,
}

fn write_new_file(path: &Path, content: &str, overwrite: bool) -> Result<(), StoreError> {
    if path.exists() && !overwrite {
        return Err(StoreError::new(
            "conflict",
            format!("file already exists: {}", path.to_string_lossy()),
        ));
    }
    std::fs::write(path, content).map_err(StoreError::io)
}

/// Create Concepts/<Name>/<Name>.md with a heading and description body.
pub fn create_concept(
    workspace: &Path,
    name: &str,
    description: Option<&str>,
    overwrite: bool,
) -> Result<PathBuf, StoreError> {
    let safe = sanitize_name(name);
    let compact = safe.replace(' ', "");
    if compact.is_empty() {
        return Err(StoreError::new("bad_params", "concept name must not be empty"));
    }
    let folder = workspace.join(CONCEPTS_DIR).join(&compact);
    std::fs::create_dir_all(&folder).map_err(StoreError::io)?;
    let path = folder.join(format!("{}.md", compact));
    let body = description.unwrap_or("Description of the concept.");
    write_new_file(&path, &format!("# {}\n\n{}\n", name, body), overwrite)?;
    Ok(path)
}

/// Create Concepts/<Category>/Games/<Name>.md with frontmatter. Only
/// fields with a value are written so variations can inherit from their
/// parent by omission.
pub fn create_game(
    workspace: &Path,
    draft: &GameDraft,
    overwrite: bool,
) -> Result<PathBuf, StoreError> {
    let safe_name = sanitize_name(&draft.name);
    let compact_name = safe_name.replace(' ', "");
    if compact_name.is_empty() {
        return Err(StoreError::new("bad_params", "game name must not be empty"));
    }
    let safe_category = sanitize_name(&draft.category).replace(' ', "");
    if safe_category.is_empty() {
        return Err(StoreError::new("bad_params", "game category must not be empty"));
    }

    let games_dir = workspace.join(CONCEPTS_DIR).join(&safe_category).join("Games");
    std::fs::create_dir_all(&games_dir).map_err(StoreError::io)?;
    let path = games_dir.join(format!("{}.md", compact_name));

    let mut lines: Vec<String> = vec!["---".to_string()];
    let mut push = |key: &str, value: Option<&str>| {
        if let Some(v) = value {
            let v = v.trim();
            if !v.is_empty() {
                lines.push(format!("{}: {}", key, v));
            }
        }
    };
    push("title", Some(&draft.name));
    push("category", Some(&draft.category));
    push("players", draft.players.as_deref());
    push("duration", draft.duration.as_deref());
    push("type", draft.game_type.as_deref());
    push("intensity", draft.intensity.as_deref());
    push("difficulty", draft.difficulty.as_deref());
    push("initiation", draft.initiation.as_deref());
    push("parent_id", draft.parent_id.as_deref());
    push("variation_name", draft.variation_name.as_deref());
    push("goals", draft.goals.as_deref());
    push("purpose", draft.purpose.as_deref());
    push("focus", draft.focus.as_deref());
    lines.push("---".to_string());
    lines.push(String::new());
    let default_desc = format!("Description of {}.", draft.name);
    lines.push(
        draft
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&default_desc)
            .to_string(),
    );

    write_new_file(&path, &format!("{}\n", lines.join("\n")), overwrite)?;
    Ok(path)
}

/// Bootstrap the workspace skeleton so a fresh directory is usable.
pub fn init_workspace(workspace: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(workspace.join(CONCEPTS_DIR))
        .with_context(|| format!("failed to create {}", workspace.to_string_lossy()))?;
    std::fs::create_dir_all(saved_classes_dir(workspace))
        .with_context(|| format!("failed to create {}", workspace.to_string_lossy()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_workspace(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn sanitize_strips_everything_but_safe_chars() {
        assert_eq!(sanitize_name("Back Control!"), "Back Control");
        assert_eq!(sanitize_name("a/b\\c:d"), "abcd");
        assert_eq!(sanitize_name("week-3_plan"), "week-3_plan");
    }

    #[test]
    fn class_snapshot_round_trips_by_name() {
        let ws = temp_workspace("ecoclass-store-roundtrip");
        let mut plan = ClassPlan::from_default_template();
        plan.set_title("Monday Class");
        let path = save_class(&ws, "Monday Class", &plan).expect("save");
        assert!(path.ends_with("Saved Classes/Monday_Class.json"));

        assert_eq!(list_classes(&ws).expect("list"), vec!["Monday Class"]);
        let loaded = load_class(&ws, "Monday Class").expect("load");
        assert_eq!(loaded.title, "Monday Class");
        assert_eq!(loaded.sections.len(), 7);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn load_missing_class_is_not_found() {
        let ws = temp_workspace("ecoclass-store-missing");
        let err = load_class(&ws, "Nope").expect_err("missing");
        assert_eq!(err.code, "not_found");
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn containment_rejects_parent_hops_and_foreign_roots() {
        let ws = temp_workspace("ecoclass-store-containment");
        assert_eq!(
            resolve_in_workspace(&ws, "../outside.md").expect_err("hop").code,
            "forbidden_path"
        );
        assert_eq!(
            resolve_in_workspace(&ws, "/etc/passwd").expect_err("root").code,
            "forbidden_path"
        );
        let ok = resolve_in_workspace(&ws, "Concepts/X/X.md").expect("inside");
        assert!(ok.starts_with(&ws));
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn create_game_writes_frontmatter_the_scanner_reads_back() {
        let ws = temp_workspace("ecoclass-store-create");
        let draft = GameDraft {
            name: "King of the Hill".to_string(),
            category: "Back Control".to_string(),
            players: Some("4".to_string()),
            duration: Some("3 min".to_string()),
            game_type: Some("Round-Switching".to_string()),
            intensity: Some("Adversarial".to_string()),
            goals: Some("Hold the back".to_string()),
            ..GameDraft::default()
        };
        let path = create_game(&ws, &draft, false).expect("create");
        let text = std::fs::read_to_string(&path).expect("read back");
        let game = crate::content::parse_game_file(&text).expect("parse");
        assert_eq!(game.title, "King of the Hill");
        assert_eq!(game.players, Some(4));
        assert_eq!(game.duration_minutes, Some(3.0));
        assert_eq!(
            game.game_type,
            Some(crate::content::GameType::RoundSwitching)
        );
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn create_conflict_requires_overwrite() {
        let ws = temp_workspace("ecoclass-store-conflict");
        let first = create_concept(&ws, "Frames", Some("Structure over strength."), false)
            .expect("first create");
        let err = create_concept(&ws, "Frames", Some("Changed."), false).expect_err("conflict");
        assert_eq!(err.code, "conflict");
        let again = create_concept(&ws, "Frames", Some("Changed."), true).expect("overwrite");
        assert_eq!(first, again);
        let text = std::fs::read_to_string(&again).expect("read");
        assert!(text.contains("Changed."));
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn empty_frontmatter_fields_are_omitted_for_inheritance() {
        let ws = temp_workspace("ecoclass-store-inherit");
        let draft = GameDraft {
            name: "Variation".to_string(),
            category: "Guard".to_string(),
            parent_id: Some("guard-base-game".to_string()),
            variation_name: Some("No Grips".to_string()),
            ..GameDraft::default()
        };
        let path = create_game(&ws, &draft, false).expect("create");
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(!text.contains("players:"));
        assert!(!text.contains("duration:"));
        assert!(text.contains("parent_id: guard-base-game"));
        assert!(text.contains("variation_name: No Grips"));
        let _ = std::fs::remove_dir_all(ws);
    }
}
