use anyhow::Context;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Gameplay structure of a drill. Round-Switching games run one round per
/// player, which is why the duration calculator multiplies by player count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameType {
    Continuous,
    #[serde(rename = "Switch-on-Win")]
    SwitchOnWin,
    #[serde(rename = "Round-Switching")]
    RoundSwitching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Intensity {
    Flow,
    Cooperative,
    Adversarial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Initiation {
    Static,
    Inertial,
    Separated,
}

impl GameType {
    pub fn parse(raw: &str) -> Option<GameType> {
        match normalize_token(raw).as_str() {
            "continuous" => Some(GameType::Continuous),
            "switch-on-win" => Some(GameType::SwitchOnWin),
            "round-switching" => Some(GameType::RoundSwitching),
            _ => None,
        }
    }
}

impl Intensity {
    pub fn parse(raw: &str) -> Option<Intensity> {
        match normalize_token(raw).as_str() {
            "flow" => Some(Intensity::Flow),
            "cooperative" => Some(Intensity::Cooperative),
            "adversarial" => Some(Intensity::Adversarial),
            _ => None,
        }
    }
}

impl Difficulty {
    pub fn parse(raw: &str) -> Option<Difficulty> {
        match normalize_token(raw).as_str() {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

impl Initiation {
    pub fn parse(raw: &str) -> Option<Initiation> {
        match normalize_token(raw).as_str() {
            "static" => Some(Initiation::Static),
            "inertial" => Some(Initiation::Inertial),
            "separated" => Some(Initiation::Separated),
            _ => None,
        }
    }
}

fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

/// A reusable timed drill parsed from a markdown file with frontmatter.
/// Free-text frontmatter values are validated here, once, at the store
/// boundary; everything downstream consumes the typed record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub title: String,
    pub category: String,
    pub players: Option<u32>,
    pub duration_minutes: Option<f64>,
    #[serde(rename = "type")]
    pub game_type: Option<GameType>,
    pub intensity: Option<Intensity>,
    pub difficulty: Option<Difficulty>,
    pub initiation: Option<Initiation>,
    pub goals: String,
    pub purpose: String,
    pub focus: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_name: Option<String>,
    pub path: String,
}

/// A technique/theory unit: one markdown body plus any sibling images.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub id: String,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub path: String,
}

/// Grouping derived from the folder layout: each concept folder that holds
/// a Games/ subfolder is a category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub title: String,
    pub games: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentLibrary {
    pub concepts: Vec<Concept>,
    pub games: Vec<Game>,
    pub categories: Vec<Category>,
}

impl ContentLibrary {
    pub fn find_game(&self, game_id: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.id == game_id)
    }

    pub fn find_concept(&self, concept_id: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.id == concept_id)
    }
}

/// Lowercase, whitespace and '/' mapped to '-'. Matches the id derivation
/// of the original content index so persisted plans keep resolving.
pub fn slug(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '-' } else { c })
        .collect()
}

pub fn game_id(category: &str, title: &str) -> String {
    slug(&format!("{}-{}", category, title))
}

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Scan the workspace content tree into a typed library.
/// Layout: Concepts/<Name>/<Name>.md plus Concepts/<Name>/Games/*.md.
pub fn scan_library(workspace: &Path) -> anyhow::Result<ContentLibrary> {
    let concepts_dir = workspace.join("Concepts");
    if !concepts_dir.is_dir() {
        return Ok(ContentLibrary::default());
    }

    let mut concepts: Vec<Concept> = Vec::new();
    let mut games: Vec<Game> = Vec::new();
    let mut categories: Vec<Category> = Vec::new();

    for folder in sorted_dirs(&concepts_dir)? {
        let folder_name = match folder.file_name().and_then(|s| s.to_str()) {
            Some(v) => v.to_string(),
            None => continue,
        };

        if let Some(concept) = read_concept(&folder, &folder_name)? {
            concepts.push(concept);
        }

        let games_dir = folder.join("Games");
        if !games_dir.is_dir() {
            continue;
        }
        let mut category = Category {
            id: slug(&folder_name),
            title: folder_name.clone(),
            games: Vec::new(),
        };
        for file in sorted_md_files(&games_dir)? {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read game file {}", file.to_string_lossy()))?;
            if let Some(mut game) = parse_game_file(&text) {
                // The folder wins over whatever the frontmatter claims so
                // the category always matches an existing concept.
                game.category = folder_name.clone();
                game.id = game_id(&folder_name, &game.title);
                game.path = file.to_string_lossy().to_string();
                category.games.push(game.id.clone());
                games.push(game);
            }
        }
        categories.push(category);
    }

    Ok(ContentLibrary {
        concepts,
        games,
        categories,
    })
}

fn read_concept(folder: &Path, folder_name: &str) -> anyhow::Result<Option<Concept>> {
    // Prefer the file named after the folder, else any sibling .md file.
    let preferred = folder.join(format!("{}.md", folder_name));
    let md_file = if preferred.is_file() {
        preferred
    } else {
        match sorted_md_files(folder)?.into_iter().next() {
            Some(p) => p,
            None => return Ok(None),
        }
    };

    let content = std::fs::read_to_string(&md_file)
        .with_context(|| format!("failed to read concept {}", md_file.to_string_lossy()))?;
    let title = content
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| folder_name.to_string());

    let mut images: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(folder)
        .with_context(|| format!("failed to list {}", folder.to_string_lossy()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                images.push(format!("Concepts/{}/{}", folder_name, name));
            }
        }
    }
    images.sort();

    Ok(Some(Concept {
        id: slug(&title),
        title,
        content,
        images,
        path: md_file.to_string_lossy().to_string(),
    }))
}

/// Parse one game markdown file. Files without a frontmatter block yield
/// no game (legacy free-form notes are skipped, not errors).
pub fn parse_game_file(text: &str) -> Option<Game> {
    let (front, body) = split_frontmatter(text)?;
    let meta = parse_frontmatter(front);

    let title = meta.get("title").cloned().unwrap_or_default();
    if title.is_empty() {
        return None;
    }

    let mut purpose = meta.get("purpose").cloned().unwrap_or_default();
    if purpose.is_empty() {
        if let Some(p) = legacy_body_purpose(body) {
            purpose = p;
        }
    }

    let players = meta
        .get("players")
        .and_then(|v| parse_leading_number(v))
        .map(|n| n as u32)
        .filter(|n| *n >= 1);
    let duration_minutes = meta
        .get("duration")
        .and_then(|v| parse_leading_number(v))
        .filter(|d| *d >= 0.0);

    let category = meta
        .get("category")
        .cloned()
        .unwrap_or_else(|| "Uncategorized".to_string());

    Some(Game {
        id: game_id(&category, &title),
        title,
        category,
        players,
        duration_minutes,
        game_type: meta.get("type").and_then(|v| GameType::parse(v)),
        intensity: meta.get("intensity").and_then(|v| Intensity::parse(v)),
        difficulty: meta.get("difficulty").and_then(|v| Difficulty::parse(v)),
        initiation: meta.get("initiation").and_then(|v| Initiation::parse(v)),
        goals: meta.get("goals").cloned().unwrap_or_default(),
        purpose,
        focus: meta.get("focus").cloned().unwrap_or_default(),
        description: body.trim().to_string(),
        parent_id: meta.get("parent_id").cloned().filter(|s| !s.is_empty()),
        variation_name: meta
            .get("variation_name")
            .cloned()
            .filter(|s| !s.is_empty()),
        path: String::new(),
    })
}

fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---")?;
    let end = rest.find("---")?;
    Some((&rest[..end], &rest[end + 3..]))
}

fn parse_frontmatter(front: &str) -> HashMap<String, String> {
    let mut meta = HashMap::new();
    for line in front.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                meta.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    meta
}

/// Older game files carried purpose as a bold label in the body instead of
/// frontmatter. Take the text after the marker, same line or next.
fn legacy_body_purpose(body: &str) -> Option<String> {
    let idx = body.find("**Purpose**")?;
    let after = &body[idx + "**Purpose**".len()..];
    after
        .lines()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .map(|l| l.to_string())
}

/// Pull the first numeric run out of a free-text value like "5 min" or
/// "2.5". Returns None when the value holds no digits.
pub fn parse_leading_number(raw: &str) -> Option<f64> {
    let mut out = String::new();
    let mut seen_digit = false;
    for c in raw.chars() {
        if c.is_ascii_digit() {
            seen_digit = true;
            out.push(c);
        } else if c == '.' && seen_digit && !out.ends_with('.') && !out.contains('.') {
            out.push(c);
        } else if seen_digit {
            break;
        }
    }
    if !seen_digit {
        return None;
    }
    out.trim_end_matches('.').parse::<f64>().ok()
}

fn sorted_dirs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.to_string_lossy()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn sorted_md_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.to_string_lossy()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("md") {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
