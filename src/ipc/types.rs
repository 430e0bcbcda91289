use std::path::PathBuf;

use serde::Deserialize;

use crate::content::ContentLibrary;
use crate::plan::ClassPlan;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the daemon holds between requests: the selected workspace,
/// the library scanned from it, and the one live plan being edited.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub library: ContentLibrary,
    pub plan: ClassPlan,
}

impl AppState {
    pub fn new() -> AppState {
        AppState {
            workspace: None,
            library: ContentLibrary::default(),
            plan: ClassPlan::from_default_template(),
        }
    }
}
