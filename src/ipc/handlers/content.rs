use crate::content::{self, game_id, slug};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, GameDraft};
use serde_json::{json, Value as JsonValue};
use std::path::PathBuf;

fn workspace(state: &AppState, req: &Request) -> Result<PathBuf, serde_json::Value> {
    state
        .workspace
        .clone()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn opt_str(params: &JsonValue, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn rescan(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let ws = state.workspace.clone()?;
    match content::scan_library(&ws) {
        Ok(lib) => {
            state.library = lib;
            None
        }
        Err(e) => Some(err(&req.id, "scan_failed", format!("{e:?}"), None)),
    }
}

fn handle_index(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = workspace(state, req) {
        return resp;
    }
    if let Some(resp) = rescan(state, req) {
        return resp;
    }
    match serde_json::to_value(&state.library) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    let kind = match required_str(req, "kind") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let overwrite = req
        .params
        .get("overwrite")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let created = match kind.as_str() {
        "concept" => {
            let name = match required_str(req, "name") {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let description = opt_str(&req.params, "description");
            match store::create_concept(&ws, &name, description.as_deref(), overwrite) {
                Ok(path) => json!({
                    "path": path.to_string_lossy(),
                    "id": slug(&name),
                }),
                Err(e) => return store_err(&req.id, e),
            }
        }
        "game" => {
            let name = match required_str(req, "name") {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let category = match required_str(req, "category") {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let draft = GameDraft {
                name: name.clone(),
                category: category.clone(),
                players: opt_str(&req.params, "players"),
                duration: opt_str(&req.params, "duration"),
                game_type: opt_str(&req.params, "type"),
                intensity: opt_str(&req.params, "intensity"),
                difficulty: opt_str(&req.params, "difficulty"),
                initiation: opt_str(&req.params, "initiation"),
                goals: opt_str(&req.params, "goals"),
                purpose: opt_str(&req.params, "purpose"),
                focus: opt_str(&req.params, "focus"),
                parent_id: opt_str(&req.params, "parentId"),
                variation_name: opt_str(&req.params, "variationName"),
                description: opt_str(&req.params, "description"),
            };
            // The id must match what the next scan derives, and the scan
            // keys off the sanitized folder name.
            let folder = store::sanitize_name(&category).replace(' ', "");
            match store::create_game(&ws, &draft, overwrite) {
                Ok(path) => json!({
                    "path": path.to_string_lossy(),
                    "id": game_id(&folder, &name),
                }),
                Err(e) => return store_err(&req.id, e),
            }
        }
        other => {
            return err(
                &req.id,
                "bad_params",
                format!("unknown kind: {}", other),
                None,
            )
        }
    };

    if let Some(resp) = rescan(state, req) {
        return resp;
    }
    ok(&req.id, created)
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match req.params.get("content").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing content", None),
    };
    match store::save_file(&ws, &path, &body) {
        Ok(written) => {
            if let Some(resp) = rescan(state, req) {
                return resp;
            }
            ok(&req.id, json!({ "path": written.to_string_lossy() }))
        }
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store::delete_path(&ws, &path) {
        Ok(()) => {
            if let Some(resp) = rescan(state, req) {
                return resp;
            }
            ok(&req.id, json!({ "deleted": true }))
        }
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "content.index" => Some(handle_index(state, req)),
        "content.create" => Some(handle_create(state, req)),
        "content.save" => Some(handle_save(state, req)),
        "content.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
