use crate::content;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::plan::ClassPlan;
use crate::store;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    if let Err(e) = store::init_workspace(&path) {
        return err(&req.id, "workspace_open_failed", format!("{e:?}"), None);
    }
    let library = match content::scan_library(&path) {
        Ok(lib) => lib,
        Err(e) => return err(&req.id, "scan_failed", format!("{e:?}"), None),
    };

    state.workspace = Some(path.clone());
    state.library = library;
    // A fresh workspace starts with the stock class structure; load/reset
    // are the only other ways the live plan is replaced wholesale.
    state.plan = ClassPlan::from_default_template();

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "conceptCount": state.library.concepts.len(),
            "gameCount": state.library.games.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
