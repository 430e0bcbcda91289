use crate::calc;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;
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

/// Snapshot the live plan under the given name. The daemon's plan state
/// is the single source of truth; nothing in params can override it.
fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    state.plan.set_title(&name);
    match store::save_class(&ws, &name, &state.plan) {
        Ok(path) => ok(
            &req.id,
            json!({ "name": name, "path": path.to_string_lossy() }),
        ),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    match store::list_classes(&ws) {
        Ok(names) => ok(&req.id, json!({ "classes": names })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store::load_class(&ws, &name) {
        Ok(plan) => {
            state.plan = plan;
            let view = serde_json::to_value(calc::plan_view(&state.plan, &state.library))
                .unwrap_or_else(|_| json!({}));
            ok(&req.id, json!({ "name": name, "plan": view }))
        }
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.save" => Some(handle_save(state, req)),
        "classes.list" => Some(handle_list(state, req)),
        "classes.load" => Some(handle_load(state, req)),
        _ => None,
    }
}
