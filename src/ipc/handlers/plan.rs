use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::plan::{ClassPlan, SectionType};
use chrono::NaiveDate;
use serde_json::json;

fn view(state: &AppState) -> serde_json::Value {
    serde_json::to_value(calc::plan_view(&state.plan, &state.library)).unwrap_or_else(|_| json!({}))
}

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn required_index(req: &Request, key: &str) -> Result<usize, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn required_direction(req: &Request) -> Result<i64, serde_json::Value> {
    req.params
        .get("direction")
        .and_then(|v| v.as_i64())
        .filter(|d| *d == 1 || *d == -1)
        .ok_or_else(|| err(&req.id, "bad_params", "direction must be 1 or -1", None))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, view(state))
}

fn handle_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.plan = ClassPlan::from_default_template();
    ok(&req.id, view(state))
}

fn handle_set_title(state: &mut AppState, req: &Request) -> serde_json::Value {
    let title = match required_str(req, "title") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    state.plan.set_title(&title);
    ok(&req.id, view(state))
}

fn handle_set_date(state: &mut AppState, req: &Request) -> serde_json::Value {
    match req.params.get("date") {
        None | Some(serde_json::Value::Null) => {
            state.plan.date = None;
        }
        Some(serde_json::Value::String(raw)) => {
            if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_err() {
                return err(&req.id, "bad_params", "date must be YYYY-MM-DD", None);
            }
            state.plan.date = Some(raw.clone());
        }
        Some(_) => return err(&req.id, "bad_params", "date must be a string or null", None),
    }
    ok(&req.id, view(state))
}

fn handle_select_concept(state: &mut AppState, req: &Request) -> serde_json::Value {
    let concept_id = match required_str(req, "conceptId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    // Unknown ids leave the selection untouched rather than erroring; the
    // client list and the disk can drift between scans.
    if state.library.find_concept(&concept_id).is_some() {
        state.plan.select_concept(&concept_id);
    }
    ok(&req.id, view(state))
}

fn handle_sections_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let title = match required_str(req, "title") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let target = req.params.get("targetDuration").and_then(|v| v.as_f64());
    if target.map(|v| v < 0.0).unwrap_or(false) {
        return err(&req.id, "bad_params", "targetDuration must be >= 0", None);
    }
    let section_type = match req.params.get("type") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match serde_json::from_value::<SectionType>(v.clone()) {
            Ok(t) => Some(t),
            Err(_) => return err(&req.id, "bad_params", "unknown section type", None),
        },
    };
    let section_id = state.plan.add_section(&title, target, section_type);
    ok(&req.id, json!({ "sectionId": section_id, "plan": view(state) }))
}

fn handle_sections_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let index = match required_index(req, "index") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    state.plan.delete_section(index);
    ok(&req.id, view(state))
}

fn handle_sections_move(state: &mut AppState, req: &Request) -> serde_json::Value {
    let index = match required_index(req, "index") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let direction = match required_direction(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    state.plan.move_section(index, direction);
    ok(&req.id, view(state))
}

fn handle_sections_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let index = match required_index(req, "index") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let title = req
        .params
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    state.plan.rename_section(index, title);
    ok(&req.id, view(state))
}

fn handle_sections_set_override(state: &mut AppState, req: &Request) -> serde_json::Value {
    let section_id = match required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let minutes = match req.params.get("minutes") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_u64() {
            Some(m) => Some(m as u32),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "minutes must be a non-negative integer or null",
                    None,
                )
            }
        },
    };
    if !state.plan.set_section_duration_override(&section_id, minutes) {
        return err(&req.id, "not_found", "unknown section", None);
    }
    ok(&req.id, view(state))
}

fn handle_games_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let section_id = match required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let game_id = match required_str(req, "gameId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !state.plan.add_game_to_section(&section_id, &game_id) {
        return err(&req.id, "not_found", "unknown section", None);
    }
    ok(&req.id, view(state))
}

fn handle_games_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let section_id = match required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let index = match required_index(req, "index") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    state.plan.remove_game_from_section(&section_id, index);
    ok(&req.id, view(state))
}

fn handle_games_move(state: &mut AppState, req: &Request) -> serde_json::Value {
    let section_id = match required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let index = match required_index(req, "index") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let direction = match required_direction(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    state.plan.move_game_within_section(&section_id, index, direction);
    ok(&req.id, view(state))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "plan.get" => Some(handle_get(state, req)),
        "plan.reset" => Some(handle_reset(state, req)),
        "plan.setTitle" => Some(handle_set_title(state, req)),
        "plan.setDate" => Some(handle_set_date(state, req)),
        "plan.selectConcept" => Some(handle_select_concept(state, req)),
        "plan.sections.add" => Some(handle_sections_add(state, req)),
        "plan.sections.delete" => Some(handle_sections_delete(state, req)),
        "plan.sections.move" => Some(handle_sections_move(state, req)),
        "plan.sections.rename" => Some(handle_sections_rename(state, req)),
        "plan.sections.setOverride" => Some(handle_sections_set_override(state, req)),
        "plan.games.add" => Some(handle_games_add(state, req)),
        "plan.games.remove" => Some(handle_games_remove(state, req)),
        "plan.games.move" => Some(handle_games_move(state, req)),
        _ => None,
    }
}
