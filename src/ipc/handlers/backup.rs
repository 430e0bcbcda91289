use crate::backup;
use crate::content;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::{Path, PathBuf};

fn workspace(state: &AppState, req: &Request) -> Result<PathBuf, serde_json::Value> {
    state
        .workspace
        .clone()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn required_path(req: &Request, workspace: &Path, key: &str) -> Result<PathBuf, serde_json::Value> {
    let raw = req
        .params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))?;
    let p = PathBuf::from(raw);
    // Relative bundle paths land next to the workspace content.
    Ok(if p.is_absolute() { p } else { workspace.join(p) })
}

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    let out_path = match required_path(req, &ws, "outPath") {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match backup::export_workspace_bundle(&ws, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "path": out_path.to_string_lossy(),
                "format": summary.bundle_format,
                "fileCount": summary.file_count,
            }),
        ),
        Err(e) => err(&req.id, "export_failed", format!("{e:?}"), None),
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    let in_path = match required_path(req, &ws, "inPath") {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match backup::import_workspace_bundle(&in_path, &ws) {
        Ok(summary) => {
            // The bundle may have replaced content files out from under
            // the in-memory index.
            match content::scan_library(&ws) {
                Ok(lib) => state.library = lib,
                Err(e) => return err(&req.id, "scan_failed", format!("{e:?}"), None),
            }
            ok(
                &req.id,
                json!({
                    "format": summary.bundle_format_detected,
                    "fileCount": summary.file_count,
                }),
            )
        }
        Err(e) => err(&req.id, "import_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import(state, req)),
        _ => None,
    }
}
