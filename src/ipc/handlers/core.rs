use std::path::PathBuf;

use serde_json::json;

use crate::events::EventLog;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "backend": state.store.as_ref().map(|s| s.backend_kind().as_str()),
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

    // Store::open falls back to the in-memory backend by itself, so
    // selecting a workspace never fails; the response names the backend.
    let store = Store::open(&path);
    let backend = store.backend_kind().as_str();

    let mut log = EventLog::open(&path);
    log.append(
        "SYSTEM",
        &format!("Record store initialized ({backend} backend)"),
        "INFO",
    );

    state.workspace = Some(path.clone());
    state.store = Some(store);
    state.log = Some(log);

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "backend": backend,
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
