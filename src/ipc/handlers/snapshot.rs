use std::path::PathBuf;

use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::{BackendKind, Snapshot, StoreFault};

fn handle_snapshot_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) => PathBuf::from(v),
        None => return err(&req.id, "bad_params", "missing outPath", None),
    };

    let Some(snapshot) = store.export() else {
        return err(&req.id, "store_error", "export failed", None);
    };

    let (bytes, backend) = match &snapshot {
        Snapshot::Binary(b) => (b.clone(), "sqlite"),
        Snapshot::Text(t) => (t.clone().into_bytes(), "memory"),
    };
    if let Some(parent) = out_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return err(&req.id, "export_failed", e.to_string(), None);
        }
    }
    if let Err(e) = std::fs::write(&out_path, &bytes) {
        return err(&req.id, "export_failed", e.to_string(), None);
    }

    if let Some(log) = state.log.as_mut() {
        log.append("DATABASE", "Data export completed successfully", "INFO");
    }

    ok(
        &req.id,
        json!({
            "outPath": out_path.to_string_lossy(),
            "backend": backend,
            "bytes": bytes.len(),
        }),
    )
}

fn handle_snapshot_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let in_path = match req.params.get("inPath").and_then(|v| v.as_str()) {
        Some(v) => PathBuf::from(v),
        None => return err(&req.id, "bad_params", "missing inPath", None),
    };
    let bytes = match std::fs::read(&in_path) {
        Ok(b) => b,
        Err(e) => return err(&req.id, "import_failed", e.to_string(), None),
    };

    // The snapshot flavor must match the live backend.
    let snapshot = match store.backend_kind() {
        BackendKind::Sqlite => Snapshot::Binary(bytes),
        BackendKind::Memory => match String::from_utf8(bytes) {
            Ok(text) => Snapshot::Text(text),
            Err(_) => {
                return err(
                    &req.id,
                    "import_failed",
                    StoreFault::ImportShapeMismatch.to_string(),
                    None,
                )
            }
        },
    };

    if !store.import(&snapshot) {
        return err(
            &req.id,
            "import_failed",
            StoreFault::ImportShapeMismatch.to_string(),
            None,
        );
    }

    if let Some(log) = state.log.as_mut() {
        log.append("DATABASE", "Data import completed successfully", "INFO");
    }

    ok(&req.id, json!({ "imported": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "snapshot.export" => Some(handle_snapshot_export(state, req)),
        "snapshot.import" => Some(handle_snapshot_import(state, req)),
        _ => None,
    }
}
