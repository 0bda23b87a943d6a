use std::path::PathBuf;

use serde_json::json;

use crate::events::LogFilter;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::parse_params;
use crate::ipc::types::{AppState, Request};

fn handle_logs_append(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(log) = state.log.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let kind = match req.params.get("type").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing type", None),
    };
    let message = match req.params.get("message").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing message", None),
    };
    let level = req
        .params
        .get("level")
        .and_then(|v| v.as_str())
        .unwrap_or("INFO");

    let entry = log.append(kind, message, level);
    ok(
        &req.id,
        json!({ "entry": serde_json::to_value(&entry).unwrap_or_default() }),
    )
}

fn handle_logs_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(log) = state.log.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let filter: LogFilter = match parse_params(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    ok(
        &req.id,
        json!({ "logs": serde_json::to_value(log.query(&filter)).unwrap_or_default() }),
    )
}

fn handle_logs_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(log) = state.log.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(
        &req.id,
        json!({ "stats": serde_json::to_value(log.stats()).unwrap_or_default() }),
    )
}

fn handle_logs_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(log) = state.log.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    log.clear();
    ok(&req.id, json!({ "cleared": true }))
}

fn handle_logs_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(log) = state.log.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) => PathBuf::from(v),
        None => return err(&req.id, "bad_params", "missing outPath", None),
    };
    let filter: LogFilter = match parse_params(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let text = log.export(&filter);
    if let Err(e) = std::fs::write(&out_path, &text) {
        return err(&req.id, "export_failed", e.to_string(), None);
    }
    ok(
        &req.id,
        json!({
            "outPath": out_path.to_string_lossy(),
            "totalLogs": log.query(&filter).len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "logs.append" => Some(handle_logs_append(state, req)),
        "logs.list" => Some(handle_logs_list(state, req)),
        "logs.stats" => Some(handle_logs_stats(state, req)),
        "logs.clear" => Some(handle_logs_clear(state, req)),
        "logs.export" => Some(handle_logs_export(state, req)),
        _ => None,
    }
}
