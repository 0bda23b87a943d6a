use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::parse_params;
use crate::ipc::types::{AppState, Request};
use crate::model::NewParent;

fn handle_parents_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let new: NewParent = match parse_params(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if new.name.trim().is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }

    match store.add_parent(new) {
        Ok(parent_id) => ok(
            &req.id,
            json!({
                "parentId": parent_id,
                "message": "Parent added successfully",
            }),
        ),
        Err(fault) => err(&req.id, "store_error", fault.to_string(), None),
    }
}

fn handle_parents_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(
        &req.id,
        json!({ "parents": serde_json::to_value(store.parents()).unwrap_or_default() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "parents.create" => Some(handle_parents_create(state, req)),
        "parents.list" => Some(handle_parents_list(state, req)),
        _ => None,
    }
}
