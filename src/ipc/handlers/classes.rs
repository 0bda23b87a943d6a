use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::parse_params;
use crate::ipc::types::{AppState, Request};
use crate::model::NewClass;

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let new: NewClass = match parse_params(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if new.class_name.trim().is_empty() {
        return err(&req.id, "bad_params", "class_name must not be empty", None);
    }

    match store.add_class(new) {
        Ok(class_id) => ok(
            &req.id,
            json!({
                "classId": class_id,
                "message": "Class added successfully",
            }),
        ),
        Err(fault) => err(&req.id, "store_error", fault.to_string(), None),
    }
}

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(
        &req.id,
        json!({ "classes": serde_json::to_value(store.classes()).unwrap_or_default() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.list" => Some(handle_classes_list(state, req)),
        _ => None,
    }
}
