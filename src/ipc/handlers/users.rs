use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::parse_params;
use crate::ipc::types::{AppState, Request};
use crate::model::NewUser;
use crate::store::StoreFault;

fn handle_users_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let new: NewUser = match parse_params(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if new.name.trim().is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    if new.role.trim().is_empty() {
        return err(&req.id, "bad_params", "role must not be empty", None);
    }

    let name = new.name.clone();
    match store.register_user(new) {
        Ok(user_id) => {
            if let Some(log) = state.log.as_mut() {
                log.append(
                    "USER",
                    &format!("User registered: {name} (ID: {user_id})"),
                    "INFO",
                );
            }
            ok(
                &req.id,
                json!({
                    "userId": user_id,
                    "message": "User registered successfully",
                }),
            )
        }
        Err(fault @ StoreFault::DuplicateKey) => {
            err(&req.id, "duplicate_key", fault.to_string(), None)
        }
        Err(fault) => err(&req.id, "store_error", fault.to_string(), None),
    }
}

fn handle_users_authenticate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let user_id = match req.params.get("userId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing userId", None),
    };
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    match store.authenticate(&user_id, &password) {
        Ok(user) => ok(
            &req.id,
            json!({ "user": serde_json::to_value(&user).unwrap_or(serde_json::Value::Null) }),
        ),
        Err(fault @ StoreFault::InvalidCredentials) => {
            if let Some(log) = state.log.as_mut() {
                log.append(
                    "SECURITY",
                    &format!("Failed login attempt for user {user_id}"),
                    "WARNING",
                );
            }
            err(&req.id, "invalid_credentials", fault.to_string(), None)
        }
        Err(fault) => err(&req.id, "store_error", fault.to_string(), None),
    }
}

fn handle_users_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(
        &req.id,
        json!({ "users": serde_json::to_value(store.users()).unwrap_or_default() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.register" => Some(handle_users_register(state, req)),
        "users.authenticate" => Some(handle_users_authenticate(state, req)),
        "users.list" => Some(handle_users_list(state, req)),
        _ => None,
    }
}
