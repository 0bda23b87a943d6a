use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::parse_params;
use crate::ipc::types::{AppState, Request};
use crate::model::{NewTeacher, TeacherFilter};

fn handle_teachers_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let new: NewTeacher = match parse_params(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if new.name.trim().is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }

    let name = new.name.clone();
    match store.add_teacher(new) {
        Ok(teacher_id) => {
            if let Some(log) = state.log.as_mut() {
                log.append(
                    "USER",
                    &format!("Teacher registered: {name} (ID: {teacher_id})"),
                    "INFO",
                );
            }
            ok(
                &req.id,
                json!({
                    "teacherId": teacher_id,
                    "message": "Teacher added successfully",
                }),
            )
        }
        Err(fault) => err(&req.id, "store_error", fault.to_string(), None),
    }
}

fn handle_teachers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let filter: TeacherFilter = match parse_params(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    ok(
        &req.id,
        json!({ "teachers": serde_json::to_value(store.teachers(&filter)).unwrap_or_default() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.create" => Some(handle_teachers_create(state, req)),
        "teachers.list" => Some(handle_teachers_list(state, req)),
        _ => None,
    }
}
