use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::parse_params;
use crate::ipc::types::{AppState, Request};
use crate::model::{GradeFilter, NewGrade};

fn handle_grades_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let new: NewGrade = match parse_params(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if new.student_id.trim().is_empty() {
        return err(&req.id, "bad_params", "student_id must not be empty", None);
    }
    if new.subject.trim().is_empty() {
        return err(&req.id, "bad_params", "subject must not be empty", None);
    }

    match store.add_grade(new) {
        Ok(grade_id) => ok(
            &req.id,
            json!({
                "gradeId": grade_id,
                "message": "Grade added successfully",
            }),
        ),
        Err(fault) => err(&req.id, "store_error", fault.to_string(), None),
    }
}

fn handle_grades_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let filter: GradeFilter = match parse_params(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    ok(
        &req.id,
        json!({ "grades": serde_json::to_value(store.grades(&filter)).unwrap_or_default() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.create" => Some(handle_grades_create(state, req)),
        "grades.list" => Some(handle_grades_list(state, req)),
        _ => None,
    }
}
