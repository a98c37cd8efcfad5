use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::repo::{self, StudentRepo};
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_store", "open a data store first", None);
    };

    let search_by_id = req.params.get("searchById").and_then(|v| v.as_str());
    let status = req.params.get("status").and_then(|v| v.as_str());
    let filter = match repo::parse_filter(search_by_id, status) {
        Ok(f) => f,
        Err(e) => return fail(&req.id, &e),
    };

    let repo = StudentRepo::new(store, &state.catalog);
    match repo.list(&filter) {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_store", "open a data store first", None);
    };

    let student_id = match req
        .params
        .get("studentId")
        .and_then(|v| v.as_str())
        .map(str::trim)
    {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => return err(&req.id, "bad_params", "missing studentId", None),
    };

    let repo = StudentRepo::new(store, &state.catalog);
    match repo.delete_student(&student_id) {
        Ok(()) => {
            log::info!("deleted student {}", student_id);
            ok(&req.id, json!({ "deleted": true, "studentId": student_id }))
        }
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
