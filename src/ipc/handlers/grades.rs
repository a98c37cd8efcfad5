use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::repo::{GradeError, StudentRepo};
use serde_json::{json, Map, Value};

fn required_str(req: &Request, field: &str) -> Result<String, serde_json::Value> {
    match req.params.get(field).and_then(|v| v.as_str()).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(err(
            &req.id,
            "bad_params",
            format!("missing {}", field),
            None,
        )),
    }
}

fn grades_input(req: &Request) -> Map<String, Value> {
    req.params
        .get("grades")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default()
}

fn handle_grades_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_store", "open a data store first", None);
    };

    let student_name = match required_str(req, "studentName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course_key = match required_str(req, "course") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let Some(course) = state.catalog.by_key(&course_key) else {
        return fail(
            &req.id,
            &GradeError::UnknownCourse { course: course_key },
        );
    };

    let grades = grades_input(req);
    let repo = StudentRepo::new(store, &state.catalog);
    match repo.submit_grade(&student_id, &student_name, course, &grades) {
        Ok(slip) => {
            log::info!("recorded {} grade for student {}", slip.course, slip.id);
            ok(&req.id, json!({ "student": slip }))
        }
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_grades_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_store", "open a data store first", None);
    };

    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course_name = match required_str(req, "courseName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let grades = grades_input(req);
    let repo = StudentRepo::new(store, &state.catalog);
    match repo.update_grade(&student_id, &course_name, &grades) {
        Ok(updated) => {
            log::info!(
                "updated {} grade for student {}",
                updated.course_name,
                student_id
            );
            ok(&req.id, json!({ "updatedCourse": updated }))
        }
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_grades_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_store", "open a data store first", None);
    };

    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course_name = match required_str(req, "courseName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let repo = StudentRepo::new(store, &state.catalog);
    match repo.delete_course(&student_id, &course_name) {
        Ok(outcome) => {
            log::info!(
                "deleted {} grade for student {} (student removed: {})",
                course_name,
                student_id,
                outcome.student_removed
            );
            ok(
                &req.id,
                json!({ "deleted": true, "studentRemoved": outcome.student_removed }),
            )
        }
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.submit" => Some(handle_grades_submit(state, req)),
        "grades.update" => Some(handle_grades_update(state, req)),
        "grades.delete" => Some(handle_grades_delete(state, req)),
        _ => None,
    }
}
