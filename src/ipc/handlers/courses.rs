use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

/// The catalog is fixed at startup, so listing it never touches the store.
fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut courses = Map::new();
    for course in state.catalog.courses() {
        let mut components = Map::new();
        for component in &course.components {
            components.insert(component.name.clone(), Value::from(component.weight));
        }
        courses.insert(
            course.key.clone(),
            json!({ "name": course.name, "components": components }),
        );
    }
    ok(&req.id, json!({ "courses": courses }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_courses_list(state, req)),
        _ => None,
    }
}
