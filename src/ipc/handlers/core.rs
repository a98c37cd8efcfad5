use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::repo::StudentRepo;
use crate::store::SqliteStore;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dataDir": state.data_dir.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_store_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match SqliteStore::open(&path) {
        Ok(store) => {
            let seeded = match StudentRepo::new(&store, &state.catalog).ensure_initialized() {
                Ok(v) => v,
                Err(e) => return fail(&req.id, &e),
            };
            if seeded {
                log::info!("seeded empty grade document in {}", path.to_string_lossy());
            }
            log::info!("data store ready at {}", path.to_string_lossy());
            state.data_dir = Some(path.clone());
            state.store = Some(store);
            ok(
                &req.id,
                json!({ "dataDir": path.to_string_lossy(), "seeded": seeded }),
            )
        }
        Err(e) => err(&req.id, "store_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "store.open" => Some(handle_store_open(state, req)),
        _ => None,
    }
}
