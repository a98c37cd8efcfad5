use crate::backup;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::StudentCollection;
use crate::repo::{self, GradeError, StudentRepo};
use crate::store::DocumentStore;
use serde_json::json;
use std::path::PathBuf;

fn handle_backup_export_data(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_store", "open a data store first", None);
    };
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing outPath", None),
    };

    let document = match store.get(repo::DATA_KEY) {
        Ok(Some(text)) => text,
        Ok(None) => match serde_json::to_string_pretty(&StudentCollection::default()) {
            Ok(text) => text,
            Err(e) => return err(&req.id, "backup_failed", e.to_string(), None),
        },
        Err(e) => {
            return fail(
                &req.id,
                &GradeError::StorageUnavailable {
                    reason: e.to_string(),
                },
            )
        }
    };

    let out = PathBuf::from(&out_path);
    let export = match backup::export_data_bundle(&document, &out) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "backup_failed",
                e.to_string(),
                Some(json!({ "path": out_path })),
            )
        }
    };

    log::info!("exported grade data bundle to {}", out_path);
    ok(
        &req.id,
        json!({
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "sha256": export.sha256
        }),
    )
}

fn handle_backup_import_data(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_store", "open a data store first", None);
    };
    let in_path = match req.params.get("inPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing inPath", None),
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "backup_failed",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    let import = match backup::import_data_bundle(&src) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "backup_failed",
                e.to_string(),
                Some(json!({ "path": in_path })),
            )
        }
    };

    let repo = StudentRepo::new(store, &state.catalog);
    match repo.replace_document(&import.document) {
        Ok(students) => {
            log::info!(
                "imported grade data bundle from {} ({} students)",
                in_path,
                students
            );
            ok(
                &req.id,
                json!({
                    "imported": true,
                    "students": students,
                    "bundleFormatDetected": import.bundle_format_detected
                }),
            )
        }
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportData" => Some(handle_backup_export_data(state, req)),
        "backup.importData" => Some(handle_backup_import_data(state, req)),
        _ => None,
    }
}
