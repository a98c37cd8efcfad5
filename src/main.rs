mod backup;
mod calc;
mod catalog;
mod ipc;
mod model;
mod repo;
mod store;

use flexi_logger::Logger;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

// Protocol lives on stdout; logs go to stderr only.
fn init_logging() -> Option<flexi_logger::LoggerHandle> {
    let spec = std::env::var("GRADEBOOKD_LOG").unwrap_or_else(|_| "info".to_string());
    match Logger::try_with_str(&spec).and_then(|logger| logger.log_to_stderr().start()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("logger init failed ({}), continuing without logs", e);
            None
        }
    }
}

fn open_initial_store(state: &mut ipc::AppState) {
    let Ok(dir) = std::env::var("GRADEBOOKD_DATA_DIR") else {
        return;
    };
    let path = PathBuf::from(dir);

    match store::SqliteStore::open(&path) {
        Ok(store) => {
            let init = repo::StudentRepo::new(&store, &state.catalog).ensure_initialized();
            match init {
                Ok(seeded) => {
                    if seeded {
                        log::info!("seeded empty grade document in {}", path.to_string_lossy());
                    }
                    log::info!("data store ready at {}", path.to_string_lossy());
                    state.data_dir = Some(path);
                    state.store = Some(store);
                }
                Err(e) => log::warn!("data store init failed: {}", e),
            }
        }
        Err(e) => log::warn!(
            "failed to open data store at {}: {}",
            path.to_string_lossy(),
            e
        ),
    }
}

fn main() {
    let _logger = init_logging();

    let mut state = ipc::AppState {
        data_dir: None,
        store: None,
        catalog: catalog::Catalog::builtin(),
    };
    open_initial_store(&mut state);
    log::info!("gradebookd {} ready", env!("CARGO_PKG_VERSION"));

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("dropping unparseable request line: {}", e);
                // Can't reply with a request id here; send an id-less error.
                let _ = writeln!(
                    stdout,
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
