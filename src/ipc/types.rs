use std::path::PathBuf;

use serde::Deserialize;

use crate::catalog::Catalog;
use crate::store::SqliteStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub data_dir: Option<PathBuf>,
    pub store: Option<SqliteStore>,
    pub catalog: Catalog,
}
