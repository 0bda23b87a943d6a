use std::path::PathBuf;

use serde::Deserialize;

use crate::events::EventLog;
use crate::store::Store;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Store>,
    pub log: Option<EventLog>,
}
