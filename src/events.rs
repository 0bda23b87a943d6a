//! System event log: a newest-first list of `{timestamp, type, message,
//! level}` entries with conjunctive filters, summary stats and a dated JSON
//! export. Mirrored best effort to `system_logs.json` in the workspace.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

pub const LOG_FILE: &str = "system_logs.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub level: String,
}

/// Case-insensitive equality on type/level, prefix match on the date,
/// AND-composed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogFilter {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub date: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogStats {
    pub total: usize,
    pub today: usize,
    pub errors: usize,
    pub warnings: usize,
}

pub struct EventLog {
    entries: Vec<LogEntry>,
    mirror: Option<PathBuf>,
}

impl EventLog {
    #[allow(dead_code)]
    pub fn in_memory() -> Self {
        EventLog {
            entries: Vec::new(),
            mirror: None,
        }
    }

    /// Workspace-backed log: reload the mirror when present and parseable.
    pub fn open(workspace: &Path) -> Self {
        let path = workspace.join(LOG_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("log mirror {} unreadable ({e}); starting empty", path.display());
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        EventLog {
            entries,
            mirror: Some(path),
        }
    }

    pub fn append(&mut self, kind: &str, message: &str, level: &str) -> LogEntry {
        let entry = LogEntry {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: kind.to_uppercase(),
            message: message.to_string(),
            level: level.to_uppercase(),
        };
        // Newest entries sit at the front.
        self.entries.insert(0, entry.clone());
        self.flush_mirror();
        entry
    }

    pub fn query(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| {
                filter
                    .kind
                    .as_deref()
                    .map_or(true, |k| e.kind.eq_ignore_ascii_case(k))
                    && filter
                        .level
                        .as_deref()
                        .map_or(true, |l| e.level.eq_ignore_ascii_case(l))
                    && filter
                        .date
                        .as_deref()
                        .map_or(true, |d| e.timestamp.starts_with(d))
            })
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> LogStats {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        LogStats {
            total: self.entries.len(),
            today: self
                .entries
                .iter()
                .filter(|e| e.timestamp.starts_with(&today))
                .count(),
            errors: self
                .entries
                .iter()
                .filter(|e| e.level == "ERROR" || e.level == "CRITICAL")
                .count(),
            warnings: self.entries.iter().filter(|e| e.level == "WARNING").count(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        if let Some(path) = &self.mirror {
            let _ = std::fs::remove_file(path);
        }
    }

    /// JSON export of the filtered view, wrapped with export metadata.
    pub fn export(&self, filter: &LogFilter) -> String {
        let logs = self.query(filter);
        let payload = json!({
            "exportDate": Utc::now().to_rfc3339(),
            "totalLogs": logs.len(),
            "logs": logs,
        });
        serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
    }

    fn flush_mirror(&self) {
        let Some(path) = &self.mirror else {
            return;
        };
        let text = match serde_json::to_string_pretty(&self.entries) {
            Ok(t) => t,
            Err(e) => {
                warn!("log serialize failed: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(path, text) {
            warn!("log mirror write to {} failed: {e}", path.display());
        }
    }
}
