//! Session Store - loads and saves session JSON files
//!
//! A session file holds either one session object or an array of them.
//! Each element is parsed on its own so one bad record does not discard
//! the rest of the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::Session;
use crate::{Error, Result};

/// In-memory collection of loaded sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Vec<Session>,
}

impl SessionStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Add a session.
    pub fn add(&mut self, session: Session) {
        self.sessions.push(session);
    }

    /// All sessions in load order.
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Consume the store, returning its sessions.
    #[must_use]
    pub fn into_sessions(self) -> Vec<Session> {
        self.sessions
    }

    /// Parse one session file.
    ///
    /// Malformed elements are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not JSON, or if
    /// its top level is neither an object nor an array.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<Session>> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let elements = match value {
            serde_json::Value::Array(items) => items,
            object @ serde_json::Value::Object(_) => vec![object],
            other => {
                return Err(Error::MalformedSession(format!(
                    "{}: expected a session object or array, found {}",
                    path.display(),
                    json_kind(&other)
                )))
            }
        };

        let total = elements.len();
        let mut sessions = Vec::with_capacity(total);
        for (index, element) in elements.into_iter().enumerate() {
            match parse_session(element) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    warn!(file = %path.display(), index, error = %e, "skipping malformed session");
                }
            }
        }
        debug!(file = %path.display(), loaded = sessions.len(), total, "parsed session file");
        Ok(sessions)
    }

    /// Load every file and directory in `paths`.
    ///
    /// Directories contribute their `*.json` files in name order. Files
    /// that fail to load are skipped with a warning.
    #[must_use]
    pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut store = Self::new();
        for (_, sessions) in Self::load_each(paths) {
            store.sessions.extend(sessions);
        }
        store
    }

    /// Load every file in `paths`, keeping the sessions of each file
    /// together with its path.
    ///
    /// Files that fail to load are skipped with a warning.
    #[must_use]
    pub fn load_each<P: AsRef<Path>>(paths: &[P]) -> Vec<(PathBuf, Vec<Session>)> {
        let mut loaded = Vec::new();
        for file in expand_paths(paths) {
            match Self::load_file(&file) {
                Ok(sessions) => {
                    info!(file = %file.display(), sessions = sessions.len(), "loaded sessions");
                    loaded.push((file, sessions));
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "skipping unreadable session file");
                }
            }
        }
        loaded
    }

    /// Sessions grouped by model name.
    #[must_use]
    pub fn by_model(&self) -> BTreeMap<String, Vec<Session>> {
        let mut grouped: BTreeMap<String, Vec<Session>> = BTreeMap::new();
        for session in &self.sessions {
            grouped
                .entry(session.model().to_string())
                .or_default()
                .push(session.clone());
        }
        grouped
    }

    /// Write sessions to `path` as a pretty-printed JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save<P: AsRef<Path>>(path: P, sessions: &[Session]) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(sessions)?;
        fs::write(path, json)?;
        info!(file = %path.display(), sessions = sessions.len(), "saved sessions");
        Ok(())
    }
}

/// File name for a batch of sessions: `ouroboros_<model>_<YYYYmmdd_HHMMSS>.json`.
///
/// Path separators in the model name are replaced with `_`.
#[must_use]
pub fn session_file_name(model: &str, at: NaiveDateTime) -> String {
    let model = model.replace(['/', '\\'], "_");
    format!("ouroboros_{model}_{}.json", at.format("%Y%m%d_%H%M%S"))
}

fn parse_session(value: serde_json::Value) -> Result<Session> {
    let session: Session =
        serde_json::from_value(value).map_err(|e| Error::MalformedSession(e.to_string()))?;
    session.validate()?;
    Ok(session)
}

/// Expand `paths` into session files: directories contribute their
/// `*.json` files in name order, anything else is kept as given.
#[must_use]
pub fn expand_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = match fs::read_dir(path) {
                Ok(dir) => dir
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
                    .collect(),
                Err(e) => {
                    warn!(dir = %path.display(), error = %e, "cannot list directory");
                    continue;
                }
            };
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.to_path_buf());
        }
    }
    files
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_session_file_name() {
        let at = NaiveDate::from_ymd_opt(2025, 8, 11)
            .and_then(|d| d.and_hms_opt(18, 26, 31))
            .unwrap();
        assert_eq!(
            session_file_name("gpt-3.5-turbo", at),
            "ouroboros_gpt-3.5-turbo_20250811_182631.json"
        );
        assert_eq!(
            session_file_name("org/model", at),
            "ouroboros_org_model_20250811_182631.json"
        );
    }

    #[test]
    fn test_by_model_groups_sorted() {
        let mut store = SessionStore::new();
        store.add(Session::builder("zeta", "1").build());
        store.add(Session::builder("alpha", "1").build());
        store.add(Session::builder("zeta", "2").build());
        let grouped = store.by_model();
        let models: Vec<&String> = grouped.keys().collect();
        assert_eq!(models, vec!["alpha", "zeta"]);
        assert_eq!(grouped["zeta"].len(), 2);
    }
}
