//! Persisted widget state: the session id, active context, chosen language,
//! and cached transcript survive restarts in one JSON file (e.g.
//! `~/.charla/state.json`).
//!
//! A missing or malformed file reads as empty state; writers create parent
//! directories as needed. Concurrent widget instances sharing the file race
//! with last-write-wins, which is acceptable for this data.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::lang::Language;
use crate::session::Message;

/// Snapshot of everything the widget persists between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_history: Option<Vec<Message>>,
}

/// File-backed store for [`StoredState`] with read-modify-write helpers.
#[derive(Debug, Clone)]
pub struct WidgetStore {
    path: PathBuf,
}

impl WidgetStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the persisted state. Missing or unparseable file => empty state.
    pub fn load(&self) -> StoredState {
        let s = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(_) => return StoredState::default(),
        };
        match serde_json::from_str(&s) {
            Ok(state) => state,
            Err(e) => {
                log::warn!(
                    "discarding malformed widget state at {}: {}",
                    self.path.display(),
                    e
                );
                StoredState::default()
            }
        }
    }

    /// Save the full state. Creates parent dirs if needed.
    pub fn save(&self, state: &StoredState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let s = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, s)?;
        Ok(())
    }

    /// Apply a mutation to the persisted state and write it back.
    pub fn update(&self, f: impl FnOnce(&mut StoredState)) -> Result<()> {
        let mut state = self.load();
        f(&mut state);
        self.save(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> WidgetStore {
        let dir = std::env::temp_dir().join(format!("charla-store-test-{}", uuid::Uuid::new_v4()));
        WidgetStore::new(dir.join("state.json"))
    }

    #[test]
    fn missing_file_reads_empty() {
        let store = temp_store();
        let state = store.load();
        assert!(state.session_id.is_none());
        assert!(state.chat_history.is_none());
    }

    #[test]
    fn malformed_file_reads_empty() {
        let store = temp_store();
        std::fs::create_dir_all(store.path.parent().unwrap()).unwrap();
        std::fs::write(&store.path, "{not json").unwrap();
        let state = store.load();
        assert!(state.session_id.is_none());
    }

    #[test]
    fn history_round_trips() {
        let store = temp_store();
        let history = vec![
            Message::user("hola"),
            Message::assistant("Hola, ¿en qué puedo ayudarte?"),
            Message::assistant("mira esto").with_url("https://example.com/p/1"),
        ];
        store
            .update(|s| {
                s.session_id = Some("abc".to_string());
                s.chat_history = Some(history.clone());
            })
            .unwrap();

        let state = store.load();
        assert_eq!(state.session_id.as_deref(), Some("abc"));
        let loaded = state.chat_history.unwrap();
        assert_eq!(loaded.len(), 3);
        for (a, b) in loaded.iter().zip(history.iter()) {
            assert_eq!(a.role, b.role);
            assert_eq!(a.content, b.content);
            assert_eq!(a.url, b.url);
        }
    }

    #[test]
    fn update_preserves_unrelated_keys() {
        let store = temp_store();
        store
            .update(|s| s.user_language = Some(Language::En))
            .unwrap();
        store
            .update(|s| s.session_id = Some("xyz".to_string()))
            .unwrap();
        let state = store.load();
        assert_eq!(state.user_language, Some(Language::En));
        assert_eq!(state.session_id.as_deref(), Some("xyz"));
    }
}
