//! Settings and notification persistence.
//!
//! Plain JSON files under the hub data directory, read-modify-write behind
//! a mutex. Writes go through a temp file and an atomic rename so a crash
//! mid-write never leaves a truncated file behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::HubError;

fn read_json(path: &Path) -> Option<Value> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring corrupt JSON state file {:?}: {}", path, e);
            None
        }
    }
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<(), HubError> {
    let parent = path
        .parent()
        .ok_or_else(|| HubError::Internal("state file has no parent directory".into()))?;
    fs::create_dir_all(parent).map_err(|e| HubError::Internal(e.to_string()))?;

    let mut tmp =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| HubError::Internal(e.to_string()))?;
    serde_json::to_writer_pretty(&mut tmp, value)
        .map_err(|e| HubError::Internal(e.to_string()))?;
    tmp.write_all(b"\n")
        .map_err(|e| HubError::Internal(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| HubError::Internal(e.to_string()))?;
    Ok(())
}

// ============================================================================
// Settings
// ============================================================================

/// Arbitrary key/value settings object owned by the calling agent.
pub struct SettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Value {
        let _guard = self.lock.lock().unwrap();
        read_json(&self.path).unwrap_or_else(|| json!({}))
    }

    /// Shallow-merge `patch` into the stored object and return the result.
    /// A non-object patch replaces the whole document.
    pub fn update(&self, patch: Value) -> Result<Value, HubError> {
        let _guard = self.lock.lock().unwrap();
        let mut current = read_json(&self.path).unwrap_or_else(|| json!({}));

        match (current.as_object_mut(), patch) {
            (Some(object), Value::Object(fields)) => {
                for (key, value) in fields {
                    object.insert(key, value);
                }
            }
            (_, other) => current = other,
        }

        write_json_atomic(&self.path, &current)?;
        Ok(current)
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub level: String,
    pub message: String,
    pub created_at: String,
}

pub struct NotificationStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl NotificationStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn list(&self) -> Vec<Notification> {
        let _guard = self.lock.lock().unwrap();
        self.load()
    }

    pub fn add(&self, level: &str, message: &str) -> Result<Notification, HubError> {
        let _guard = self.lock.lock().unwrap();
        let mut all = self.load();
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            level: level.to_string(),
            message: message.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        all.push(notification.clone());
        write_json_atomic(&self.path, &serde_json::to_value(&all)?)?;
        Ok(notification)
    }

    fn load(&self) -> Vec<Notification> {
        read_json(&self.path)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default_is_empty_object() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.get(), json!({}));
    }

    #[test]
    fn test_settings_merge_and_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone());
        store.update(json!({"theme": "dark"})).unwrap();
        store.update(json!({"limit": 5})).unwrap();

        // Re-open to prove it round-trips through disk.
        let reopened = SettingsStore::new(path);
        assert_eq!(reopened.get(), json!({"theme": "dark", "limit": 5}));
    }

    #[test]
    fn test_settings_merge_overwrites_key() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        store.update(json!({"theme": "dark"})).unwrap();
        let updated = store.update(json!({"theme": "light"})).unwrap();
        assert_eq!(updated, json!({"theme": "light"}));
    }

    #[test]
    fn test_corrupt_settings_file_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path);
        assert_eq!(store.get(), json!({}));
    }

    #[test]
    fn test_notifications_append_and_list() {
        let dir = TempDir::new().unwrap();
        let store = NotificationStore::new(dir.path().join("notifications.json"));

        store.add("info", "first").unwrap();
        store.add("warn", "second").unwrap();

        let all = store.list();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "first");
        assert_eq!(all[1].level, "warn");
        assert_ne!(all[0].id, all[1].id);
    }
}
