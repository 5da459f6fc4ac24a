//! Local config store: a base64-encoded JSON object at an OS-specific path.
//! Overrides via flag or env make the store read-only for the process.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde_json::{Map, Value};

use crate::log;
use crate::paths;

/// Keys the CLI knows how to read and write. `config set` rejects others.
pub const KNOWN_KEYS: &[&str] = &[
    "apiBaseUrl",
    "apiToken",
    "apiProxy",
    "defaultOrg",
    "enforcedOrgs",
    "skipAskToPersistDefaultOrg",
];

pub fn is_known_key(key: &str) -> bool {
    KNOWN_KEYS.contains(&key)
}

/// File-backed key-value store, lazily hydrated on first access.
/// Mutations mark the store dirty; `flush` writes the file once, so many
/// writes in one invocation produce a single disk write.
pub struct ConfigStore {
    path: PathBuf,
    values: Option<Map<String, Value>>,
    read_only: bool,
    dirty: bool,
    warned_read_only: bool,
}

fn decode_blob(blob: &str) -> Result<Map<String, Value>, String> {
    let trimmed = blob.trim();
    // Raw JSON is accepted for overrides; the on-disk format is base64.
    let json_text = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(trimmed.as_bytes())
            .map_err(|e| format!("invalid base64: {}", e))?;
        String::from_utf8(bytes).map_err(|e| format!("invalid utf-8: {}", e))?
    };
    let v: Value = serde_json::from_str(&json_text).map_err(|e| format!("invalid JSON: {}", e))?;
    match v {
        Value::Object(map) => Ok(map),
        _ => Err("config must be a JSON object".to_string()),
    }
}

fn encode_blob(values: &Map<String, Value>) -> String {
    let json_text = Value::Object(values.clone()).to_string();
    base64::engine::general_purpose::STANDARD.encode(json_text.as_bytes())
}

/// Write via temp file then rename so readers never observe a partial blob.
fn write_atomic(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("create {}: {}", parent.display(), e))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).map_err(|e| format!("write {}: {}", tmp.display(), e))?;
    fs::rename(&tmp, path).map_err(|e| format!("rename {}: {}", path.display(), e))?;
    Ok(())
}

impl ConfigStore {
    /// Store backed by the default settings path.
    pub fn open() -> Self {
        Self::at(paths::settings_path())
    }

    pub fn at(path: PathBuf) -> Self {
        ConfigStore {
            path,
            values: None,
            read_only: false,
            dirty: false,
            warned_read_only: false,
        }
    }

    /// Store seeded from an override blob (flag or env). Read-only: writes are
    /// kept in memory for this process and never persisted.
    pub fn with_override(path: PathBuf, blob: &str) -> Result<Self, String> {
        let values = decode_blob(blob).map_err(|e| format!("invalid config override: {}", e))?;
        Ok(ConfigStore {
            path,
            values: Some(values),
            read_only: true,
            dirty: false,
            warned_read_only: false,
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn hydrate(&mut self) -> &mut Map<String, Value> {
        if self.values.is_none() {
            let values = match fs::read_to_string(&self.path) {
                Ok(s) if !s.trim().is_empty() => match decode_blob(&s) {
                    Ok(map) => map,
                    Err(e) => {
                        log::warn(&format!(
                            "config file {} is unreadable ({}); starting from empty config",
                            self.path.display(),
                            e
                        ));
                        Map::new()
                    }
                },
                _ => Map::new(),
            };
            self.values = Some(values);
        }
        self.values.as_mut().unwrap()
    }

    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.hydrate().get(key).cloned()
    }

    pub fn get_string(&mut self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) => Some(s),
            Some(v) => Some(v.to_string()),
            None => None,
        }
    }

    pub fn set(&mut self, key: &str, value: Value) -> Result<(), String> {
        if !is_known_key(key) {
            return Err(format!("unknown config key: {}", key));
        }
        self.warn_if_read_only();
        self.hydrate().insert(key.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<(), String> {
        if !is_known_key(key) {
            return Err(format!("unknown config key: {}", key));
        }
        self.warn_if_read_only();
        self.hydrate().remove(key);
        self.dirty = true;
        Ok(())
    }

    /// All known keys with their current values (None when unset).
    pub fn list(&mut self) -> Vec<(String, Option<Value>)> {
        let values = self.hydrate().clone();
        KNOWN_KEYS
            .iter()
            .map(|k| (k.to_string(), values.get(*k).cloned()))
            .collect()
    }

    fn warn_if_read_only(&mut self) {
        if self.read_only && !self.warned_read_only {
            log::warn("config is in read-only mode (override active); changes apply to this process only");
            self.warned_read_only = true;
        }
    }

    /// Persist pending changes in one write. No-op when clean or read-only.
    pub fn flush(&mut self) -> Result<(), String> {
        if !self.dirty || self.read_only {
            return Ok(());
        }
        let blob = encode_blob(self.values.as_ref().unwrap());
        write_atomic(&self.path, &blob)?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for ConfigStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn(&format!("could not persist config: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_unset_roundtrip() {
        let td = tempfile::tempdir().expect("tmp");
        let path = td.path().join("settings");
        let mut store = ConfigStore::at(path.clone());
        store.set("apiProxy", json!("https://example.com")).unwrap();
        assert_eq!(store.get("apiProxy"), Some(json!("https://example.com")));
        store.flush().unwrap();

        let mut reopened = ConfigStore::at(path.clone());
        assert_eq!(reopened.get("apiProxy"), Some(json!("https://example.com")));
        reopened.unset("apiProxy").unwrap();
        assert_eq!(reopened.get("apiProxy"), None);
    }

    #[test]
    fn unknown_key_rejected() {
        let td = tempfile::tempdir().expect("tmp");
        let mut store = ConfigStore::at(td.path().join("settings"));
        assert!(store.set("notAKey", json!("x")).is_err());
        assert!(store.unset("notAKey").is_err());
    }

    #[test]
    fn on_disk_blob_is_base64_json() {
        let td = tempfile::tempdir().expect("tmp");
        let path = td.path().join("settings");
        let mut store = ConfigStore::at(path.clone());
        store.set("defaultOrg", json!("my-org")).unwrap();
        store.flush().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(raw.trim().as_bytes())
            .expect("base64");
        let v: Value = serde_json::from_slice(&decoded).expect("json");
        assert_eq!(v["defaultOrg"], json!("my-org"));
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let td = tempfile::tempdir().expect("tmp");
        let path = td.path().join("settings");
        fs::write(&path, "%%% not base64 %%%").unwrap();
        let mut store = ConfigStore::at(path);
        assert_eq!(store.get("apiToken"), None);
        // Still usable after the warning.
        store.set("apiToken", json!("tok")).unwrap();
        assert_eq!(store.get("apiToken"), Some(json!("tok")));
    }

    #[test]
    fn read_only_override_never_touches_disk() {
        let td = tempfile::tempdir().expect("tmp");
        let path = td.path().join("settings");
        fs::write(&path, encode_blob(&Map::new())).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let blob = json!({"apiToken": "from-override"}).to_string();
        let mut store = ConfigStore::with_override(path.clone(), &blob).unwrap();
        assert!(store.is_read_only());
        assert_eq!(store.get("apiToken"), Some(json!("from-override")));

        store.set("apiToken", json!("changed")).unwrap();
        assert_eq!(store.get("apiToken"), Some(json!("changed")));
        store.flush().unwrap();
        drop(store);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn override_accepts_base64_and_raw_json() {
        let td = tempfile::tempdir().expect("tmp");
        let json_text = json!({"defaultOrg": "org-a"}).to_string();
        let b64 = base64::engine::general_purpose::STANDARD.encode(json_text.as_bytes());

        let mut raw = ConfigStore::with_override(td.path().join("a"), &json_text).unwrap();
        assert_eq!(raw.get("defaultOrg"), Some(json!("org-a")));
        let mut enc = ConfigStore::with_override(td.path().join("b"), &b64).unwrap();
        assert_eq!(enc.get("defaultOrg"), Some(json!("org-a")));
    }
}
