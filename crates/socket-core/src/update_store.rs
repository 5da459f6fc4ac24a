//! Update-check records: one JSON file per user mapping package name to the
//! last fetched version and notification timestamps. Reads are lock-free;
//! writes take the sibling .lock directory and go temp-then-rename.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::http_client::HttpClient;
use crate::lock;
use crate::log;
use crate::paths;
use crate::registry;

/// Re-fetch the latest version from the registry at most once per day.
const FETCH_TTL_MS: i64 = 24 * 60 * 60 * 1000;
/// Nag about an available update at most once per day.
const NOTIFY_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord {
    pub version: String,
    pub timestamp_fetch: i64,
    pub timestamp_notification: i64,
}

pub struct UpdateStore {
    path: PathBuf,
}

impl UpdateStore {
    pub fn open() -> Self {
        let store = UpdateStore {
            path: paths::update_store_path(),
        };
        store.migrate_legacy(&paths::legacy_update_store_path());
        store
    }

    pub fn at(path: PathBuf) -> Self {
        UpdateStore { path }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// One-time migration from the pre-1.0 location: copy when the new path
    /// has no data, then drop the old file.
    pub fn migrate_legacy(&self, legacy: &Path) {
        if !legacy.is_file() || self.path.exists() {
            return;
        }
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match fs::copy(legacy, &self.path) {
            Ok(_) => {
                let _ = fs::remove_file(legacy);
                log::debug(&format!(
                    "migrated update store {} -> {}",
                    legacy.display(),
                    self.path.display()
                ));
            }
            Err(e) => log::warn(&format!("update store migration failed: {}", e)),
        }
    }

    /// Best-effort read: missing or corrupt file is an empty store.
    pub fn read(&self) -> HashMap<String, UpdateRecord> {
        let Ok(s) = fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        serde_json::from_str(&s).unwrap_or_default()
    }

    /// Write the whole map under the process lock.
    pub fn write(&self, records: &HashMap<String, UpdateRecord>) -> Result<(), String> {
        let _lock = lock::acquire(&self.lock_path())?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let tmp = self.path.with_extension("tmp");
        let s = serde_json::to_string_pretty(records).map_err(|e| e.to_string())?;
        fs::write(&tmp, s).map_err(|e| e.to_string())?;
        fs::rename(&tmp, &self.path).map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Check whether a newer release exists and whether the user is due a
/// notification. Returns the newer version string when both hold.
/// Network and store failures only ever suppress the notice.
pub fn check_for_update(
    store: &UpdateStore,
    http: &HttpClient,
    package: &str,
    current_version: &str,
) -> Option<String> {
    let now = chrono::Utc::now().timestamp_millis();
    let mut records = store.read();
    let mut record = records.get(package).cloned().unwrap_or_default();

    if record.version.is_empty() || now - record.timestamp_fetch > FETCH_TTL_MS {
        match registry::latest_version(http, package) {
            Ok(latest) => {
                record.version = latest;
                record.timestamp_fetch = now;
            }
            Err(e) => {
                log::debug(&format!("update check fetch failed: {}", e));
                return None;
            }
        }
    }

    let newer = match (
        Version::parse(current_version),
        Version::parse(&record.version),
    ) {
        (Ok(current), Ok(latest)) => latest > current,
        _ => false,
    };

    let due = now - record.timestamp_notification > NOTIFY_INTERVAL_MS;
    let announce = if newer && due {
        record.timestamp_notification = now;
        Some(record.version.clone())
    } else {
        None
    };

    records.insert(package.to_string(), record);
    if let Err(e) = store.write(&records) {
        log::debug(&format!("update store write failed: {}", e));
    }
    announce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_missing_store_is_empty() {
        let td = tempfile::tempdir().expect("tmp");
        let store = UpdateStore::at(td.path().join("_socket"));
        assert!(store.read().is_empty());
    }

    #[test]
    fn write_then_read_roundtrip() {
        let td = tempfile::tempdir().expect("tmp");
        let store = UpdateStore::at(td.path().join("_socket"));
        let mut records = HashMap::new();
        records.insert(
            "socket".to_string(),
            UpdateRecord {
                version: "1.2.3".to_string(),
                timestamp_fetch: 1000,
                timestamp_notification: 0,
            },
        );
        store.write(&records).expect("write");

        let back = store.read();
        assert_eq!(back["socket"].version, "1.2.3");
        assert_eq!(back["socket"].timestamp_fetch, 1000);
        // Lock directory is released after the write.
        assert!(!store.lock_path().exists());
    }

    #[test]
    fn store_json_uses_camel_case_keys() {
        let td = tempfile::tempdir().expect("tmp");
        let store = UpdateStore::at(td.path().join("_socket"));
        let mut records = HashMap::new();
        records.insert("socket".to_string(), UpdateRecord::default());
        store.write(&records).expect("write");
        let raw = fs::read_to_string(td.path().join("_socket")).unwrap();
        assert!(raw.contains("timestampFetch"));
        assert!(raw.contains("timestampNotification"));
    }

    #[test]
    fn migrates_legacy_path_once() {
        let td = tempfile::tempdir().expect("tmp");
        let legacy = td.path().join(".socket-update");
        let new_path = td.path().join(".socket").join("_socket");
        fs::write(&legacy, r#"{"socket":{"version":"0.9.0","timestampFetch":1,"timestampNotification":0}}"#)
            .unwrap();

        let store = UpdateStore::at(new_path.clone());
        store.migrate_legacy(&legacy);
        assert!(!legacy.exists());
        assert_eq!(store.read()["socket"].version, "0.9.0");

        // A second migration with a resurrected legacy file is a no-op.
        fs::write(&legacy, r#"{"socket":{"version":"0.1.0","timestampFetch":2,"timestampNotification":0}}"#)
            .unwrap();
        store.migrate_legacy(&legacy);
        assert_eq!(store.read()["socket"].version, "0.9.0");
    }

    #[test]
    fn corrupt_store_reads_empty() {
        let td = tempfile::tempdir().expect("tmp");
        let path = td.path().join("_socket");
        fs::write(&path, "not json").unwrap();
        assert!(UpdateStore::at(path).read().is_empty());
    }
}
