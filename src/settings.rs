use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::PathBuf, sync::RwLock};

use crate::booking::OverlapPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSettings {
    overlap_policy: OverlapPolicy,
}

/// JSON-file-backed settings, shared with whatever shell drives the
/// crate. A missing or unparseable file falls back to defaults rather
/// than failing startup; an unreadable one is a real error.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<StoredSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => StoredSettings::default(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("settings file unreadable at {}", path.display()))
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.data.read().unwrap().overlap_policy
    }

    pub fn update_overlap_policy(&self, policy: OverlapPolicy) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.overlap_policy = policy;
        self.save(&guard)
    }

    fn save(&self, data: &StoredSettings) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, json)
            .with_context(|| format!("could not write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::OverlapPolicy;

    fn temp_settings_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "cabstand-settings-{}-{}.json",
            tag,
            std::process::id()
        ))
    }

    #[test]
    fn missing_file_uses_defaults() {
        let path = temp_settings_path("missing");
        let _ = fs::remove_file(&path);

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.overlap_policy(), OverlapPolicy::FailOpen);
    }

    #[test]
    fn update_persists_across_reopen() {
        let path = temp_settings_path("persist");
        let _ = fs::remove_file(&path);

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_overlap_policy(OverlapPolicy::FailClosed)
            .unwrap();
        drop(store);

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.overlap_policy(), OverlapPolicy::FailClosed);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let path = temp_settings_path("garbage");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.overlap_policy(), OverlapPolicy::FailOpen);

        let _ = fs::remove_file(&path);
    }
}
