//! JSON-file persistence for user settings.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use log::warn;
use picturebook_core::Settings;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store rooted at `dir`, which is created if missing.
    pub fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("create config dir {}", dir.display()))?;
        Ok(Self {
            path: dir.join(SETTINGS_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file yields defaults; an unreadable one is logged and replaced by defaults.
    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("read {}", self.path.display()));
            }
        };

        let mut settings = match serde_json::from_str::<Settings>(&raw) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("ignoring corrupt {}: {err}", self.path.display());
                Settings::default()
            }
        };
        settings.normalize();
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut settings = settings.clone();
        settings.normalize();
        let json = serde_json::to_string_pretty(&settings)?;

        // Write then rename so a crash never leaves half a file behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> anyhow::Result<(SettingsStore, PathBuf)> {
        let dir = std::env::temp_dir().join(format!(
            "picturebook-storage-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        Ok((SettingsStore::open(&dir)?, dir))
    }

    #[test]
    fn missing_file_yields_defaults() -> anyhow::Result<()> {
        let (store, dir) = temp_store("missing")?;
        assert_eq!(store.load_settings()?, Settings::default());
        let _ = fs::remove_dir_all(dir);
        Ok(())
    }

    #[test]
    fn settings_roundtrip() -> anyhow::Result<()> {
        let (store, dir) = temp_store("roundtrip")?;
        let mut settings = Settings::default();
        settings.narration.volume = 0.4;
        settings.narration.preferred_voices = vec!["Daniel".to_string()];
        settings.gestures.swipe_min_px = 32.0;
        settings.counting.interval_ms = 700;
        store.save_settings(&settings)?;

        let loaded = store.load_settings()?;
        assert_eq!(loaded.narration.volume, 0.4);
        assert_eq!(loaded.narration.preferred_voices, vec!["daniel".to_string()]);
        assert_eq!(loaded.gestures.swipe_min_px, 32.0);
        assert_eq!(loaded.counting.interval_ms, 700);
        let _ = fs::remove_dir_all(dir);
        Ok(())
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() -> anyhow::Result<()> {
        let (store, dir) = temp_store("corrupt")?;
        fs::write(store.path(), "{ not json")?;
        assert_eq!(store.load_settings()?, Settings::default());
        let _ = fs::remove_dir_all(dir);
        Ok(())
    }

    #[test]
    fn loaded_values_are_normalized() -> anyhow::Result<()> {
        let (store, dir) = temp_store("normalize")?;
        fs::write(
            store.path(),
            r#"{"narration":{"volume":9.0},"gestures":{"right_edge":0.1}}"#,
        )?;
        let loaded = store.load_settings()?;
        assert_eq!(loaded.narration.volume, 1.0);
        assert_eq!(loaded.gestures.right_edge, 0.5);
        let _ = fs::remove_dir_all(dir);
        Ok(())
    }
}
