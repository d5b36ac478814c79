// Playback settings carried from one hook invocation to the next

use crate::error::Result;
use crate::scrobbler::Track;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Pause flag and the track being tracked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    pub pause: bool,
    pub song: Track,
}

/// Location of the settings file
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the settings saved by the previous run, or fresh ones
    pub fn load(&self) -> PlaybackSettings {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to read settings {:?}, starting fresh: {}", self.path, e);
                }
                return PlaybackSettings::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Failed to parse settings {:?}, starting fresh: {}", self.path, e);
            PlaybackSettings::default()
        })
    }

    /// Overwrite the settings file
    pub fn save(&self, settings: &PlaybackSettings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Remove leftovers of a previous player lifetime
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Removed stale settings {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrobbler::testing::track;

    #[test]
    fn missing_settings_start_with_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsStore::new(dir.path().join("settings.json")).load();
        assert!(!settings.pause);
        assert!(settings.song.is_none());
    }

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("state").join("settings.json"));
        let settings = PlaybackSettings { pause: true, song: track(5, Some(180), 60) };

        store.save(&settings).unwrap();
        assert_eq!(store.load(), settings);
    }

    #[test]
    fn corrupt_settings_start_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ \"pause\": tru").unwrap();
        assert_eq!(SettingsStore::new(path).load().song.id, -1);
    }

    #[test]
    fn clear_removes_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(&path);

        store.save(&PlaybackSettings::default()).unwrap();
        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();
    }
}
