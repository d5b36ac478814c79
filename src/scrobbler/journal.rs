// Journal of scrobbles that have not been accepted yet
// One JSON document per service, rewritten wholesale on every save

use super::traits::Track;
use crate::error::Result;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered list of tracks awaiting submission, oldest first
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the pending entries.
    ///
    /// A missing or unreadable journal counts as empty.
    pub fn load(&self) -> Vec<Track> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("Failed to read journal {:?}, treating it as empty: {}", self.path, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Failed to parse journal {:?}, treating it as empty: {}", self.path, e);
                Vec::new()
            }
        }
    }

    /// Replace the journal with `entries`.
    ///
    /// Written to a sibling temp file first and renamed over the journal.
    pub fn save(&self, entries: &[Track]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;

        log::debug!("Saved {} journal entries to {:?}", entries.len(), self.path);
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("journal"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrobbler::testing::track;

    #[test]
    fn missing_journal_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("lastfm.json"));
        assert!(journal.load().is_empty());
    }

    #[test]
    fn garbage_journal_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lastfm.json");
        fs::write(&path, "--- !ruby/object:Song\nid: 3\n").unwrap();
        assert!(Journal::new(path).load().is_empty());
    }

    #[test]
    fn saved_entries_come_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("nested").join("lastfm.json"));
        let entries = vec![track(1, Some(200), 600), track(2, None, 300)];

        journal.save(&entries).unwrap();
        assert_eq!(journal.load(), entries);
        assert!(!dir.path().join("nested").join("lastfm.json.tmp").exists());
    }

    #[test]
    fn save_replaces_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("lastfm.json"));

        journal.save(&[track(1, Some(200), 600), track(2, Some(200), 300)]).unwrap();
        journal.save(&[]).unwrap();
        assert!(journal.load().is_empty());
    }
}
