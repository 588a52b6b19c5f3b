use crate::error::{RelayError, Result};
use crate::relay::Fingerprint;
use crate::sites::Destination;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Where the floating action dock sits on the page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DockPosition {
    pub left: f64,
    pub top: f64,
}

fn default_true() -> bool {
    true
}

/// Preferences and relay history kept between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub engine: Destination,
    #[serde(default)]
    pub dock_position: Option<DockPosition>,
    #[serde(default = "default_true")]
    pub buttons_visible: bool,
    /// Fingerprints already relayed, oldest first
    #[serde(default)]
    pub processed: Vec<Fingerprint>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self { engine: Destination::default(), dock_position: None, buttons_visible: true, processed: Vec::new() }
    }
}

/// JSON-file backed [`PersistedState`], shared between the relay and the message handlers
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl StateStore {
    /// `<config dir>/prompt-relay/state.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("prompt-relay").join("state.json"))
    }

    /// Open the store; a missing or unreadable file starts from defaults
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                PersistedState::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PersistedState::default(),
            Err(e) => return Err(RelayError::StateStore(format!("{}: {}", path.display(), e))),
        };
        Ok(Self { path, state: Mutex::new(state) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, PersistedState>> {
        self.state
            .lock()
            .map_err(|_| RelayError::StateStore("state lock poisoned".to_string()))
    }

    pub fn get(&self) -> Result<PersistedState> {
        Ok(self.lock()?.clone())
    }

    /// Apply a change and write the result to disk
    pub fn update<F>(&self, change: F) -> Result<PersistedState>
    where
        F: FnOnce(&mut PersistedState),
    {
        let mut state = self.lock()?;
        change(&mut state);
        self.save(&state)?;
        Ok(state.clone())
    }

    // Write to a sibling temp file, then rename over the target
    fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, serde_json::to_vec_pretty(state)?)?;
        std::fs::rename(&staging, &self.path)?;
        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json")).unwrap();
        let state = store.get().unwrap();
        assert!(state.buttons_visible);
        assert_eq!(state.engine, Destination::Claude);
    }

    #[test]
    fn test_update_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = StateStore::open(&path).unwrap();
        store
            .update(|s| {
                s.engine = Destination::Gemini;
                s.buttons_visible = false;
                s.processed.push(Fingerprint::of("hello"));
            })
            .unwrap();

        let reopened = StateStore::open(&path).unwrap().get().unwrap();
        assert_eq!(reopened.engine, Destination::Gemini);
        assert!(!reopened.buttons_visible);
        assert_eq!(reopened.processed, vec![Fingerprint::of("hello")]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let state = StateStore::open(&path).unwrap().get().unwrap();
        assert_eq!(state, PersistedState::default());
    }

    #[test]
    fn test_old_files_without_visibility_default_to_visible() {
        let state: PersistedState = serde_json::from_str(r#"{ "engine": "gemini" }"#).unwrap();
        assert!(state.buttons_visible);
        assert_eq!(state.engine, Destination::Gemini);
    }
}
