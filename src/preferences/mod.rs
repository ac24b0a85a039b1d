//! Remembered player name and difficulty preset.
//!
//! Storage failures never reach the caller: they are logged and the in-memory value wins.

mod storage;

pub use self::storage::{FileStore, KeyValueStore, MemoryStore};

use tracing::warn;

use crate::error::StorageResult;

/// Storage key of the last player name.
pub const LAST_USERNAME_KEY: &str = "memory-game.lastUsername";
/// Storage key of the last selected preset id.
pub const SELECTED_PRESET_KEY: &str = "memory-game.selectedPresetId";

/// Player preferences persisted through a [`KeyValueStore`].
pub struct Preferences {
    store: Box<dyn KeyValueStore>,
    last_username: String,
    selected_preset_id: Option<String>,
}

impl Preferences {
    /// Read the stored values; unreadable values count as unset.
    pub fn load(store: impl KeyValueStore + 'static) -> Self {
        let last_username = read(&store, LAST_USERNAME_KEY).unwrap_or_default();
        let selected_preset_id = read(&store, SELECTED_PRESET_KEY);
        Self {
            store: Box::new(store),
            last_username,
            selected_preset_id,
        }
    }

    /// Last player name, empty when none was stored.
    pub fn last_username(&self) -> &str {
        &self.last_username
    }

    /// Identifier of the last selected preset.
    pub fn selected_preset_id(&self) -> Option<&str> {
        self.selected_preset_id.as_deref()
    }

    /// Remember `name` (trimmed). An empty name clears the stored value.
    pub fn set_last_username(&mut self, name: &str) {
        let name = name.trim();
        self.last_username = name.to_string();
        if name.is_empty() {
            self.persist(LAST_USERNAME_KEY, self.store.remove(LAST_USERNAME_KEY));
        } else {
            self.persist(LAST_USERNAME_KEY, self.store.set(LAST_USERNAME_KEY, name));
        }
    }

    /// Forget the player name.
    pub fn clear_last_username(&mut self) {
        self.set_last_username("");
    }

    /// Remember the selected preset.
    pub fn set_selected_preset(&mut self, id: &str) {
        self.selected_preset_id = Some(id.to_string());
        self.persist(SELECTED_PRESET_KEY, self.store.set(SELECTED_PRESET_KEY, id));
    }

    /// Forget the selected preset.
    pub fn clear_selected_preset(&mut self) {
        self.selected_preset_id = None;
        self.persist(SELECTED_PRESET_KEY, self.store.remove(SELECTED_PRESET_KEY));
    }

    fn persist(&self, key: &str, result: StorageResult<()>) {
        if let Err(err) = result {
            warn!(key, error = %err, "failed to persist preference");
        }
    }
}

fn read(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(err) => {
            warn!(key, error = %err, "failed to read preference");
            None
        }
    }
}
