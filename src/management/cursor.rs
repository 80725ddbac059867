use std::{collections::BTreeMap, path::PathBuf};

use tokio::sync::Mutex;

use crate::{config, errors::ShuffleError, utils};

/// Durable per-user playback cursors.
///
/// A cursor is the index of the next track of the user's active shuffle
/// queue that has not been pushed to the remote queue yet. Every write
/// persists the whole document while the lock is held, so a reader never
/// sees a half-applied update.
pub struct CursorManager {
    path: Option<PathBuf>,
    cursors: Mutex<BTreeMap<String, usize>>,
}

impl CursorManager {
    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cursors: Mutex::new(BTreeMap::new()),
        }
    }

    pub async fn load() -> Result<Self, ShuffleError> {
        Self::load_from(Self::default_path()).await
    }

    pub async fn load_from(path: PathBuf) -> Result<Self, ShuffleError> {
        let cursors = utils::load_json(&path).await?.unwrap_or_default();
        Ok(Self {
            path: Some(path),
            cursors: Mutex::new(cursors),
        })
    }

    /// Creates the cursor row for `user_id` (at 0) if it does not exist yet.
    pub async fn register(&self, user_id: &str) -> Result<(), ShuffleError> {
        let mut cursors = self.cursors.lock().await;
        if cursors.contains_key(user_id) {
            return Ok(());
        }
        cursors.insert(user_id.to_string(), 0);
        self.persist(&cursors).await
    }

    pub async fn is_registered(&self, user_id: &str) -> bool {
        self.cursors.lock().await.contains_key(user_id)
    }

    pub async fn get(&self, user_id: &str) -> usize {
        self.cursors
            .lock()
            .await
            .get(user_id)
            .copied()
            .unwrap_or(0)
    }

    /// Overwrites the cursor of a registered user.
    pub async fn set(&self, user_id: &str, cursor: usize) -> Result<(), ShuffleError> {
        let mut cursors = self.cursors.lock().await;
        let Some(slot) = cursors.get_mut(user_id) else {
            return Err(ShuffleError::NotFound(format!("user {}", user_id)));
        };
        let previous = *slot;
        *slot = cursor;

        if let Err(e) = self.persist(&cursors).await {
            // keep memory and disk in agreement
            cursors.insert(user_id.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    async fn persist(&self, cursors: &BTreeMap<String, usize>) -> Result<(), ShuffleError> {
        match &self.path {
            Some(path) => utils::persist_json(path, cursors).await,
            None => Ok(()),
        }
    }

    fn default_path() -> PathBuf {
        config::data_dir().join("state/cursors.json")
    }
}
