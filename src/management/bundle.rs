use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    config,
    errors::ShuffleError,
    types::{Bundle, NewBundle, TrackId},
    utils,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct BundleStore {
    next_id: u64,
    bundles: Vec<Bundle>,
}

impl BundleStore {
    fn position(&self, id: u64) -> Result<usize, ShuffleError> {
        self.bundles
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| ShuffleError::NotFound(format!("bundle {}", id)))
    }

    fn has_triple(
        &self,
        user_id: &str,
        intro: &TrackId,
        main: &TrackId,
        strict: bool,
        except: Option<u64>,
    ) -> bool {
        self.bundles.iter().any(|b| {
            Some(b.id) != except
                && b.user_id == user_id
                && b.intro == *intro
                && b.main == *main
                && b.strict == strict
        })
    }
}

/// Persisted bundle records of all users.
///
/// Every change is persisted while the lock is held and undone in memory
/// when the write fails.
pub struct BundleManager {
    path: Option<PathBuf>,
    store: Mutex<BundleStore>,
}

impl BundleManager {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            store: Mutex::new(BundleStore::default()),
        }
    }

    pub async fn load() -> Result<Self, ShuffleError> {
        Self::load_from(config::data_dir().join("state/bundles.json")).await
    }

    pub async fn load_from(path: PathBuf) -> Result<Self, ShuffleError> {
        let store = utils::load_json(&path).await?.unwrap_or_default();
        Ok(Self {
            path: Some(path),
            store: Mutex::new(store),
        })
    }

    /// Stores a new bundle. The same (intro, main, strict) triple can exist
    /// only once per user.
    pub async fn create(&self, new: NewBundle) -> Result<Bundle, ShuffleError> {
        if new.intro == new.main {
            return Err(ShuffleError::InvalidTrackId(format!(
                "{} cannot be bundled with itself",
                new.intro
            )));
        }

        let mut store = self.store.lock().await;
        if store.has_triple(&new.user_id, &new.intro, &new.main, new.strict, None) {
            return Err(ShuffleError::DuplicateBundle);
        }

        let bundle = Bundle {
            id: store.next_id + 1,
            user_id: new.user_id,
            intro: new.intro,
            main: new.main,
            strict: new.strict,
        };
        store.next_id += 1;
        store.bundles.push(bundle.clone());

        if let Err(e) = self.persist(&store).await {
            store.next_id -= 1;
            store.bundles.pop();
            return Err(e);
        }
        Ok(bundle)
    }

    /// Flips the strict flag. Fails with [`ShuffleError::DuplicateBundle`]
    /// when the user already has the pair with the new strictness.
    pub async fn set_strict(&self, id: u64, strict: bool) -> Result<Bundle, ShuffleError> {
        let mut store = self.store.lock().await;
        let pos = store.position(id)?;
        let current = store.bundles[pos].clone();
        if current.strict == strict {
            return Ok(current);
        }
        if store.has_triple(&current.user_id, &current.intro, &current.main, strict, Some(id)) {
            return Err(ShuffleError::DuplicateBundle);
        }

        store.bundles[pos].strict = strict;
        if let Err(e) = self.persist(&store).await {
            store.bundles[pos].strict = current.strict;
            return Err(e);
        }
        Ok(store.bundles[pos].clone())
    }

    pub async fn delete(&self, id: u64) -> Result<Bundle, ShuffleError> {
        let mut store = self.store.lock().await;
        let pos = store.position(id)?;
        let removed = store.bundles.remove(pos);

        if let Err(e) = self.persist(&store).await {
            store.bundles.insert(pos, removed);
            return Err(e);
        }
        Ok(removed)
    }

    pub async fn get(&self, id: u64) -> Option<Bundle> {
        self.store
            .lock()
            .await
            .bundles
            .iter()
            .find(|b| b.id == id)
            .cloned()
    }

    /// Bundles of one user in creation order.
    pub async fn for_user(&self, user_id: &str) -> Vec<Bundle> {
        self.store
            .lock()
            .await
            .bundles
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn persist(&self, store: &BundleStore) -> Result<(), ShuffleError> {
        match &self.path {
            Some(path) => utils::persist_json(path, store).await,
            None => Ok(()),
        }
    }
}
