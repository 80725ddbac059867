use std::path::PathBuf;

use crate::{config, errors::ShuffleError, types::UserLibrary, utils};

/// File-backed cache of users' saved tracks and playlists.
pub struct LibraryManager {
    root: PathBuf,
}

impl LibraryManager {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn default_location() -> Self {
        Self::new(config::data_dir().join("cache"))
    }

    pub async fn load(&self, user_id: &str) -> Result<UserLibrary, ShuffleError> {
        utils::load_json(&self.path(user_id))
            .await?
            .ok_or_else(|| ShuffleError::NotFound(format!("library cache for {}", user_id)))
    }

    pub async fn persist(&self, user_id: &str, library: &UserLibrary) -> Result<(), ShuffleError> {
        utils::persist_json(&self.path(user_id), library).await
    }

    pub async fn clear(&self, user_id: &str) -> Result<bool, ShuffleError> {
        match async_fs::remove_file(self.path(user_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        // user ids are used as directory names, keep them inert
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(safe).join("library.json")
    }
}
