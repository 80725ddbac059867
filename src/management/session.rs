use std::{collections::BTreeMap, path::PathBuf};

use tokio::sync::Mutex;

use crate::{config, errors::ShuffleError, types::QueueSession, utils};

/// Persisted shuffle sessions, one per user, so refilling can resume after
/// a restart.
pub struct SessionManager {
    path: Option<PathBuf>,
    sessions: Mutex<BTreeMap<String, QueueSession>>,
}

impl SessionManager {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    pub async fn load() -> Result<Self, ShuffleError> {
        Self::load_from(config::data_dir().join("state/sessions.json")).await
    }

    pub async fn load_from(path: PathBuf) -> Result<Self, ShuffleError> {
        let sessions = utils::load_json(&path).await?.unwrap_or_default();
        Ok(Self {
            path: Some(path),
            sessions: Mutex::new(sessions),
        })
    }

    pub async fn save(&self, session: &QueueSession) -> Result<(), ShuffleError> {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.user_id.clone(), session.clone());
        self.persist(&sessions).await
    }

    pub async fn get(&self, user_id: &str) -> Option<QueueSession> {
        self.sessions.lock().await.get(user_id).cloned()
    }

    pub async fn remove(&self, user_id: &str) -> Result<(), ShuffleError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.remove(user_id).is_some() {
            self.persist(&sessions).await?;
        }
        Ok(())
    }

    pub async fn all(&self) -> Vec<QueueSession> {
        self.sessions.lock().await.values().cloned().collect()
    }

    async fn persist(&self, sessions: &BTreeMap<String, QueueSession>) -> Result<(), ShuffleError> {
        match &self.path {
            Some(path) => utils::persist_json(path, sessions).await,
            None => Ok(()),
        }
    }
}
