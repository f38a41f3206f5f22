use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::SessionStore;
use crate::session::Session;

#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_session(&self) -> Result<Option<Session>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn set_session(&self, session: &Session) -> Result<()> {
        *self.slot.lock().await = Some(session.clone());
        Ok(())
    }

    async fn remove_session(&self) -> Result<()> {
        self.slot.lock().await.take();
        Ok(())
    }
}
