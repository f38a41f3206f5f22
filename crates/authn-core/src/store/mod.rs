//! Session persistence.
//!
//! A store holds at most one session. [`FileStore`] keeps it as a JSON file
//! on disk; [`MemoryStore`] keeps it for the lifetime of the process.

pub mod file;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::session::Session;

pub use file::FileStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>>;

    async fn set_session(&self, session: &Session) -> Result<()>;

    async fn remove_session(&self) -> Result<()>;
}
