use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::SessionStore;
use crate::session::Session;

/// Session file name in the session directory
pub const SESSION_FILE: &str = "session.json";

/// Plain JSON file holding the current session.
///
/// The file is not encrypted; platform secure storage should be plugged in
/// through [`SessionStore`] where that matters. A file that does not parse
/// is removed and reads as no session.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store `session.json` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| SESSION_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn get_session(&self) -> Result<Option<Session>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to read session file"),
        };
        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, path = ?self.path, "Session file is corrupt, removing");
                self.remove_session().await?;
                Ok(None)
            }
        }
    }

    async fn set_session(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        // Rename into place so readers never see a partial file
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, contents)
            .await
            .context("Failed to write session file")?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context("Failed to replace session file")?;
        debug!(path = ?self.path, "Session saved");
        Ok(())
    }

    async fn remove_session(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove session file"),
        }
    }
}
