use std::path::PathBuf;
use std::sync::Mutex;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::ClientError;
use crate::models::Role;

/// What a successful login leaves behind on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub role: Role,
    pub name: String,
    pub email: String,
}

/// Where the session survives between runs.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<Session>, ClientError>;
    fn save(&self, session: &Session) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// JSON file on disk, used by the CLI.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<Session>, ClientError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, session: &Session) -> Result<(), ClientError> {
        let raw = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, raw)?;
        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Option<Session>>,
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Session>, ClientError> {
        Ok(self.inner.lock().map_err(|_| ClientError::Poisoned)?.clone())
    }

    fn save(&self, session: &Session) -> Result<(), ClientError> {
        *self.inner.lock().map_err(|_| ClientError::Poisoned)? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.inner.lock().map_err(|_| ClientError::Poisoned)? = None;
        Ok(())
    }
}

/// Holds the current session and announces sign-in and sign-out to
/// subscribers. Views receive this instead of reading storage directly.
pub struct SessionContext {
    storage: Box<dyn SessionStorage>,
    current: watch::Sender<Option<Session>>,
}

impl SessionContext {
    /// Restores whatever session the storage holds.
    pub fn load(storage: Box<dyn SessionStorage>) -> Result<Self, ClientError> {
        let restored = storage.load()?;
        let (current, _rx) = watch::channel(restored);
        Ok(Self { storage, current })
    }

    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|s| s.token.clone())
    }

    pub fn role(&self) -> Option<Role> {
        self.current.borrow().as_ref().map(|s| s.role)
    }

    pub fn sign_in(&self, session: Session) -> Result<(), ClientError> {
        self.storage.save(&session)?;
        info!("Signed in as {} ({})", session.email, session.role);
        self.current.send_replace(Some(session));
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), ClientError> {
        self.storage.clear()?;
        self.current.send_replace(None);
        info!("Signed out");
        Ok(())
    }

    /// Yields on every sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }
}
