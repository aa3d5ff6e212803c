//! Terminal client for the tracker API: session handling, client-side route
//! guards, a typed HTTP client and plain-text views.

pub mod api;
pub mod guard;
pub mod session;
pub mod views;

use thiserror::Error;

pub use api::ApiClient;
pub use guard::{guard, landing, menu, Guard, MenuItem, View};
pub use session::{FileStorage, MemoryStorage, Session, SessionContext, SessionStorage};

pub const DEFAULT_API_URL: &str = "http://localhost:5003/api";
pub const DEFAULT_SESSION_FILE: &str = ".tracker-session.json";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error; `message` is its own text.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("session storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("session storage lock poisoned")]
    Poisoned,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
