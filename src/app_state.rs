use std::sync::Arc;

use crate::config::Config;
use crate::store::{MemoryStore, MessageStore, MongoDB, ProjectStore, UserStore};
use crate::token::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub messages: Arc<dyn MessageStore>,
    pub tokens: TokenService,
    pub config: Config,
}

impl AppState {
    pub fn with_mongo(mongodb: Arc<MongoDB>, config: Config) -> Self {
        Self {
            users: mongodb.clone(),
            projects: mongodb.clone(),
            messages: mongodb,
            tokens: TokenService::new(&config.jwt_secret, config.jwt_expires_in),
            config,
        }
    }

    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            projects: store.clone(),
            messages: store,
            tokens: TokenService::new(&config.jwt_secret, config.jwt_expires_in),
            config,
        }
    }
}
