use std::sync::Arc;

use thiserror::Error;

use crate::auth::{PasswordError, PasswordHasher, TokenError, TokenService};
use crate::config::AppConfig;
use crate::database::models::{Plan, User, PLANS, USERS};
use crate::database::{DocumentStore, MemoryStore, Repository};

/// Security settings that cannot back a running service
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Shared per-process dependencies handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordHasher,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Arc<dyn DocumentStore>) -> Result<Self, StateError> {
        Ok(Self {
            store,
            tokens: Arc::new(TokenService::new(&config.security)?),
            passwords: PasswordHasher::new(config.security.bcrypt_cost)?,
        })
    }

    pub fn users(&self) -> Repository<User> {
        Repository::new(USERS, self.store.clone())
    }

    pub fn plans(&self) -> Repository<Plan> {
        Repository::new(PLANS, self.store.clone())
    }
}

/// Memory store with the same unique constraints as the Postgres schema
pub fn memory_store() -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::new().with_unique_index(USERS, "username"))
}
