use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never returned to clients
    #[serde(rename = "password")]
    pub password_hash: String,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.to_string(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Insert shape for a new account
#[derive(Debug, Serialize)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    #[serde(rename = "password")]
    pub password_hash: &'a str,
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}
