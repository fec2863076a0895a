use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory denylist of token ids.
///
/// Entries are kept until the token's own expiry, after which validation rejects the
/// token anyway. The list is per process and does not survive a restart.
#[derive(Debug, Default)]
pub struct RevocationList {
    revoked: RwLock<HashMap<Uuid, i64>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn revoke(&self, jti: Uuid, expires_at: i64) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, exp| *exp >= now);
        if expires_at >= now {
            revoked.insert(jti, expires_at);
        }
    }

    /// Revoke unless already revoked, as one step. Returns false when the id was present.
    pub async fn revoke_once(&self, jti: Uuid, expires_at: i64) -> bool {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, exp| *exp >= now);
        if revoked.contains_key(&jti) {
            return false;
        }
        if expires_at >= now {
            revoked.insert(jti, expires_at);
        }
        true
    }

    pub async fn is_revoked(&self, jti: &Uuid) -> bool {
        self.revoked.read().await.contains_key(jti)
    }

    pub async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_ids_are_reported() {
        let list = RevocationList::new();
        let jti = Uuid::new_v4();
        let later = Utc::now().timestamp() + 60;

        assert!(!list.is_revoked(&jti).await);
        list.revoke(jti, later).await;
        assert!(list.is_revoked(&jti).await);
        assert!(!list.is_revoked(&Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn expired_entries_are_purged() {
        let list = RevocationList::new();
        let now = Utc::now().timestamp();

        list.revoke(Uuid::new_v4(), now - 10).await;
        assert!(list.is_empty().await);

        list.revoke(Uuid::new_v4(), now + 60).await;
        assert_eq!(list.len().await, 1);
    }

    #[tokio::test]
    async fn revoke_once_succeeds_a_single_time() {
        let list = RevocationList::new();
        let jti = Uuid::new_v4();
        let later = Utc::now().timestamp() + 60;

        assert!(list.revoke_once(jti, later).await);
        assert!(!list.revoke_once(jti, later).await);
        assert!(list.is_revoked(&jti).await);
    }
}
