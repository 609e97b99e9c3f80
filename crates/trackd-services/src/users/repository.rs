// crates/trackd-services/src/users/repository.rs
//
// User persistence behind a narrow trait. The object-relational layer
// is out of scope here; the in-memory implementation keeps insertion
// order so list responses page deterministically.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use trackd_core::entity::User;
use trackd_core::error::GatewayError;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, uuid: &Uuid) -> Result<User, GatewayError>;
    async fn get_by_username(&self, username: &str) -> Result<User, GatewayError>;
    async fn count(&self) -> Result<i64, GatewayError>;
    /// Page of users in insertion order.
    async fn query(&self, offset: i64, limit: i64) -> Result<Vec<User>, GatewayError>;
    async fn create(&self, user: User) -> Result<(), GatewayError>;
    async fn update(&self, user: User) -> Result<(), GatewayError>;
    async fn delete(&self, uuid: &Uuid) -> Result<(), GatewayError>;
}

/// In-memory repository, also used by tests.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn get(&self, uuid: &Uuid) -> Result<User, GatewayError> {
        let users = self.users.read().await;
        users
            .iter()
            .find(|u| &u.uuid == uuid)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("user {} not found", uuid)))
    }

    async fn get_by_username(&self, username: &str) -> Result<User, GatewayError> {
        let users = self.users.read().await;
        users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("user {} not found", username)))
    }

    async fn count(&self) -> Result<i64, GatewayError> {
        Ok(self.users.read().await.len() as i64)
    }

    async fn query(&self, offset: i64, limit: i64) -> Result<Vec<User>, GatewayError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn create(&self, user: User) -> Result<(), GatewayError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == user.username) {
            let mut fields = std::collections::HashMap::new();
            fields.insert("username".to_string(), "already taken".to_string());
            return Err(GatewayError::validation("username already exists", fields));
        }
        users.push(user);
        Ok(())
    }

    async fn update(&self, user: User) -> Result<(), GatewayError> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.uuid == user.uuid) {
            Some(existing) => {
                *existing = user;
                Ok(())
            }
            None => Err(GatewayError::not_found(format!(
                "user {} not found",
                user.uuid
            ))),
        }
    }

    async fn delete(&self, uuid: &Uuid) -> Result<(), GatewayError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| &u.uuid != uuid);
        if users.len() == before {
            return Err(GatewayError::not_found(format!("user {} not found", uuid)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(username: &str) -> User {
        let now = Utc::now();
        User {
            uuid: Uuid::now_v7(),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            email: format!("{}@example.com", username),
            enable: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let repo = MemoryUserRepository::new();
        let u = user("drist");
        repo.create(u.clone()).await.unwrap();

        assert_eq!(repo.get(&u.uuid).await.unwrap().username, "drist");
        assert_eq!(repo.get_by_username("drist").await.unwrap().uuid, u.uuid);
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.delete(&u.uuid).await.unwrap();
        assert!(repo.get(&u.uuid).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let repo = MemoryUserRepository::new();
        repo.create(user("drist")).await.unwrap();
        let err = repo.create(user("drist")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_query_pages_in_insertion_order() {
        let repo = MemoryUserRepository::new();
        for i in 0..5 {
            repo.create(user(&format!("u{}", i))).await.unwrap();
        }
        let page = repo.query(1, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].username, "u1");
        assert_eq!(page[1].username, "u2");
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let repo = MemoryUserRepository::new();
        let err = repo.update(user("ghost")).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }
}
