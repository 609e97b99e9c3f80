// crates/trackd-services/src/users/service.rs
//
// Use-case logic for users. Validation is the narrow pass/fail +
// field-map surface the gateway expects; the rules themselves are
// deliberately simple (required, length caps).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trackd_core::entity::User;
use trackd_core::error::GatewayError;

use trackd_auth::password::hash_password;

use super::repository::UserRepository;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub enable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub uuid: Uuid,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub enable: bool,
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub enable: bool,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            uuid: user.uuid,
            username: user.username.clone(),
            email: user.email.clone(),
            enable: user.enable,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
    pub total_count: i64,
    pub offset: i64,
    pub limit: i64,
}

const MAX_FIELD_LEN: usize = 128;

fn require(fields: &mut HashMap<String, String>, name: &str, value: &str) {
    if value.trim().is_empty() {
        fields.insert(name.to_string(), "required".to_string());
    } else if value.len() > MAX_FIELD_LEN {
        fields.insert(
            name.to_string(),
            format!("must be at most {} characters", MAX_FIELD_LEN),
        );
    }
}

/// Validate a create request; field messages name every offending field.
pub fn validate_create_request(req: &CreateUserRequest) -> Result<(), GatewayError> {
    let mut fields = HashMap::new();
    require(&mut fields, "username", &req.username);
    require(&mut fields, "email", &req.email);
    require(&mut fields, "password", &req.password);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::validation("validation failed", fields))
    }
}

/// Validate an update request.
pub fn validate_update_request(req: &UpdateUserRequest) -> Result<(), GatewayError> {
    let mut fields = HashMap::new();
    require(&mut fields, "username", &req.username);
    require(&mut fields, "email", &req.email);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::validation("validation failed", fields))
    }
}

/// Encapsulates use-case logic for users.
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, uuid: &Uuid) -> Result<UserResponse, GatewayError> {
        let user = self.repo.get(uuid).await?;
        Ok(UserResponse::from(&user))
    }

    /// Full entity, for credential checks. Not exposed on the wire.
    pub async fn get_by_username(&self, username: &str) -> Result<User, GatewayError> {
        self.repo.get_by_username(username).await
    }

    pub async fn query(&self, offset: i64, limit: i64) -> Result<ListUsersResponse, GatewayError> {
        let users = self.repo.query(offset, limit).await?;
        let total_count = self.repo.count().await?;
        Ok(ListUsersResponse {
            users: users.iter().map(UserResponse::from).collect(),
            total_count,
            offset,
            limit,
        })
    }

    pub async fn create(&self, req: CreateUserRequest) -> Result<UserResponse, GatewayError> {
        validate_create_request(&req)?;
        let now = Utc::now();
        let user = User {
            uuid: Uuid::now_v7(),
            username: req.username,
            password_hash: hash_password(&req.password)?,
            email: req.email,
            enable: req.enable,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(user.clone()).await?;
        Ok(UserResponse::from(&user))
    }

    pub async fn update(&self, req: UpdateUserRequest) -> Result<UserResponse, GatewayError> {
        validate_update_request(&req)?;
        let mut user = self.repo.get(&req.uuid).await?;
        user.username = req.username;
        user.email = req.email;
        user.enable = req.enable;
        user.updated_at = Utc::now();
        self.repo.update(user.clone()).await?;
        Ok(UserResponse::from(&user))
    }

    pub async fn delete(&self, uuid: &Uuid) -> Result<(), GatewayError> {
        self.repo.delete(uuid).await
    }
}
