// crates/trackd-services/src/users/api.rs
//
// The users controller: auth operations plus CRUD, attached to both
// protocol faces. RPC handlers hold the business logic; REST routes
// are thin transcoders that re-issue the decoded request over the
// loopback client.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use trackd_core::entity::Identity;
use trackd_core::error::GatewayError;

use trackd_auth::password::verify_password;
use trackd_auth::tokens::{TokenManager, TokenPair};

use trackd_gateway::context::CallContext;
use trackd_gateway::pagination::offset_and_limit;
use trackd_gateway::registry::{Controller, Registry};
use trackd_gateway::rest::{forward, RestError, RestState};
use trackd_gateway::rpc::MethodTable;

use super::service::{CreateUserRequest, UpdateUserRequest, UserService};

// Fully-qualified method names, shared by both faces.
pub const LOGIN: &str = "/users.UserService/Login";
pub const LOGOUT: &str = "/users.UserService/Logout";
pub const REGISTER: &str = "/users.UserService/Register";
pub const VERIFY_TOKEN: &str = "/users.UserService/VerifyToken";
pub const REFRESH_TOKEN: &str = "/users.UserService/RefreshToken";
pub const LIST_USERS: &str = "/users.UserService/ListUsers";
pub const GET_USER: &str = "/users.UserService/GetUser";
pub const CREATE_USER: &str = "/users.UserService/CreateUser";
pub const UPDATE_USER: &str = "/users.UserService/UpdateUser";
pub const DELETE_USER: &str = "/users.UserService/DeleteUser";

// ---------------------------------------------------------------------------
// Request/response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTokenRequest {
    #[serde(default)]
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersRequest {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserRequest {
    pub uuid: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserRequest {
    pub uuid: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyResponse {}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn login(
    service: Arc<UserService>,
    tokens: Arc<TokenManager>,
    _ctx: CallContext,
    req: LoginRequest,
) -> Result<TokenPair, GatewayError> {
    let user = service
        .get_by_username(&req.username)
        .await
        .map_err(|_| GatewayError::not_found(format!("username {} not found", req.username)))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(GatewayError::unauthenticated(
            "username or password is not valid",
        ));
    }

    tokens.issue_pair(&Identity::from(&user)).await.map_err(|e| {
        tracing::error!(user = %user.username, error = %e, "failed to issue token pair");
        GatewayError::internal("internal server error, create token")
    })
}

pub async fn logout(
    tokens: Arc<TokenManager>,
    ctx: CallContext,
    _req: LogoutRequest,
) -> Result<LogoutResponse, GatewayError> {
    let token = ctx.bearer_token()?;
    tokens.revoke(token, true).await.map_err(|e| {
        tracing::error!(error = %e, "failed to remove token");
        GatewayError::internal("logout failed")
    })?;
    Ok(LogoutResponse {})
}

pub async fn register_account(
    service: Arc<UserService>,
    _ctx: CallContext,
    req: RegisterRequest,
) -> Result<RegisterResponse, GatewayError> {
    let user = service
        .create(CreateUserRequest {
            username: req.username,
            password: req.password,
            email: req.email,
            enable: true,
        })
        .await?;

    Ok(RegisterResponse {
        uuid: user.uuid,
        username: user.username,
        email: user.email,
    })
}

pub async fn verify_token(
    tokens: Arc<TokenManager>,
    _ctx: CallContext,
    req: VerifyTokenRequest,
) -> Result<VerifyTokenResponse, GatewayError> {
    tokens
        .verify(&req.access_token)
        .await
        .map_err(|_| GatewayError::unauthenticated("invalid token"))?;
    Ok(VerifyTokenResponse {
        access_token: req.access_token,
    })
}

pub async fn refresh_token(
    service: Arc<UserService>,
    tokens: Arc<TokenManager>,
    _ctx: CallContext,
    req: RefreshTokenRequest,
) -> Result<TokenPair, GatewayError> {
    let identity = tokens
        .verify(&req.refresh_token)
        .await
        .map_err(|_| GatewayError::unauthenticated("invalid refresh token"))?;

    let user = service
        .get_by_username(&identity.username)
        .await
        .map_err(|_| GatewayError::unauthenticated("invalid user"))?;
    if !user.enable {
        return Err(GatewayError::unauthenticated("user is not active"));
    }

    tokens.rotate(&req.refresh_token).await
}

pub async fn list_users(
    service: Arc<UserService>,
    _ctx: CallContext,
    req: ListUsersRequest,
) -> Result<super::service::ListUsersResponse, GatewayError> {
    let (offset, limit) = offset_and_limit(req.offset, req.limit);
    service.query(offset, limit).await
}

pub async fn get_user(
    service: Arc<UserService>,
    _ctx: CallContext,
    req: GetUserRequest,
) -> Result<super::service::UserResponse, GatewayError> {
    service.get(&req.uuid).await
}

pub async fn create_user(
    service: Arc<UserService>,
    _ctx: CallContext,
    req: CreateUserRequest,
) -> Result<super::service::UserResponse, GatewayError> {
    service.create(req).await
}

pub async fn update_user(
    service: Arc<UserService>,
    _ctx: CallContext,
    req: UpdateUserRequest,
) -> Result<super::service::UserResponse, GatewayError> {
    service.update(req).await
}

pub async fn delete_user(
    service: Arc<UserService>,
    _ctx: CallContext,
    req: DeleteUserRequest,
) -> Result<EmptyResponse, GatewayError> {
    service.delete(&req.uuid).await?;
    Ok(EmptyResponse {})
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct UsersController {
    service: Arc<UserService>,
    tokens: Arc<TokenManager>,
}

impl UsersController {
    pub fn new(service: Arc<UserService>, tokens: Arc<TokenManager>) -> Self {
        Self { service, tokens }
    }
}

impl Controller for UsersController {
    fn register_rpc(&self, methods: &mut MethodTable) {
        {
            let service = self.service.clone();
            let tokens = self.tokens.clone();
            methods.register_unary(LOGIN, move |ctx, req: LoginRequest| {
                login(service.clone(), tokens.clone(), ctx, req)
            });
        }
        {
            let tokens = self.tokens.clone();
            methods.register_unary(LOGOUT, move |ctx, req: LogoutRequest| {
                logout(tokens.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            methods.register_unary(REGISTER, move |ctx, req: RegisterRequest| {
                register_account(service.clone(), ctx, req)
            });
        }
        {
            let tokens = self.tokens.clone();
            methods.register_unary(VERIFY_TOKEN, move |ctx, req: VerifyTokenRequest| {
                verify_token(tokens.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            let tokens = self.tokens.clone();
            methods.register_unary(REFRESH_TOKEN, move |ctx, req: RefreshTokenRequest| {
                refresh_token(service.clone(), tokens.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            methods.register_unary(LIST_USERS, move |ctx, req: ListUsersRequest| {
                list_users(service.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            methods.register_unary(GET_USER, move |ctx, req: GetUserRequest| {
                get_user(service.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            methods.register_unary(CREATE_USER, move |ctx, req: CreateUserRequest| {
                create_user(service.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            methods.register_unary(UPDATE_USER, move |ctx, req: UpdateUserRequest| {
                update_user(service.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            methods.register_unary(DELETE_USER, move |ctx, req: DeleteUserRequest| {
                delete_user(service.clone(), ctx, req)
            });
        }
    }

    fn register_rest(&self, router: Router<RestState>) -> Router<RestState> {
        router
            .route("/v1/auth/login", post(rest_login))
            .route("/v1/auth/logout", post(rest_logout))
            .route("/v1/auth/register", post(rest_register))
            .route("/v1/auth/refresh", post(rest_refresh))
            .route("/v1/auth/verify", post(rest_verify))
            .route("/v1/users", get(rest_list_users).post(rest_create_user))
            .route(
                "/v1/users/{uuid}",
                get(rest_get_user)
                    .put(rest_update_user)
                    .delete(rest_delete_user),
            )
    }
}

/// Register the users module: its controller and its open methods.
/// Login, register, verify, and refresh carry their own credentials in
/// the request body, so they bypass the bearer check.
pub fn register(registry: &Registry, service: Arc<UserService>, tokens: Arc<TokenManager>) {
    registry.register_controller(Arc::new(UsersController::new(service, tokens)));
    registry.mark_open(LOGIN);
    registry.mark_open(REGISTER);
    registry.mark_open(VERIFY_TOKEN);
    registry.mark_open(REFRESH_TOKEN);
}

// ---------------------------------------------------------------------------
// REST transcoders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListParams {
    offset: Option<i64>,
    limit: Option<i64>,
}

async fn rest_login(
    State(state): State<RestState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, LOGIN, body).await
}

async fn rest_logout(
    State(state): State<RestState>,
    headers: HeaderMap,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, LOGOUT, json!({})).await
}

async fn rest_register(
    State(state): State<RestState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, REGISTER, body).await
}

async fn rest_refresh(
    State(state): State<RestState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, REFRESH_TOKEN, body).await
}

async fn rest_verify(
    State(state): State<RestState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, VERIFY_TOKEN, body).await
}

async fn rest_list_users(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, RestError> {
    let body = json!({"offset": params.offset, "limit": params.limit});
    forward(&state, &headers, LIST_USERS, body).await
}

async fn rest_get_user(
    State(state): State<RestState>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, GET_USER, json!({"uuid": uuid})).await
}

async fn rest_create_user(
    State(state): State<RestState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, CREATE_USER, body).await
}

async fn rest_update_user(
    State(state): State<RestState>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
    Json(mut body): Json<Value>,
) -> Result<Json<Value>, RestError> {
    if let Some(obj) = body.as_object_mut() {
        obj.insert("uuid".to_string(), json!(uuid));
    }
    forward(&state, &headers, UPDATE_USER, body).await
}

async fn rest_delete_user(
    State(state): State<RestState>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, DELETE_USER, json!({"uuid": uuid})).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repository::MemoryUserRepository;
    use trackd_store::MemoryKv;

    struct Fixture {
        service: Arc<UserService>,
        tokens: Arc<TokenManager>,
    }

    async fn fixture_with_user(username: &str, enable: bool) -> Fixture {
        let service = Arc::new(UserService::new(Arc::new(MemoryUserRepository::new())));
        let tokens = Arc::new(TokenManager::new(
            "api-test-secret",
            15,
            170,
            Arc::new(MemoryKv::new()),
        ));
        let created = service
            .create(CreateUserRequest {
                username: username.to_string(),
                password: "hunter2".to_string(),
                email: format!("{}@example.com", username),
                enable: true,
            })
            .await
            .unwrap();
        if !enable {
            service
                .update(UpdateUserRequest {
                    uuid: created.uuid,
                    username: username.to_string(),
                    email: format!("{}@example.com", username),
                    enable: false,
                })
                .await
                .unwrap();
        }
        Fixture { service, tokens }
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_pair() {
        let f = fixture_with_user("drist", true).await;
        let pair = login(
            f.service.clone(),
            f.tokens.clone(),
            CallContext::new(),
            LoginRequest {
                username: "drist".to_string(),
                password: "hunter2".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(
            f.tokens.verify(&pair.access_token).await.unwrap().username,
            "drist"
        );
        assert_eq!(
            f.tokens.verify(&pair.refresh_token).await.unwrap().username,
            "drist"
        );
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthenticated() {
        let f = fixture_with_user("drist", true).await;
        let err = login(
            f.service.clone(),
            f.tokens.clone(),
            CallContext::new(),
            LoginRequest {
                username: "drist".to_string(),
                password: "wrong".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_not_found() {
        let f = fixture_with_user("drist", true).await;
        let err = login(
            f.service.clone(),
            f.tokens.clone(),
            CallContext::new(),
            LoginRequest {
                username: "ghost".to_string(),
                password: "hunter2".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_logout_revokes_both_tokens() {
        let f = fixture_with_user("drist", true).await;
        let pair = login(
            f.service.clone(),
            f.tokens.clone(),
            CallContext::new(),
            LoginRequest {
                username: "drist".to_string(),
                password: "hunter2".to_string(),
            },
        )
        .await
        .unwrap();

        let ctx = CallContext {
            token: Some(pair.access_token.clone()),
            ..CallContext::new()
        };
        logout(f.tokens.clone(), ctx, LogoutRequest {}).await.unwrap();

        assert!(f.tokens.verify(&pair.access_token).await.is_err());
        assert!(f.tokens.verify(&pair.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_rejects_disabled_user() {
        let f = fixture_with_user("drist", false).await;
        // Tokens issued before the account was disabled.
        let user = f.service.get_by_username("drist").await.unwrap();
        let pair = f
            .tokens
            .issue_pair(&trackd_core::entity::Identity::from(&user))
            .await
            .unwrap();

        let err = refresh_token(
            f.service.clone(),
            f.tokens.clone(),
            CallContext::new(),
            RefreshTokenRequest {
                refresh_token: pair.refresh_token,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let f = fixture_with_user("drist", true).await;
        let err = register_account(
            f.service.clone(),
            CallContext::new(),
            RegisterRequest {
                username: String::new(),
                password: "pw".to_string(),
                email: "a@example.com".to_string(),
            },
        )
        .await
        .unwrap_err();
        match err {
            GatewayError::Validation { fields, .. } => {
                assert_eq!(fields["username"], "required");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
