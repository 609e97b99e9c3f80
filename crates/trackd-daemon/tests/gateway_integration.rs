// crates/trackd-daemon/tests/gateway_integration.rs
//
// End-to-end tests for the dual-protocol gateway: both faces are
// started on ephemeral ports and driven as real clients — the RPC face
// through the envelope client, the HTTP face through plain reqwest.
//
// These tests use the public APIs of the underlying library crates
// directly (trackd-gateway, trackd-services, trackd-auth, trackd-store)
// since the daemon is a binary crate with no lib.rs.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Json, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use trackd_auth::interceptors;
use trackd_auth::tokens::TokenManager;
use trackd_core::error::GatewayError;
use trackd_gateway::client::RpcClient;
use trackd_gateway::context::CallContext;
use trackd_gateway::registry::{Controller, Registry};
use trackd_gateway::rest::{forward, RestError, RestState};
use trackd_gateway::rpc::MethodTable;
use trackd_gateway::server::{Gateway, GatewayConfig};
use trackd_services::issues::api::{CREATE_ISSUE, GET_ISSUE};
use trackd_services::issues::{self, IssueService, MemoryIssueRepository};
use trackd_services::users::api::{CREATE_USER, LIST_USERS, LOGIN, LOGOUT, VERIFY_TOKEN};
use trackd_services::users::{self, MemoryUserRepository, UserService};
use trackd_store::MemoryKv;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const CHAOS: &str = "/test.Chaos/Panic";

/// Handler that always panics; the recovery stage must turn this into
/// an Internal error without taking the server down.
async fn chaos(_ctx: CallContext, _req: Value) -> Result<Value, GatewayError> {
    panic!("chaos handler exploded")
}

struct ChaosController;

impl Controller for ChaosController {
    fn register_rpc(&self, methods: &mut MethodTable) {
        methods.register_unary(CHAOS, chaos);
    }

    fn register_rest(&self, router: Router<RestState>) -> Router<RestState> {
        async fn rest_chaos(
            State(state): State<RestState>,
            headers: HeaderMap,
        ) -> Result<Json<Value>, RestError> {
            forward(&state, &headers, CHAOS, json!({})).await
        }
        router.route("/v1/chaos", post(rest_chaos))
    }
}

struct TestServer {
    rpc: RpcClient,
    http: String,
    client: reqwest::Client,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>,
}

impl TestServer {
    async fn start() -> Self {
        let kv = Arc::new(MemoryKv::new());
        let tokens = Arc::new(TokenManager::new("integration-secret", 15, 170, kv));
        let user_service = Arc::new(UserService::new(Arc::new(MemoryUserRepository::new())));
        let issue_service = Arc::new(IssueService::new(Arc::new(MemoryIssueRepository::new())));

        let registry = Arc::new(Registry::new());
        users::register(&registry, user_service, tokens.clone());
        issues::register(&registry, issue_service);
        registry.register_controller(Arc::new(ChaosController));
        registry.mark_open(CHAOS);
        interceptors::register(&registry, tokens);

        let config = GatewayConfig {
            host: "127.0.0.1".to_string(),
            grpc_port: 0,
            http_port: 0,
            http_grace: Duration::from_secs(1),
        };
        let bound = Gateway::new(registry, config).bind().await.unwrap();
        let rpc = RpcClient::new(format!("http://{}", bound.grpc_addr()));
        let http = format!("http://{}", bound.http_addr());

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(bound.serve(shutdown.clone()));

        TestServer {
            rpc,
            http,
            client: reqwest::Client::new(),
            shutdown,
            handle,
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap().unwrap();
    }

    /// Register an account over the HTTP face and log in over the RPC
    /// face, returning (access, refresh).
    async fn register_and_login(&self, username: &str) -> (String, String) {
        let resp = self
            .client
            .post(format!("{}/v1/auth/register", self.http))
            .json(&json!({
                "username": username,
                "password": "hunter2",
                "email": format!("{}@example.com", username),
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let pair = self
            .rpc
            .call(
                LOGIN,
                json!({"username": username, "password": "hunter2"}),
                None,
            )
            .await
            .unwrap();
        (
            pair["access_token"].as_str().unwrap().to_string(),
            pair["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}

// ---------------------------------------------------------------------------
// Authorization map behavior
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_protected_method_requires_credential_on_both_faces() {
    let server = TestServer::start().await;

    // RPC face, no credential.
    let err = server
        .rpc
        .call(CREATE_USER, json!({"username": "x"}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unauthenticated(_)));

    // HTTP face, no credential.
    let resp = server
        .client
        .post(format!("{}/v1/users", server.http))
        .json(&json!({"username": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 401);

    server.stop().await;
}

#[tokio::test]
async fn test_open_method_reaches_handler_without_credential() {
    let server = TestServer::start().await;

    // Login is registered open, so an uncredentialed call reaches the
    // business handler — which reports the unknown account, not an
    // authentication failure.
    let err = server
        .rpc
        .call(LOGIN, json!({"username": "ghost", "password": "x"}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));

    server.stop().await;
}

// ---------------------------------------------------------------------------
// Token lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_issues_pair_usable_on_both_faces() {
    let server = TestServer::start().await;
    let (access, refresh) = server.register_and_login("drist").await;

    // Access token authorizes a protected RPC call.
    let out = server
        .rpc
        .call(LIST_USERS, json!({}), Some(&access))
        .await
        .unwrap();
    assert_eq!(out["total_count"], 1);

    // And the same protected route over HTTP.
    let resp = server
        .client
        .get(format!("{}/v1/users", server.http))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Both halves of the pair verify independently.
    for token in [&access, &refresh] {
        server
            .rpc
            .call(VERIFY_TOKEN, json!({"access_token": token}), None)
            .await
            .unwrap();
    }

    server.stop().await;
}

#[tokio::test]
async fn test_logout_revokes_the_whole_pair() {
    let server = TestServer::start().await;
    let (access, refresh) = server.register_and_login("drist").await;

    server
        .rpc
        .call(LOGOUT, json!({}), Some(&access))
        .await
        .unwrap();

    // The presented access token is dead.
    let resp = server
        .client
        .get(format!("{}/v1/users", server.http))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // And so is its paired refresh token.
    let err = server
        .rpc
        .call(VERIFY_TOKEN, json!({"access_token": refresh}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unauthenticated(_)));

    server.stop().await;
}

#[tokio::test]
async fn test_rotation_swaps_the_pair_and_is_single_use() {
    let server = TestServer::start().await;
    let (old_access, old_refresh) = server.register_and_login("drist").await;

    // Rotate over the HTTP face.
    let resp = server
        .client
        .post(format!("{}/v1/auth/refresh", server.http))
        .json(&json!({"refresh_token": old_refresh}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let new_pair: Value = resp.json().await.unwrap();
    let new_access = new_pair["access_token"].as_str().unwrap();

    // Old pair is fully revoked.
    for token in [&old_access, &old_refresh] {
        let err = server
            .rpc
            .call(VERIFY_TOKEN, json!({"access_token": token}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated(_)));
    }

    // New pair works.
    server
        .rpc
        .call(LIST_USERS, json!({}), Some(new_access))
        .await
        .unwrap();

    // A second rotation with the same refresh token fails.
    let resp = server
        .client
        .post(format!("{}/v1/auth/refresh", server.http))
        .json(&json!({"refresh_token": old_refresh}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    server.stop().await;
}

// ---------------------------------------------------------------------------
// Error parity across faces
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_title_reports_same_error_on_both_faces() {
    let server = TestServer::start().await;
    let (access, _refresh) = server.register_and_login("drist").await;

    // RPC face.
    let rpc_err = server
        .rpc
        .call(CREATE_ISSUE, json!({"title": ""}), Some(&access))
        .await
        .unwrap_err();
    let rpc_body = rpc_err.to_body();
    assert_eq!(rpc_body.status, 400);
    assert_eq!(rpc_body.fields.as_ref().unwrap()["title"], "required");

    // HTTP face.
    let resp = server
        .client
        .post(format!("{}/v1/issues", server.http))
        .bearer_auth(&access)
        .json(&json!({"title": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let http_body: Value = resp.json().await.unwrap();

    // Same class, same message, same field detail.
    assert_eq!(http_body["status"], rpc_body.status);
    assert_eq!(http_body["message"], rpc_body.message);
    assert_eq!(http_body["fields"]["title"], "required");

    server.stop().await;
}

#[tokio::test]
async fn test_crud_round_trip_through_both_faces() {
    let server = TestServer::start().await;
    let (access, _refresh) = server.register_and_login("drist").await;

    // Create over HTTP.
    let resp = server
        .client
        .post(format!("{}/v1/issues", server.http))
        .bearer_auth(&access)
        .json(&json!({"title": "fix login", "description": "401 on submit"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let created: Value = resp.json().await.unwrap();
    let uuid = created["uuid"].as_str().unwrap();

    // Read it back over RPC.
    let fetched = server
        .rpc
        .call(GET_ISSUE, json!({"uuid": uuid}), Some(&access))
        .await
        .unwrap();
    assert_eq!(fetched["title"], "fix login");

    // And list it over HTTP with pagination params.
    let resp = server
        .client
        .get(format!("{}/v1/issues?offset=0&limit=5", server.http))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    let listed: Value = resp.json().await.unwrap();
    assert_eq!(listed["total_count"], 1);
    assert_eq!(listed["limit"], 5);

    server.stop().await;
}

// ---------------------------------------------------------------------------
// Panic recovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_panic_surfaces_as_internal_and_server_survives() {
    let server = TestServer::start().await;

    // RPC face.
    let err = server.rpc.call(CHAOS, json!({}), None).await.unwrap_err();
    assert!(matches!(err, GatewayError::Internal(_)));
    // The panic message must not leak to the caller.
    assert!(!err.to_string().contains("exploded"));

    // HTTP face.
    let resp = server
        .client
        .post(format!("{}/v1/chaos", server.http))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 500);

    // The process is still serving.
    let err = server
        .rpc
        .call(LOGIN, json!({"username": "ghost", "password": "x"}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));

    server.stop().await;
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_cancellation_shuts_both_faces_down_cleanly() {
    let server = TestServer::start().await;

    // Both faces alive.
    server
        .rpc
        .call(VERIFY_TOKEN, json!({"access_token": "junk"}), None)
        .await
        .unwrap_err();

    let http = server.http.clone();
    let client = server.client.clone();
    server.stop().await;

    // After shutdown the HTTP face refuses connections.
    assert!(client
        .get(format!("{}/v1/users", http))
        .send()
        .await
        .is_err());
}
