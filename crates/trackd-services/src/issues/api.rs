// crates/trackd-services/src/issues/api.rs
//
// The issues controller. Every method is protected: no open-method
// registrations here, so the auth stages demand a credential on all of
// them. The verified identity becomes the issue creator.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use trackd_core::error::GatewayError;

use trackd_gateway::context::CallContext;
use trackd_gateway::pagination::offset_and_limit;
use trackd_gateway::registry::{Controller, Registry};
use trackd_gateway::rest::{forward, RestError, RestState};
use trackd_gateway::rpc::MethodTable;

use super::service::{
    CreateIssueRequest, IssueResponse, IssueService, ListIssuesResponse, UpdateIssueRequest,
};

// Fully-qualified method names, shared by both faces.
pub const LIST_ISSUES: &str = "/issues.IssueService/ListIssues";
pub const GET_ISSUE: &str = "/issues.IssueService/GetIssue";
pub const CREATE_ISSUE: &str = "/issues.IssueService/CreateIssue";
pub const UPDATE_ISSUE: &str = "/issues.IssueService/UpdateIssue";
pub const DELETE_ISSUE: &str = "/issues.IssueService/DeleteIssue";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListIssuesRequest {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetIssueRequest {
    pub uuid: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteIssueRequest {
    pub uuid: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyResponse {}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn list_issues(
    service: Arc<IssueService>,
    _ctx: CallContext,
    req: ListIssuesRequest,
) -> Result<ListIssuesResponse, GatewayError> {
    let (offset, limit) = offset_and_limit(req.offset, req.limit);
    service.query(offset, limit).await
}

pub async fn get_issue(
    service: Arc<IssueService>,
    _ctx: CallContext,
    req: GetIssueRequest,
) -> Result<IssueResponse, GatewayError> {
    service.get(&req.uuid).await
}

pub async fn create_issue(
    service: Arc<IssueService>,
    ctx: CallContext,
    req: CreateIssueRequest,
) -> Result<IssueResponse, GatewayError> {
    let creator = ctx.identity.as_ref().map(|i| i.uuid);
    service.create(req, creator).await
}

pub async fn update_issue(
    service: Arc<IssueService>,
    _ctx: CallContext,
    req: UpdateIssueRequest,
) -> Result<IssueResponse, GatewayError> {
    service.update(req).await
}

pub async fn delete_issue(
    service: Arc<IssueService>,
    _ctx: CallContext,
    req: DeleteIssueRequest,
) -> Result<EmptyResponse, GatewayError> {
    service.delete(&req.uuid).await?;
    Ok(EmptyResponse {})
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct IssuesController {
    service: Arc<IssueService>,
}

impl IssuesController {
    pub fn new(service: Arc<IssueService>) -> Self {
        Self { service }
    }
}

impl Controller for IssuesController {
    fn register_rpc(&self, methods: &mut MethodTable) {
        {
            let service = self.service.clone();
            methods.register_unary(LIST_ISSUES, move |ctx, req: ListIssuesRequest| {
                list_issues(service.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            methods.register_unary(GET_ISSUE, move |ctx, req: GetIssueRequest| {
                get_issue(service.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            methods.register_unary(CREATE_ISSUE, move |ctx, req: CreateIssueRequest| {
                create_issue(service.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            methods.register_unary(UPDATE_ISSUE, move |ctx, req: UpdateIssueRequest| {
                update_issue(service.clone(), ctx, req)
            });
        }
        {
            let service = self.service.clone();
            methods.register_unary(DELETE_ISSUE, move |ctx, req: DeleteIssueRequest| {
                delete_issue(service.clone(), ctx, req)
            });
        }
    }

    fn register_rest(&self, router: Router<RestState>) -> Router<RestState> {
        router
            .route("/v1/issues", get(rest_list_issues).post(rest_create_issue))
            .route(
                "/v1/issues/{uuid}",
                get(rest_get_issue)
                    .put(rest_update_issue)
                    .delete(rest_delete_issue),
            )
    }
}

/// Register the issues module. All methods stay protected.
pub fn register(registry: &Registry, service: Arc<IssueService>) {
    registry.register_controller(Arc::new(IssuesController::new(service)));
}

// ---------------------------------------------------------------------------
// REST transcoders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListParams {
    offset: Option<i64>,
    limit: Option<i64>,
}

async fn rest_list_issues(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, RestError> {
    let body = json!({"offset": params.offset, "limit": params.limit});
    forward(&state, &headers, LIST_ISSUES, body).await
}

async fn rest_get_issue(
    State(state): State<RestState>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, GET_ISSUE, json!({"uuid": uuid})).await
}

async fn rest_create_issue(
    State(state): State<RestState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, CREATE_ISSUE, body).await
}

async fn rest_update_issue(
    State(state): State<RestState>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
    Json(mut body): Json<Value>,
) -> Result<Json<Value>, RestError> {
    if let Some(obj) = body.as_object_mut() {
        obj.insert("uuid".to_string(), json!(uuid));
    }
    forward(&state, &headers, UPDATE_ISSUE, body).await
}

async fn rest_delete_issue(
    State(state): State<RestState>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
) -> Result<Json<Value>, RestError> {
    forward(&state, &headers, DELETE_ISSUE, json!({"uuid": uuid})).await
}
