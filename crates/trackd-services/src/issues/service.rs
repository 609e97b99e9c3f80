// crates/trackd-services/src/issues/service.rs
//
// Use-case logic for issues.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trackd_core::entity::{Issue, IssueStatus};
use trackd_core::error::GatewayError;

use super::repository::IssueRepository;

const MAX_TITLE_LEN: usize = 250;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIssueRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<IssueStatus>,
    pub estimate: Option<u64>,
    pub assignee: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateIssueRequest {
    pub uuid: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<IssueStatus>,
    pub estimate: Option<u64>,
    pub assignee: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueResponse {
    pub uuid: Uuid,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub estimate: u64,
    pub creator: Option<Uuid>,
    pub assignee: Option<Uuid>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<&Issue> for IssueResponse {
    fn from(issue: &Issue) -> Self {
        IssueResponse {
            uuid: issue.uuid,
            title: issue.title.clone(),
            description: issue.description.clone(),
            status: issue.status,
            estimate: issue.estimate,
            creator: issue.creator,
            assignee: issue.assignee,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListIssuesResponse {
    pub issues: Vec<IssueResponse>,
    pub total_count: i64,
    pub offset: i64,
    pub limit: i64,
}

fn validate_title(title: &str) -> Result<(), GatewayError> {
    let mut fields = HashMap::new();
    if title.trim().is_empty() {
        fields.insert("title".to_string(), "required".to_string());
    } else if title.len() > MAX_TITLE_LEN {
        fields.insert(
            "title".to_string(),
            format!("must be at most {} characters", MAX_TITLE_LEN),
        );
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::validation("validation failed", fields))
    }
}

/// Encapsulates use-case logic for issues.
pub struct IssueService {
    repo: Arc<dyn IssueRepository>,
}

impl IssueService {
    pub fn new(repo: Arc<dyn IssueRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, uuid: &Uuid) -> Result<IssueResponse, GatewayError> {
        let issue = self.repo.get(uuid).await?;
        Ok(IssueResponse::from(&issue))
    }

    pub async fn query(&self, offset: i64, limit: i64) -> Result<ListIssuesResponse, GatewayError> {
        let issues = self.repo.query(offset, limit).await?;
        let total_count = self.repo.count().await?;
        Ok(ListIssuesResponse {
            issues: issues.iter().map(IssueResponse::from).collect(),
            total_count,
            offset,
            limit,
        })
    }

    pub async fn create(
        &self,
        req: CreateIssueRequest,
        creator: Option<Uuid>,
    ) -> Result<IssueResponse, GatewayError> {
        validate_title(&req.title)?;
        let now = Utc::now();
        let issue = Issue {
            uuid: Uuid::now_v7(),
            title: req.title,
            description: req.description,
            status: req.status.unwrap_or_default(),
            estimate: req.estimate.unwrap_or(0),
            creator,
            assignee: req.assignee,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(issue.clone()).await?;
        Ok(IssueResponse::from(&issue))
    }

    pub async fn update(&self, req: UpdateIssueRequest) -> Result<IssueResponse, GatewayError> {
        validate_title(&req.title)?;
        let mut issue = self.repo.get(&req.uuid).await?;
        issue.title = req.title;
        issue.description = req.description;
        if let Some(status) = req.status {
            issue.status = status;
        }
        if let Some(estimate) = req.estimate {
            issue.estimate = estimate;
        }
        issue.assignee = req.assignee.or(issue.assignee);
        issue.updated_at = Utc::now();
        self.repo.update(issue.clone()).await?;
        Ok(IssueResponse::from(&issue))
    }

    pub async fn delete(&self, uuid: &Uuid) -> Result<(), GatewayError> {
        self.repo.delete(uuid).await
    }
}
