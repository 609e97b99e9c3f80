// crates/trackd-services/src/issues/repository.rs

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use trackd_core::entity::Issue;
use trackd_core::error::GatewayError;

#[async_trait]
pub trait IssueRepository: Send + Sync {
    async fn get(&self, uuid: &Uuid) -> Result<Issue, GatewayError>;
    async fn count(&self) -> Result<i64, GatewayError>;
    /// Page of issues in insertion order.
    async fn query(&self, offset: i64, limit: i64) -> Result<Vec<Issue>, GatewayError>;
    async fn create(&self, issue: Issue) -> Result<(), GatewayError>;
    async fn update(&self, issue: Issue) -> Result<(), GatewayError>;
    async fn delete(&self, uuid: &Uuid) -> Result<(), GatewayError>;
}

/// In-memory repository, also used by tests.
#[derive(Default)]
pub struct MemoryIssueRepository {
    issues: RwLock<Vec<Issue>>,
}

impl MemoryIssueRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IssueRepository for MemoryIssueRepository {
    async fn get(&self, uuid: &Uuid) -> Result<Issue, GatewayError> {
        let issues = self.issues.read().await;
        issues
            .iter()
            .find(|i| &i.uuid == uuid)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("issue {} not found", uuid)))
    }

    async fn count(&self) -> Result<i64, GatewayError> {
        Ok(self.issues.read().await.len() as i64)
    }

    async fn query(&self, offset: i64, limit: i64) -> Result<Vec<Issue>, GatewayError> {
        let issues = self.issues.read().await;
        Ok(issues
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn create(&self, issue: Issue) -> Result<(), GatewayError> {
        self.issues.write().await.push(issue);
        Ok(())
    }

    async fn update(&self, issue: Issue) -> Result<(), GatewayError> {
        let mut issues = self.issues.write().await;
        match issues.iter_mut().find(|i| i.uuid == issue.uuid) {
            Some(existing) => {
                *existing = issue;
                Ok(())
            }
            None => Err(GatewayError::not_found(format!(
                "issue {} not found",
                issue.uuid
            ))),
        }
    }

    async fn delete(&self, uuid: &Uuid) -> Result<(), GatewayError> {
        let mut issues = self.issues.write().await;
        let before = issues.len();
        issues.retain(|i| &i.uuid != uuid);
        if issues.len() == before {
            return Err(GatewayError::not_found(format!("issue {} not found", uuid)));
        }
        Ok(())
    }
}
