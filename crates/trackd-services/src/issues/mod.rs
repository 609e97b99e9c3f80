// crates/trackd-services/src/issues/mod.rs
//
// The issues domain: plain CRUD over tracked work items.

pub mod api;
pub mod repository;
pub mod service;

pub use api::{register, IssuesController};
pub use repository::{IssueRepository, MemoryIssueRepository};
pub use service::IssueService;
