// crates/trackd-services/src/lib.rs
//
// trackd-services: Domain modules for trackd.
//
// Each module owns one domain object end to end: repository trait plus
// in-memory implementation, service layer with validation, and a
// controller that attaches the same handlers to both protocol faces.
// The other domain objects of the tracker (roles, workspaces, cycles,
// sprints, tasks) are stamped from the same shape as issues.

pub mod issues;
pub mod users;
