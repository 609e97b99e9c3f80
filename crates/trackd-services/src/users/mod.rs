// crates/trackd-services/src/users/mod.rs
//
// The users domain: accounts, credentials, and the auth operations
// (login, logout, register, verify, refresh) plus plain CRUD.

pub mod api;
pub mod repository;
pub mod service;

pub use api::{register, UsersController};
pub use repository::{MemoryUserRepository, UserRepository};
pub use service::UserService;
