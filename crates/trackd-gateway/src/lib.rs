// crates/trackd-gateway/src/lib.rs
//
// trackd-gateway: The dual-protocol gateway for trackd.
//
// One tonic-based RPC server and one axum HTTP/JSON server run over
// the same business handlers. The HTTP face is not a second
// implementation: every decoded HTTP request is re-issued as an RPC
// call through a loopback client, so the two faces cannot diverge in
// authorization or validation behavior. The RPC service uses JSON
// envelopes over tonic's server infrastructure rather than proto
// codegen.

pub mod authz;
pub mod client;
pub mod context;
pub mod envelope;
pub mod middleware;
pub mod pagination;
pub mod registry;
pub mod rest;
pub mod rpc;
pub mod server;

// Re-export key types for ergonomic access from downstream crates.
pub use authz::OpenMethods;
pub use client::RpcClient;
pub use context::CallContext;
pub use envelope::{bearer_from_headers, RpcCall, RpcRequest, RpcResponse};
pub use middleware::{
    Interceptor, MessageStream, StreamHandler, StreamInterceptor, UnaryHandler, UnaryInterceptor,
};
pub use registry::{Controller, Registry};
pub use rest::{forward, RestError, RestState};
pub use rpc::MethodTable;
pub use server::{Gateway, GatewayConfig};
