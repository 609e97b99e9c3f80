// crates/trackd-gateway/src/registry.rs
//
// Process-wide registries for controllers, interceptors, and open
// methods, built explicitly at startup and handed to the gateway.
//
// Registration happens before serving starts; once `Gateway::serve`
// snapshots the registries they are never consulted for writes again.
// The locks exist because registration order across modules is not
// guaranteed, not because serving-time writes are expected.

use std::sync::Arc;

use axum::Router;
use parking_lot::RwLock;

use crate::authz::OpenMethods;
use crate::middleware::Interceptor;
use crate::rest::RestState;
use crate::rpc::MethodTable;

/// A handler set for one domain's operations, attachable to both
/// protocol faces.
pub trait Controller: Send + Sync {
    /// Add this controller's RPC handlers to the method table.
    fn register_rpc(&self, methods: &mut MethodTable);

    /// Add this controller's HTTP routes, wired as thin transcoders
    /// over the loopback RPC client in `RestState`.
    fn register_rest(&self, router: Router<RestState>) -> Router<RestState>;
}

/// Registration target for all domain modules. Built in `main`,
/// populated by explicit ordered calls, then passed to `Gateway`.
#[derive(Default)]
pub struct Registry {
    controllers: RwLock<Vec<Arc<dyn Controller>>>,
    interceptors: RwLock<Vec<Interceptor>>,
    open_methods: Arc<OpenMethods>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_controller(&self, controller: Arc<dyn Controller>) {
        self.controllers.write().push(controller);
    }

    pub fn register_interceptor(&self, interceptor: Interceptor) {
        self.interceptors.write().push(interceptor);
    }

    /// Mark a method as callable without a credential.
    pub fn mark_open(&self, method: &str) {
        self.open_methods.mark_open(method);
    }

    /// Shared handle to the authorization map, for the auth stages.
    pub fn open_methods(&self) -> Arc<OpenMethods> {
        self.open_methods.clone()
    }

    /// Snapshot of registered controllers, in registration order.
    pub fn controllers(&self) -> Vec<Arc<dyn Controller>> {
        self.controllers.read().clone()
    }

    /// Snapshot of registered interceptors, in registration order.
    pub fn interceptors(&self) -> Vec<Interceptor> {
        self.interceptors.read().clone()
    }
}
