// crates/trackd-gateway/src/server.rs
//
// Dual-protocol server lifecycle.
//
// `Gateway::bind` binds both listeners (port 0 is honored, so tests can
// use ephemeral ports); `BoundGateway::serve` builds the middleware
// chain and the method table from the registry, starts the RPC server
// and the HTTP/JSON server, and blocks until the shutdown token fires.
// On shutdown the HTTP server gets a bounded grace window to drain
// in-flight requests, then the RPC listener is closed; the first
// shutdown error encountered is returned.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tower_http::cors::CorsLayer;

use trackd_core::error::GatewayError;

use crate::client::RpcClient;
use crate::middleware::{build_chain, StreamHandler};
use crate::registry::Registry;
use crate::rest::RestState;
use crate::rpc::{MethodTable, RpcService};

/// Listen configuration for both faces.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port for the RPC server.
    pub grpc_port: u16,
    /// Port for the HTTP/JSON server.
    pub http_port: u16,
    /// Grace window the HTTP server gets to drain in-flight requests
    /// on shutdown.
    pub http_grace: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            grpc_port: 9090,
            http_port: 8089,
            http_grace: Duration::from_secs(5),
        }
    }
}

/// The dual-protocol server, before binding.
pub struct Gateway {
    registry: Arc<Registry>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(registry: Arc<Registry>, config: GatewayConfig) -> Self {
        Self { registry, config }
    }

    /// Bind both listeners. Separated from `serve` so callers can learn
    /// the actual addresses before traffic starts.
    pub async fn bind(self) -> std::io::Result<BoundGateway> {
        let grpc_listener =
            TcpListener::bind((self.config.host.as_str(), self.config.grpc_port)).await?;
        let http_listener =
            TcpListener::bind((self.config.host.as_str(), self.config.http_port)).await?;
        let grpc_addr = grpc_listener.local_addr()?;
        let http_addr = http_listener.local_addr()?;

        Ok(BoundGateway {
            registry: self.registry,
            http_grace: self.config.http_grace,
            grpc_listener,
            http_listener,
            grpc_addr,
            http_addr,
        })
    }
}

/// A gateway with both listeners bound, ready to serve.
pub struct BoundGateway {
    registry: Arc<Registry>,
    http_grace: Duration,
    grpc_listener: TcpListener,
    http_listener: TcpListener,
    grpc_addr: SocketAddr,
    http_addr: SocketAddr,
}

impl BoundGateway {
    pub fn grpc_addr(&self) -> SocketAddr {
        self.grpc_addr
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Serve both faces until `shutdown` is cancelled.
    pub async fn serve(
        self,
        shutdown: CancellationToken,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let controllers = self.registry.controllers();

        // Terminal stage: every registered controller attaches its RPC
        // handlers, then the table becomes the dispatch handler.
        let mut methods = MethodTable::new();
        for controller in &controllers {
            controller.register_rpc(&mut methods);
        }

        // No controller ships streaming methods; the stream side of the
        // chain terminates in an unknown-method error.
        let stream_terminal: StreamHandler = Arc::new(|_ctx, call| {
            Box::pin(async move {
                Err(GatewayError::not_found(format!(
                    "unknown stream method {}",
                    call.method
                )))
            })
        });

        let (unary, _stream) = build_chain(
            &self.registry.interceptors(),
            methods.into_terminal(),
            stream_terminal,
        );

        // RPC face. It shuts down last, so it listens on its own token
        // rather than the root one.
        let rpc_stop = CancellationToken::new();
        let rpc_task = tokio::spawn({
            let stop = rpc_stop.clone();
            let incoming = TcpListenerStream::new(self.grpc_listener);
            let service = RpcService::new(unary);
            async move {
                Server::builder()
                    .accept_http1(true)
                    .add_service(service)
                    .serve_with_incoming_shutdown(incoming, stop.cancelled_owned())
                    .await
            }
        });
        tracing::info!(address = %self.grpc_addr, "rpc server listening");

        // HTTP face: a transcoding client of the RPC server just
        // started, dialed over loopback.
        let state = RestState {
            rpc: RpcClient::new(format!("http://{}", self.grpc_addr)),
        };
        let mut router = Router::new();
        for controller in &controllers {
            router = controller.register_rest(router);
        }
        let router = router.layer(CorsLayer::permissive()).with_state(state);

        let mut http_task = tokio::spawn(
            axum::serve(self.http_listener, router)
                .with_graceful_shutdown(shutdown.clone().cancelled_owned())
                .into_future(),
        );
        tracing::info!(address = %self.http_addr, "http server listening");

        shutdown.cancelled().await;
        tracing::info!("shutdown requested, draining http server");

        let mut first_error: Option<Box<dyn std::error::Error + Send + Sync>> = None;

        match tokio::time::timeout(self.http_grace, &mut http_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => first_error = Some(e.into()),
            Ok(Err(join_err)) => first_error = Some(join_err.into()),
            Err(_) => {
                tracing::warn!("http server did not drain within grace period, aborting");
                http_task.abort();
            }
        }

        // Close the RPC listener unconditionally; in-flight RPCs past
        // the grace window are aborted with it.
        rpc_stop.cancel();
        match rpc_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if first_error.is_none() {
                    first_error = Some(e.into());
                }
            }
            Err(join_err) => {
                if first_error.is_none() {
                    first_error = Some(join_err.into());
                }
            }
        }

        tracing::info!("gateway shut down");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
