// crates/trackd-daemon/src/main.rs
//
// Binary entrypoint for the trackd daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing,
// builds the session store and services, runs the single ordered
// registration routine, and serves both protocol faces until an
// interrupt arrives.

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use config::DaemonConfig;

use trackd_auth::tokens::TokenManager;
use trackd_gateway::registry::Registry;
use trackd_gateway::server::{Gateway, GatewayConfig};
use trackd_services::issues::{self, IssueService, MemoryIssueRepository};
use trackd_services::users::{self, MemoryUserRepository, UserService};
use trackd_store::MemoryKv;

/// trackd — project-tracking service with an RPC face and an HTTP/JSON face.
#[derive(Parser, Debug)]
#[command(name = "trackd-daemon", version, about = "trackd service daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "trackd.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Load configuration, falling back to defaults if the file is not
    // found. The warning is emitted after tracing comes up.
    let (daemon_config, config_error) = match DaemonConfig::load(&args.config) {
        Ok(cfg) => (cfg, None),
        Err(e) => (DaemonConfig::default(), Some(e.to_string())),
    };

    // RUST_LOG overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    match config_error {
        Some(e) => tracing::warn!(
            "could not load config from {}: {}. Using defaults.",
            args.config,
            e
        ),
        None => tracing::info!("loaded configuration from {}", args.config),
    }

    // ---------------------------------------------------------------
    // Shared infrastructure: session store, token manager, services.
    // ---------------------------------------------------------------
    let kv = Arc::new(MemoryKv::new());
    let tokens = Arc::new(TokenManager::new(
        &daemon_config.auth.jwt_secret,
        daemon_config.auth.access_token_life_minutes,
        daemon_config.auth.refresh_token_life_hours,
        kv,
    ));

    let user_service = Arc::new(UserService::new(Arc::new(MemoryUserRepository::new())));
    let issue_service = Arc::new(IssueService::new(Arc::new(MemoryIssueRepository::new())));

    // ---------------------------------------------------------------
    // Registration. The order of these calls is the one place module
    // wiring happens: controllers and open methods first, then the
    // auth stages (extraction before verification).
    // ---------------------------------------------------------------
    let registry = Arc::new(Registry::new());
    users::register(&registry, user_service, tokens.clone());
    issues::register(&registry, issue_service);
    trackd_auth::interceptors::register(&registry, tokens);

    let gateway_config = GatewayConfig {
        host: daemon_config.server.host.clone(),
        grpc_port: daemon_config.server.grpc_port,
        http_port: daemon_config.server.http_port,
        http_grace: Duration::from_secs(daemon_config.server.http_grace_secs),
    };

    let bound = Gateway::new(registry, gateway_config).bind().await?;
    tracing::info!(
        rpc = %bound.grpc_addr(),
        http = %bound.http_addr(),
        "trackd daemon starting"
    );

    // Ctrl-C cancels the root token; serve handles the ordered
    // shutdown of both faces.
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        }
    });

    bound.serve(shutdown).await?;
    tracing::info!("trackd daemon shut down gracefully");

    Ok(())
}
