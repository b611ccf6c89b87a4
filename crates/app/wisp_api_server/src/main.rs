//! Wisp API server binary.
//!
//! Reads configuration from the environment (and `.env`), runs migrations,
//! bootstraps the admin account and serves the HTTP API until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wisp_api::config::ApiConfig;
use wisp_core::auth::jwt::TokenIssuer;
use wisp_core::auth::memory::{MemoryCredentialStore, MemoryRevocationStore};
use wisp_core::auth::queries::PgCredentialStore;
use wisp_core::auth::revocation::RedisRevocationStore;
use wisp_core::auth::session::{AdminBootstrapOutcome, SessionService};
use wisp_core::auth::store::{CredentialStore, RevocationStore};
use wisp_core::context::RequestContext;

/// CLI arguments for the API server. Everything else comes from the environment.
#[derive(Parser, Debug)]
#[command(name = "wisp_api_server", about = "Wisp authentication API server")]
struct Args {
    /// Override the port of `BIND_ADDR` (0 = ephemeral).
    #[arg(long)]
    port: Option<u16>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Keep users and revocations in process memory instead of Postgres/Redis.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,wisp_api=debug,wisp_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(port) = args.port {
        config.bind_addr = with_port(&config.bind_addr, port);
    }

    info!(bind_addr = %config.bind_addr, in_memory = args.in_memory, "starting wisp_api_server");

    let issuer = TokenIssuer::new(config.tokens.clone())?;

    let (credentials, pool): (Arc<dyn CredentialStore>, Option<PgPool>) = if args.in_memory {
        warn!("--in-memory set, users are lost on exit");
        (Arc::new(MemoryCredentialStore::new()), None)
    } else {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;

        info!("running database migrations");
        wisp_core::migrate::migrate(&pool).await?;

        (Arc::new(PgCredentialStore::new(pool.clone())), Some(pool))
    };

    let revocations: Arc<dyn RevocationStore> = match config.redis_url.as_deref() {
        Some(url) if !args.in_memory => Arc::new(RedisRevocationStore::connect(url).await?),
        _ => {
            warn!("REDIS_URL not set, revoked tokens are tracked in memory only");
            Arc::new(MemoryRevocationStore::new())
        }
    };

    let sessions = SessionService::new(credentials, revocations, issuer);

    match sessions
        .ensure_admin_exists(&RequestContext::background(), &config.admin)
        .await
    {
        Ok(AdminBootstrapOutcome::Created) => info!("admin bootstrap complete"),
        Ok(_) => {}
        Err(e) => error!(error = %e, "admin bootstrap failed"),
    }

    let app = wisp_api::router(wisp_api::AppState {
        sessions,
        config: config.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        }
    });

    let exited_early = tokio::select! {
        () = shutdown_signal() => None,
        res = &mut server => Some(res),
    };

    let result = match exited_early {
        Some(res) => {
            error!("server exited before a shutdown signal");
            res
        }
        None => {
            info!(timeout = ?config.shutdown_timeout, "shutting down");
            shutdown.cancel();
            within(config.shutdown_timeout, &mut server)
                .await
                .unwrap_or_else(|| {
                    warn!("in-flight requests still running at shutdown timeout");
                    Ok(Ok(()))
                })
        }
    };

    if let Some(pool) = pool {
        if within(config.shutdown_timeout, pool.close()).await.is_none() {
            warn!("database pool did not close within the shutdown timeout");
        }
    }
    info!("server stopped");

    result??;
    Ok(())
}

/// Await `fut` for at most `timeout`. Work behind it is not cancelled.
async fn within<F: Future>(timeout: Duration, fut: F) -> Option<F::Output> {
    tokio::time::timeout(timeout, fut).await.ok()
}

/// Replace the port in a `host:port` address.
fn with_port(bind_addr: &str, port: u16) -> String {
    let host = bind_addr
        .rsplit_once(':')
        .map_or(bind_addr, |(host, _)| host);
    format!("{host}:{port}")
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C"),
        () = terminate => info!("received SIGTERM"),
    }
}
