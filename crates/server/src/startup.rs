use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use configs::AppConfig;
use service::notification::SeaOrmNotificationSink;
use service::payment::HttpPaymentGateway;
use service::registration::{repo::SeaOrmRegistrationRepository, RegistrationService};

use crate::errors::StartupError;
use crate::routes::{self, ServerState};

/// How long shutdown waits for post-commit notification batches.
pub const NOTIFICATION_DRAIN_GRACE: Duration = Duration::from_secs(5);

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn load_config() -> Result<AppConfig, StartupError> {
    AppConfig::load_or_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address: {e}")))
}

/// Wire database, gateway and notification adapters into the router.
pub async fn build_app(cfg: &AppConfig) -> Result<(Router, Arc<RegistrationService>), StartupError> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await.map_err(|e| StartupError::Runtime(format!("migrations: {e}")))?;

    let gateway = HttpPaymentGateway::new(&cfg.gateway).map_err(|e| StartupError::Runtime(e.to_string()))?;
    let registration = RegistrationService::from_config(
        Arc::new(SeaOrmRegistrationRepository { db: db.clone() }),
        Arc::new(gateway),
        Arc::new(SeaOrmNotificationSink { db }),
        cfg,
    )
    .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;

    let registration = Arc::new(registration);
    let state = ServerState {
        registration: Arc::clone(&registration),
        callback_secret: cfg.gateway.callback_secret.clone(),
    };
    Ok((routes::build_router(state, build_cors()), registration))
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c handler unavailable");
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
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Serve until `shutdown` resolves, then give in-flight notification
/// batches `grace` to finish.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    app: Router,
    registration: Arc<RegistrationService>,
    shutdown: F,
    grace: Duration,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    let pending = registration.notifications_in_flight();
    if registration.drain_notifications(grace).await {
        info!(drained = pending, "notifications drained");
    } else {
        warn!(
            remaining = registration.notifications_in_flight(),
            "shutdown grace elapsed with notifications still in flight"
        );
    }
    Ok(())
}

/// Public entry: build the app and run the HTTP server until a shutdown signal
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    common::utils::logging::init_logging_from_env();

    let cfg = load_config()?;
    let (app, registration) = build_app(&cfg).await?;

    let addr = bind_addr(&cfg)?;
    info!(%addr, "starting server crate");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, app, registration, shutdown_signal(), NOTIFICATION_DRAIN_GRACE).await
}
