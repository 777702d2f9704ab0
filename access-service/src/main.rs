use access_service::{
    build_router,
    config::{AccessConfig, StoreBackend},
    db,
    services::{
        metrics::init_metrics, seed, CredentialStore, EmailProvider, EmailService, LogOnlyEmailService,
        MemoryStore, PgStore, SystemClock,
    },
    AppState,
};
use service_core::error::AppError;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // Load configuration - fail fast if invalid
    let config = AccessConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;
    init_metrics()?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting access service"
    );

    let store: Arc<dyn CredentialStore> = match config.store {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database).await?;
            db::run_migrations(&pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.into()))?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; all data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let email: Arc<dyn EmailProvider> = if config.email.enabled {
        Arc::new(EmailService::new(&config.email)?)
    } else {
        tracing::warn!("Email delivery disabled");
        Arc::new(LogOnlyEmailService)
    };

    seed(store.as_ref(), &config).await?;

    let addr = config.common.bind_addr();
    let state = AppState::new(config.clone(), store, email, Arc::new(SystemClock));
    let app = build_router(state);

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
