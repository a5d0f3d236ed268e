use cablebill_service::{
    build_router,
    config::{BillingConfig, CacheBackend, StoreBackend},
    services::{
        CredentialStore, InMemoryStore, LedgerService, LedgerStore, MemoryCache, MongoStore,
        NoopCache, ReadCache, Reconciler, RedisCache, TokenService,
    },
    utils::PasswordHasherConfig,
    AppState,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = BillingConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    cablebill_service::services::metrics::init_metrics()?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting cable billing service"
    );

    let store: Arc<dyn LedgerStore> = match config.store.backend {
        StoreBackend::Mongo => {
            let mongo = MongoStore::connect(&config.store.mongodb)
                .await
                .map_err(|e| AppError::DatabaseError(e.into()))?;
            mongo
                .initialize_indexes()
                .await
                .map_err(|e| AppError::DatabaseError(e.into()))?;
            tracing::info!("Database initialized successfully");
            Arc::new(mongo)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let cache: Arc<dyn ReadCache> = match config.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::Redis => Arc::new(RedisCache::new(&config.cache.redis_url).await?),
        CacheBackend::Disabled => Arc::new(NoopCache),
    };
    tracing::info!(backend = ?config.cache.backend, "Read cache initialized");

    let jwt = TokenService::new(&config.jwt);
    let hasher = PasswordHasherConfig::new(&config.password)?;

    // Initialize rate limiters using shared logic
    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let forgot_password_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.forgot_password_attempts,
        config.rate_limit.forgot_password_window_seconds,
    );
    let submit_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.submit_attempts,
        config.rate_limit.submit_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login, Forgot Password, Payment Request Submit");

    if config.security.setup_enabled {
        tracing::warn!("Admin setup endpoint is enabled");
    }

    let state = AppState {
        config: config.clone(),
        credentials: CredentialStore::new(store.clone(), hasher),
        ledger: LedgerService::new(store.clone()),
        reconciler: Reconciler::new(store.clone()),
        store,
        cache,
        jwt,
        login_rate_limiter,
        forgot_password_rate_limiter,
        submit_rate_limiter,
    };

    let app = build_router(state)?;
    let addr = config.common.socket_addr()?;

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
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
