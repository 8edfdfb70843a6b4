//! SelfiNotify Server — multi-tenant push notification relay
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use selfinotify_core::config::AppConfig;
use selfinotify_core::error::AppError;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("SELFINOTIFY_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SelfiNotify v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db_pool = selfinotify_database::connection::create_pool(&config.database).await?;
    selfinotify_database::migration::run_migrations(&db_pool).await?;

    // ── Step 2: Repositories ─────────────────────────────────────
    let application_repo = Arc::new(
        selfinotify_database::repositories::ApplicationRepository::new(db_pool.clone()),
    );
    let notification_repo = Arc::new(
        selfinotify_database::repositories::NotificationRepository::new(db_pool.clone()),
    );
    let job_repo = Arc::new(selfinotify_database::repositories::JobRepository::new(
        db_pool.clone(),
    ));

    // ── Step 3: Realtime engine ──────────────────────────────────
    tracing::info!("Initializing realtime engine...");
    let realtime = Arc::new(selfinotify_realtime::server::RealtimeEngine::new(
        config.realtime.clone(),
        (*application_repo).clone(),
    ));

    // ── Step 4: Dispatch queue ───────────────────────────────────
    let queue = Arc::new(selfinotify_worker::queue::DispatchQueue::new(
        Arc::clone(&job_repo),
        config.queue.max_attempts,
    ));

    // ── Step 5: Services ─────────────────────────────────────────
    let application_service = Arc::new(selfinotify_service::ApplicationService::new(
        Arc::clone(&application_repo),
        Arc::clone(&realtime.registry),
    ));
    let notification_service = Arc::new(selfinotify_service::NotificationService::new(
        Arc::clone(&notification_repo),
        Arc::clone(&application_repo),
        Arc::clone(&queue),
        config.queue.max_attempts,
    ));

    // ── Step 6: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 7: Background worker ────────────────────────────────
    let worker_handle = if config.queue.enabled {
        tracing::info!("Starting dispatch worker...");

        let worker_id = format!("worker-{}", &uuid::Uuid::new_v4().to_string()[..8]);

        let mut job_executor = selfinotify_worker::executor::JobExecutor::new();
        job_executor.register(Arc::new(
            selfinotify_worker::jobs::NotificationDispatchHandler::new(
                Arc::clone(&realtime.registry),
                Arc::clone(&realtime.broadcaster),
                (*notification_repo).clone(),
            ),
        ));

        let runner = selfinotify_worker::WorkerRunner::new(
            Arc::clone(&queue),
            Arc::new(job_executor),
            config.queue.clone(),
            worker_id,
        );

        let worker_cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            runner.run(worker_cancel).await;
        }))
    } else {
        tracing::info!("Dispatch worker disabled");
        None
    };

    // ── Step 8: Cron scheduler ───────────────────────────────────
    let mut scheduler =
        selfinotify_worker::CronScheduler::new(Arc::clone(&queue), config.queue.clone()).await?;
    scheduler.register_default_tasks().await?;
    scheduler.start().await?;

    // ── Step 9: HTTP server ──────────────────────────────────────
    let app_state = selfinotify_api::state::AppState {
        config: Arc::new(config.clone()),
        db_pool: db_pool.clone(),
        realtime: Arc::clone(&realtime),
        queue: Arc::clone(&queue),
        application_service,
        notification_service,
    };

    let app = selfinotify_api::router::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("SelfiNotify server listening on {}", addr);

    // ── Step 10: Graceful shutdown ───────────────────────────────
    let engine = Arc::clone(&realtime);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
        engine.shutdown();
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    // ── Step 11: Wait for background tasks ───────────────────────
    tracing::info!("Waiting for background tasks to complete...");

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown error: {}", e);
    }
    if let Some(handle) = worker_handle {
        let grace = std::time::Duration::from_secs(config.queue.shutdown_grace_seconds);
        let _ = tokio::time::timeout(grace, handle).await;
    }

    tracing::info!("SelfiNotify server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
