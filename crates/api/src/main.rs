use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studiora_api::background;
use studiora_api::cache::Cache;
use studiora_api::config::ServerConfig;
use studiora_api::rate_limit::RateLimiter;
use studiora_api::router::build_app_router;
use studiora_api::state::AppState;
use studiora_events::{EmailConfig, EmailDelivery, EventBus, NotificationRouter};
use studiora_payments::{PaymentGateway, YooKassaClient, YooKassaConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studiora_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = studiora_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    studiora_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    studiora_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Payment gateway ---
    let payments: Option<Arc<dyn PaymentGateway>> = match YooKassaConfig::from_env() {
        Some(gateway_config) => {
            tracing::info!(api_url = %gateway_config.api_url, "Payment gateway configured");
            Some(Arc::new(YooKassaClient::new(gateway_config)) as Arc<dyn PaymentGateway>)
        }
        None => {
            tracing::warn!("YOOKASSA_SHOP_ID / YOOKASSA_SECRET_KEY not set, online payments disabled");
            None
        }
    };

    // --- Cache ---
    let cache_ttl = Duration::from_secs(config.cache_ttl_secs);
    let cache = match config.redis_url.as_deref() {
        Some(url) => match Cache::redis(url, cache_ttl).await {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, falling back to in-memory cache");
                Cache::memory(cache_ttl)
            }
        },
        None => Cache::memory(cache_ttl),
    };
    let cache = Arc::new(cache);
    tracing::info!(backend = cache.backend_name(), ttl_secs = config.cache_ttl_secs, "Cache ready");

    let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    let email = EmailConfig::from_env().map(|c| Arc::new(EmailDelivery::new(c)));
    if email.is_none() {
        tracing::info!("SMTP_HOST not set, email notifications disabled");
    }
    let notification_router = NotificationRouter::new(pool.clone(), email);
    let router_handle = tokio::spawn(notification_router.run(event_bus.subscribe()));

    // --- Background jobs ---
    let cancel = tokio_util::sync::CancellationToken::new();
    let lifecycle_handle = tokio::spawn(background::booking_lifecycle::run(
        pool.clone(),
        Arc::clone(&event_bus),
        config.booking.payment_timeout_mins,
        cancel.clone(),
    ));
    let housekeeping_handle = tokio::spawn(background::housekeeping::run(
        pool.clone(),
        Arc::clone(&rate_limiter),
        Arc::clone(&cache),
        cancel.clone(),
    ));
    tracing::info!("Background jobs started (booking lifecycle, housekeeping)");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus,
        payments,
        cache,
        rate_limiter,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Peer addresses feed the per-IP rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    cancel.cancel();
    let _ = tokio::time::timeout(grace, lifecycle_handle).await;
    let _ = tokio::time::timeout(grace, housekeeping_handle).await;
    tracing::info!("Background jobs stopped");

    // The router owned the last bus sender, so the notification router's
    // receiver is now closed and it drains what is left.
    let _ = tokio::time::timeout(grace, router_handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
