use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transita_api::metrics::Metrics;
use transita_api::{app, AppState};
use transita_booking::{BookingCoordinator, PaymentReconciler, ProviderRegistry, SeatLockManager};
use transita_core::{LeaseStore, ReservationLedger};
use transita_store::{app_config::Config, DbClient, PgReservationLedger, RedisClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transita_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Transita API on port {}", config.server.port);

    let redis = Arc::new(
        RedisClient::new(&config.redis.url)
            .await
            .context("Failed to connect to Redis")?,
    );

    let db = DbClient::new(&config.database.url)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let cache: Arc<dyn LeaseStore> = redis;
    let ledger: Arc<dyn ReservationLedger> = Arc::new(PgReservationLedger::new(db.pool.clone()));

    let locks = Arc::new(SeatLockManager::new(
        cache.clone(),
        config.business_rules.seat_lock_seconds,
    ));
    let coordinator = Arc::new(BookingCoordinator::new(locks.clone(), ledger.clone()));

    let registry = ProviderRegistry::with_default_providers(
        &config.providers.flutterwave_secret,
        &config.providers.mtn_secret,
        &config.providers.airtel_secret,
    );
    let reconciler = Arc::new(PaymentReconciler::new(
        registry,
        ledger.clone(),
        locks.clone(),
        cache,
        config.business_rules.webhook_event_retention_seconds,
    ));

    let metrics = Arc::new(Metrics::new().context("Failed to build metrics registry")?);

    let state = AppState {
        locks,
        coordinator,
        reconciler,
        ledger,
        metrics,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind listener")?;
    axum::serve(listener, app(state))
        .await
        .context("Server error")?;

    Ok(())
}
