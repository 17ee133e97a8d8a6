//! Backline service binary.
//!
//! Wires the Postgres adapters, the Mercado Pago gateway and the
//! notification pipeline together, then runs the webhook server and the
//! worker scheduler until a shutdown signal arrives.

use std::sync::Arc;

use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::EnvFilter;

use backline::adapters::http::{serve, BillingAppState};
use backline::adapters::notify::{
    DispatcherConfig, HttpNotifier, NotificationDispatcher, NotifierConfig,
};
use backline::adapters::{
    MercadoPagoConfig, MercadoPagoGateway, PostgresBillingStore, PostgresReminderLog,
    PostgresWebhookLedger,
};
use backline::application::webhook::{WebhookIngestor, WebhookVerifier};
use backline::application::workers::{
    GraceExpiryWorker, PenaltyWorker, ReminderWorker, SchedulerConfig, WorkerScheduler,
};
use backline::config::{AppConfig, ServerConfig};
use backline::domain::billing::{DunningPolicy, PenaltyPolicy};
use backline::domain::foundation::SystemClock;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("backline exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.server);
    config.validate().context("validating configuration")?;

    info!(
        environment = ?config.server.environment,
        sandbox = config.gateway.is_test_mode(),
        "configuration loaded"
    );
    if config.is_production() && config.gateway.is_test_mode() {
        tracing::warn!("production environment is running on sandbox gateway credentials");
    }

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await
        .context("connecting to postgres")?;
    info!("postgres connection established");

    if config.database.run_migrations {
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("running migrations")?;
        info!("migrations applied");
    }

    let store = Arc::new(PostgresBillingStore::new(pool.clone()));
    let ledger = Arc::new(PostgresWebhookLedger::new(pool.clone()));
    let reminder_log = Arc::new(PostgresReminderLog::new(pool));
    let clock = Arc::new(SystemClock);
    let gateway = Arc::new(MercadoPagoGateway::new(
        MercadoPagoConfig::new(config.gateway.access_token.clone())
            .with_base_url(config.gateway.api_base_url.clone())
            .with_timeout(config.gateway.timeout()),
    ));
    let notifier = Arc::new(HttpNotifier::new(NotifierConfig::new(
        config.notifications.service_url.clone(),
        config.notifications.api_key.clone(),
    )));

    let dunning = DunningPolicy {
        grace_days: config.billing.grace_period_days,
        scan_window: config.billing.failure_scan_window,
    };
    let penalty = PenaltyPolicy {
        grace_days: config.billing.penalty_grace_days,
        base_rate_bps: config.billing.penalty_base_rate_bps,
        daily_rate_bps: config.billing.penalty_daily_rate_bps,
    };

    // Webhook handling queues notifications; the dispatcher delivers them
    // off the request path.
    let (notification_tx, notification_rx) =
        mpsc::channel(config.notifications.queue_capacity);
    let dispatcher = NotificationDispatcher::new(notifier.clone()).with_config(
        DispatcherConfig::default()
            .with_max_attempts(config.notifications.max_attempts)
            .with_retry_backoff(config.notifications.retry_backoff()),
    );

    let ingestor = Arc::new(
        WebhookIngestor::new(
            WebhookVerifier::new(SecretString::new(config.gateway.webhook_secret.clone())),
            ledger.clone(),
            store.clone(),
            gateway,
            clock.clone(),
            notification_tx,
        )
        .with_dunning_policy(dunning),
    );

    let scheduler = WorkerScheduler::new(
        ReminderWorker::new(
            store.clone(),
            reminder_log.clone(),
            notifier.clone(),
            clock.clone(),
        ),
        PenaltyWorker::new(store.clone(), notifier.clone(), clock.clone())
            .with_policy(penalty)
            .with_dunning_policy(dunning),
        GraceExpiryWorker::new(store, notifier, clock.clone()),
        ledger,
        reminder_log,
        clock,
    )
    .with_config(
        SchedulerConfig::default()
            .with_reminder_interval(config.workers.reminder_interval())
            .with_penalty_interval(config.workers.penalty_interval())
            .with_grace_interval(config.workers.grace_interval())
            .with_prune_interval(config.workers.prune_interval())
            .with_retention_days(
                config.workers.ledger_retention_days,
                config.workers.reminder_retention_days,
            ),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let dispatcher_handle = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { dispatcher.run(notification_rx, shutdown).await }
    });
    let scheduler_handle = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { scheduler.run(shutdown).await }
    });

    let addr = config.server.socket_addr();
    serve(
        addr,
        BillingAppState { ingestor },
        config.server.request_timeout(),
        shutdown_rx,
    )
    .await
    .context("webhook server failed")?;

    // The dispatcher drains queued notifications before returning, so it
    // goes last.
    scheduler_handle
        .await
        .context("worker scheduler task failed")??;
    dispatcher_handle
        .await
        .context("notification dispatcher task failed")??;

    info!("backline stopped cleanly");
    Ok(())
}

fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl+c signal"),
        _ = terminate => info!("received terminate signal"),
    }
}
