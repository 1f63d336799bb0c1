use crate::cli::ServeArgs;
use crate::infra::{build_credit_service, AppState};
use crate::routes::with_credit_routes;
use arda_credit::config::AppConfig;
use arda_credit::error::AppError;
use arda_credit::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        service_name: Arc::from(config.service_name.as_str()),
    };

    let credit_service = build_credit_service(&config);

    let app = with_credit_routes(credit_service.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        brokers = ?config.audit.brokers,
        topic = %config.audit.topic,
        "{} running",
        config.service_name
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    info!("draining audit queue");
    credit_service.audit().shutdown().await;
    let stats = credit_service.audit().stats();
    info!(
        published = stats.published,
        failed = stats.failed,
        dropped = stats.dropped,
        "shutdown complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(err) => {
            error!("unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
