use crate::cli::ServeArgs;
use crate::infra::{in_memory_service, AppState};
use crate::routes::with_marketplace_routes;
use crate::schedule::spawn_regrade_schedule;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use installer_market::config::AppConfig;
use installer_market::error::AppError;
use installer_market::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(period) = args.regrade_interval_secs.take() {
        config.market.regrade_interval_secs = period;
        config.market.validate()?;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let marketplace_service = Arc::new(in_memory_service(&config.market));
    let regrade = spawn_regrade_schedule(
        marketplace_service.clone(),
        Duration::from_secs(config.market.regrade_interval_secs),
    );

    let app = with_marketplace_routes(marketplace_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "installer marketplace ready");

    let served = axum::serve(listener, app).await;
    regrade.abort();
    served?;
    Ok(())
}
