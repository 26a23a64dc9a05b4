use crate::cli::ServeArgs;
use crate::infra::{build_services, AppState, LoggingEventPublisher};
use crate::routes::with_funnel_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use signup_funnel::config::AppConfig;
use signup_funnel::error::AppError;
use signup_funnel::telemetry;
use signup_funnel::workflows::funnel::ScoreCalculator;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let scoring = config.scoring.load()?;
    info!(
        weights = ?config.scoring.weights_path,
        "scoring weights loaded"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let publisher = Arc::new(LoggingEventPublisher::default());
    let (waitlist, leads) = build_services(ScoreCalculator::new(scoring), publisher);

    let app = with_funnel_routes(waitlist, leads)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "signup funnel service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
