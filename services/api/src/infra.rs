use arda_credit::audit::{AuditDispatcher, KafkaAuditPublisher};
use arda_credit::config::AppConfig;
use arda_credit::credit::{CreditService, ScoringEngine};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) service_name: Arc<str>,
}

/// Wires the scoring engine and the Kafka-backed audit dispatcher.
pub(crate) fn build_credit_service(config: &AppConfig) -> Arc<CreditService> {
    let engine = ScoringEngine::seeded(config.scoring.seed);
    let publisher = Arc::new(KafkaAuditPublisher::new(&config.audit));
    let dispatcher = AuditDispatcher::spawn(publisher, &config.audit);
    Arc::new(CreditService::new(engine, dispatcher))
}
