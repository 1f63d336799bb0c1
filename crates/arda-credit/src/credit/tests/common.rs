use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use serde_json::Value;

use crate::audit::{AuditDispatcher, AuditError, AuditSink};
use crate::config::AuditConfig;
use crate::credit::{CreditApplication, CreditDecision, CreditService, NoiseSource, ScoringEngine};

pub(super) fn application(user_id: &str, amount: f64, income: f64) -> CreditApplication {
    CreditApplication {
        user_id: user_id.to_string(),
        amount,
        income,
    }
}

pub(super) fn audit_config(queue_capacity: usize, workers: usize) -> AuditConfig {
    AuditConfig {
        queue_capacity,
        workers,
        publish_timeout: Duration::from_millis(200),
        ..AuditConfig::default()
    }
}

pub(super) struct FixedNoise(pub(super) i32);

impl NoiseSource for FixedNoise {
    fn draw(&self) -> i32 {
        self.0
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
pub(super) struct ScriptedNoise {
    draws: Vec<i32>,
    cursor: AtomicUsize,
}

impl ScriptedNoise {
    pub(super) fn new(draws: Vec<i32>) -> Self {
        Self {
            draws,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl NoiseSource for ScriptedNoise {
    fn draw(&self) -> i32 {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.draws[index % self.draws.len()]
    }
}

#[derive(Default)]
pub(super) struct RecordingSink {
    events: Mutex<Vec<CreditDecision>>,
}

impl RecordingSink {
    pub(super) fn events(&self) -> Vec<CreditDecision> {
        self.events.lock().expect("sink mutex poisoned").clone()
    }

    pub(super) async fn wait_for(&self, count: usize) -> Vec<CreditDecision> {
        for _ in 0..200 {
            let events = self.events();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.events()
    }
}

#[async_trait]
impl AuditSink for RecordingSink {
    async fn publish(&self, decision: &CreditDecision) -> Result<(), AuditError> {
        self.events
            .lock()
            .expect("sink mutex poisoned")
            .push(decision.clone());
        Ok(())
    }
}

pub(super) struct FailingSink;

#[async_trait]
impl AuditSink for FailingSink {
    async fn publish(&self, _decision: &CreditDecision) -> Result<(), AuditError> {
        Err(AuditError::Transport("connection refused".to_string()))
    }
}

/// Never completes, standing in for an unresponsive broker.
pub(super) struct StalledSink;

#[async_trait]
impl AuditSink for StalledSink {
    async fn publish(&self, _decision: &CreditDecision) -> Result<(), AuditError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

pub(super) fn build_service(
    noise: i32,
    sink: Arc<dyn AuditSink>,
    config: &AuditConfig,
) -> Arc<CreditService> {
    let engine = ScoringEngine::new(Box::new(FixedNoise(noise)));
    Arc::new(CreditService::new(engine, AuditDispatcher::spawn(sink, config)))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json body")
}
