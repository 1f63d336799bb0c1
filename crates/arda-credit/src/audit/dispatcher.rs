use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::AuditSink;
use crate::config::AuditConfig;
use crate::credit::CreditDecision;

/// Result of handing a decision to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Queued,
    Dropped,
}

/// Point-in-time view of the dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub queued: u64,
    pub published: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<CreditDecision>>>;

/// Bounded queue plus a fixed worker pool in front of an [`AuditSink`].
pub struct AuditDispatcher {
    sender: mpsc::Sender<CreditDecision>,
    closing: watch::Sender<bool>,
    counters: Arc<Counters>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AuditDispatcher {
    /// Starts the worker pool. Must be called from within a Tokio runtime.
    pub fn spawn(sink: Arc<dyn AuditSink>, config: &AuditConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let (closing, _) = watch::channel(false);
        let counters = Arc::new(Counters::default());

        let workers: Vec<JoinHandle<()>> = (0..config.workers.max(1))
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&sink),
                    Arc::clone(&receiver),
                    closing.subscribe(),
                    Arc::clone(&counters),
                    config.publish_timeout,
                ))
            })
            .collect();

        Self {
            sender,
            closing,
            counters,
            workers: Mutex::new(workers),
        }
    }

    /// Enqueues a decision without waiting. A full or closed queue drops the event.
    pub fn dispatch(&self, decision: CreditDecision) -> DispatchOutcome {
        match self.sender.try_send(decision) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                DispatchOutcome::Queued
            }
            Err(TrySendError::Full(decision)) => {
                self.record_drop();
                warn!(user_id = %decision.user_id, "audit queue full; dropping event");
                DispatchOutcome::Dropped
            }
            Err(TrySendError::Closed(decision)) => {
                self.record_drop();
                warn!(user_id = %decision.user_id, "audit dispatcher closed; dropping event");
                DispatchOutcome::Dropped
            }
        }
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            published: self.counters.published.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stops accepting events, lets workers drain what is buffered, then waits for them.
    pub async fn shutdown(&self) {
        self.closing.send_replace(true);
        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for worker in workers {
            if let Err(err) = worker.await {
                warn!(error = %err, "audit worker terminated abnormally");
            }
        }
    }

    fn record_drop(&self) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("audit_events_dropped_total").increment(1);
    }
}

impl std::fmt::Debug for AuditDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditDispatcher")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

async fn run_worker(
    worker: usize,
    sink: Arc<dyn AuditSink>,
    receiver: SharedReceiver,
    mut closing: watch::Receiver<bool>,
    counters: Arc<Counters>,
    timeout: Duration,
) {
    while let Some(decision) = next_event(&receiver, &mut closing).await {
        // Bound runs from when this worker takes the event, not from the request.
        match tokio::time::timeout(timeout, sink.publish(&decision)).await {
            Ok(Ok(())) => {
                counters.published.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("audit_events_published_total").increment(1);
                debug!(worker, user_id = %decision.user_id, "published audit event");
            }
            Ok(Err(err)) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("audit_events_failed_total").increment(1);
                warn!(worker, user_id = %decision.user_id, error = %err, "failed to publish audit event");
            }
            Err(_) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("audit_events_failed_total").increment(1);
                warn!(
                    worker,
                    user_id = %decision.user_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "audit publish timed out"
                );
            }
        }
    }
    debug!(worker, "audit worker stopped");
}

// Buffered events win over the closing signal so shutdown drains the queue.
async fn next_event(
    receiver: &SharedReceiver,
    closing: &mut watch::Receiver<bool>,
) -> Option<CreditDecision> {
    let mut receiver = receiver.lock().await;
    tokio::select! {
        biased;
        event = receiver.recv() => event,
        _ = closing.wait_for(|closing| *closing) => {
            receiver.close();
            receiver.try_recv().ok()
        }
    }
}
