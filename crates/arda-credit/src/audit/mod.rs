//! Best-effort audit trail for scored applications.
//!
//! Decisions are handed to an [`AuditDispatcher`], which buffers them in a bounded
//! queue and feeds a fixed pool of workers publishing through an [`AuditSink`].
//! Delivery is at-most-once: failures and timeouts are logged and counted, never
//! retried, and never reported back to the HTTP caller.

mod balancer;
mod dispatcher;
mod kafka;

pub use balancer::LeastBytesBalancer;
pub use dispatcher::{AuditDispatcher, AuditStats, DispatchOutcome};
pub use kafka::KafkaAuditPublisher;

use async_trait::async_trait;

use crate::credit::CreditDecision;

/// Outbound transport for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    async fn publish(&self, decision: &CreditDecision) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("unable to encode audit event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("audit broker unavailable: {0}")]
    Transport(String),
    #[error("audit topic '{0}' has no partitions")]
    NoPartitions(String),
}

/// Message key and value for one decision: `user_id` bytes and the JSON document.
pub fn encode_event(decision: &CreditDecision) -> Result<(Vec<u8>, Vec<u8>), AuditError> {
    let value = serde_json::to_vec(decision)?;
    Ok((decision.user_id.as_bytes().to_vec(), value))
}
