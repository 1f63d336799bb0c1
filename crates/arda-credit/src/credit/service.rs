use tracing::debug;

use crate::audit::{AuditDispatcher, DispatchOutcome};

use super::domain::{ApplicationError, CreditApplication, CreditDecision};
use super::scoring::ScoringEngine;

/// Service composing the scoring engine with the audit dispatcher.
#[derive(Debug)]
pub struct CreditService {
    engine: ScoringEngine,
    audit: AuditDispatcher,
}

impl CreditService {
    pub fn new(engine: ScoringEngine, audit: AuditDispatcher) -> Self {
        Self { engine, audit }
    }

    /// Validate and score an application, then queue its audit event.
    ///
    /// The audit hand-off never blocks and its outcome does not affect the
    /// returned decision. Invalid applications are neither scored nor audited.
    pub fn apply(&self, application: CreditApplication) -> Result<CreditDecision, ApplicationError> {
        application.validate()?;
        let decision = self.engine.score(&application);
        if self.audit.dispatch(decision.clone()) == DispatchOutcome::Dropped {
            debug!(user_id = %decision.user_id, "decision returned without audit event");
        }
        Ok(decision)
    }

    pub fn audit(&self) -> &AuditDispatcher {
        &self.audit
    }
}
