use serde::{Deserialize, Serialize};

/// Lowest score the engine will ever report.
pub const MIN_SCORE: i32 = 300;
/// Highest score the engine will ever report.
pub const MAX_SCORE: i32 = 850;
/// Scores at or above this threshold are approved.
pub const APPROVAL_THRESHOLD: i32 = 650;

pub const APPROVED_REASON: &str = "Approved based on income-to-loan ratio";
pub const DECLINED_REASON: &str = "Insufficient creditworthiness";

/// Loan application as submitted to `POST /api/v1/apply`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditApplication {
    pub user_id: String,
    pub amount: f64,
    pub income: f64,
}

impl CreditApplication {
    /// Rejects applications the scoring arithmetic cannot handle.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.user_id.trim().is_empty() {
            return Err(ApplicationError::MissingUserId);
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ApplicationError::InvalidAmount(self.amount));
        }
        if !self.income.is_finite() {
            return Err(ApplicationError::InvalidIncome(self.income));
        }
        Ok(())
    }
}

/// Scored outcome returned to the caller and published to the audit topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditDecision {
    pub user_id: String,
    pub score: i32,
    pub approved: bool,
    pub reason: String,
}

impl CreditDecision {
    /// Clamps `raw_score` into the reportable range and derives the verdict from it.
    pub fn from_score(user_id: impl Into<String>, raw_score: i64) -> Self {
        let score = raw_score.clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE)) as i32;
        let approved = score >= APPROVAL_THRESHOLD;
        Self {
            user_id: user_id.into(),
            score,
            approved,
            reason: reason_for(approved).to_string(),
        }
    }
}

pub fn reason_for(approved: bool) -> &'static str {
    if approved {
        APPROVED_REASON
    } else {
        DECLINED_REASON
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplicationError {
    #[error("user_id must not be empty")]
    MissingUserId,
    #[error("amount must be a positive number (found {0})")]
    InvalidAmount(f64),
    #[error("income must be a finite number (found {0})")]
    InvalidIncome(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(amount: f64, income: f64) -> CreditApplication {
        CreditApplication {
            user_id: "u1".to_string(),
            amount,
            income,
        }
    }

    #[test]
    fn from_score_clamps_into_range() {
        assert_eq!(CreditDecision::from_score("u1", -10_000).score, MIN_SCORE);
        assert_eq!(CreditDecision::from_score("u1", i64::MAX).score, MAX_SCORE);
        assert_eq!(CreditDecision::from_score("u1", 700).score, 700);
    }

    #[test]
    fn verdict_flips_at_threshold() {
        let below = CreditDecision::from_score("u1", 649);
        assert!(!below.approved);
        assert_eq!(below.reason, DECLINED_REASON);

        let at = CreditDecision::from_score("u1", 650);
        assert!(at.approved);
        assert_eq!(at.reason, APPROVED_REASON);
    }

    #[test]
    fn validate_rejects_zero_and_negative_amounts() {
        assert_eq!(
            application(0.0, 1000.0).validate(),
            Err(ApplicationError::InvalidAmount(0.0))
        );
        assert!(application(-5.0, 1000.0).validate().is_err());
        assert!(application(f64::NAN, 1000.0).validate().is_err());
    }

    #[test]
    fn validate_allows_zero_and_negative_income() {
        assert!(application(1000.0, 0.0).validate().is_ok());
        assert!(application(1000.0, -250.0).validate().is_ok());
    }

    #[test]
    fn validate_requires_user_id() {
        let mut app = application(1000.0, 1000.0);
        app.user_id = "   ".to_string();
        assert_eq!(app.validate(), Err(ApplicationError::MissingUserId));
    }

    #[test]
    fn decision_serializes_with_wire_field_names() {
        let decision = CreditDecision::from_score("u1", 700);
        let value = serde_json::to_value(&decision).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "user_id": "u1",
                "score": 700,
                "approved": true,
                "reason": APPROVED_REASON,
            })
        );
    }
}
