// ============================================================================
// Errors - Outcome Pricing Engine
// ============================================================================
//
// Every engine operation returns `Result<T, PricingError>`. Errors are raised
// where they are detected and never clamped into a "safe" value; the caller
// decides whether a failure is user-facing (bad amount, slippage) or an
// invariant violation that should halt processing (k drift, corrupt snapshot).
//
// ============================================================================

use thiserror::Error;

/// Result alias used throughout the pricing engines
pub type Result<T> = std::result::Result<T, PricingError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Invalid amount: {amount} (must be positive and finite)")]
    InvalidAmount { amount: f64 },

    #[error("Invalid outcome index {index} for a market with {num_outcomes} outcomes")]
    InvalidOutcomeIndex { index: usize, num_outcomes: usize },

    #[error("Invalid outcome count {count} (need at least 2)")]
    InvalidOutcomeCount { count: usize },

    #[error("Invalid liquidity parameter: {value}")]
    InvalidLiquidity { value: f64 },

    #[error("Invalid price: {price} (must be within (0, 1))")]
    InvalidPrice { price: f64 },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Bonding curve degenerate (discriminant {discriminant})")]
    CurveDegenerate { discriminant: f64 },

    #[error("Insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: f64, available: f64 },

    #[error("Solver did not converge after {iterations} iterations")]
    NumericalDivergence { iterations: usize },

    #[error("Invariant violated: expected {expected}, got {actual}")]
    InvariantViolation { expected: f64, actual: f64 },

    #[error("No volume was wagered on winning outcome {outcome}")]
    NoWinningVolume { outcome: usize },

    #[error("Corrupt pool snapshot: {reason}")]
    CorruptSnapshot { reason: String },
}

impl PricingError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        PricingError::CorruptSnapshot { reason: reason.into() }
    }

    /// True for errors caused by caller input rather than by pool state
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PricingError::InvalidAmount { .. }
                | PricingError::InvalidOutcomeIndex { .. }
                | PricingError::InvalidPrice { .. }
                | PricingError::InsufficientLiquidity { .. }
        )
    }
}

/// Errors from the persistence seam
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors from environment configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{var} is not a number: {value}")]
    NotANumber { var: &'static str, value: String },

    #[error("{var} must be positive, got {value}")]
    NotPositive { var: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_classification() {
        assert!(PricingError::InvalidAmount { amount: 0.0 }.is_user_facing());
        assert!(PricingError::InsufficientLiquidity { requested: 2.0, available: 1.0 }.is_user_facing());
        assert!(!PricingError::DivisionByZero.is_user_facing());
        assert!(!PricingError::InvariantViolation { expected: 1.0, actual: 2.0 }.is_user_facing());
    }

    #[test]
    fn test_display_carries_context() {
        let err = PricingError::InvalidOutcomeIndex { index: 3, num_outcomes: 2 };
        assert_eq!(err.to_string(), "Invalid outcome index 3 for a market with 2 outcomes");
    }
}
