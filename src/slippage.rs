// ============================================================================
// Slippage Guard - bet sizing against price impact
// ============================================================================
//
// Read-only helpers the UI layer uses to warn before a bet is placed:
// impact severity tiers, a max-slippage check and suggested bet sizes.
//
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::amm::{OutcomeIndex, PricingEngine};
use crate::error::Result;

/// Below 1% impact: no warning
pub const IMPACT_LOW: f64 = 0.01;
/// Below 5%: yellow warning
pub const IMPACT_MEDIUM: f64 = 0.05;
/// Below 10%: orange warning; above it suggest a smaller bet
pub const IMPACT_HIGH: f64 = 0.10;

/// Default maximum slippage a bet may cause, in percent
pub const DEFAULT_MAX_SLIPPAGE_PERCENT: f64 = 10.0;

/// Bet ladder offered when a market has no volume yet
pub const STARTER_BET_SIZES: [f64; 4] = [0.01, 0.1, 0.5, 1.0];

/// Fractions of current volume used for suggested bet sizes
const RECOMMENDED_VOLUME_FRACTIONS: [f64; 3] = [0.01, 0.05, 0.10];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactSeverity {
    Low,
    Medium,
    High,
    Extreme,
}

impl ImpactSeverity {
    /// Classify a fractional price impact (0.03 = 3%)
    pub fn from_impact(impact: f64) -> Self {
        let impact = impact.abs();
        if impact < IMPACT_LOW {
            ImpactSeverity::Low
        } else if impact < IMPACT_MEDIUM {
            ImpactSeverity::Medium
        } else if impact < IMPACT_HIGH {
            ImpactSeverity::High
        } else {
            ImpactSeverity::Extreme
        }
    }
}

/// Outcome of a pre-trade slippage check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSizeCheck {
    pub valid: bool,
    pub reason: Option<String>,
    pub price_impact: f64,
    pub severity: ImpactSeverity,
}

/// Check whether `amount` on `outcome` stays within `max_slippage_percent`
pub fn validate_bet_size<P: PricingEngine>(
    pool: &P,
    amount: f64,
    outcome: OutcomeIndex,
    max_slippage_percent: f64,
) -> Result<BetSizeCheck> {
    let impact = pool.price_impact(amount, outcome)?.impact;
    let impact_percent = impact * 100.0;
    let severity = ImpactSeverity::from_impact(impact);

    if impact_percent > max_slippage_percent {
        return Ok(BetSizeCheck {
            valid: false,
            reason: Some(format!(
                "Price impact too high ({:.1}%). Max allowed: {}%",
                impact_percent, max_slippage_percent
            )),
            price_impact: impact,
            severity,
        });
    }

    Ok(BetSizeCheck {
        valid: true,
        reason: None,
        price_impact: impact,
        severity,
    })
}

/// Suggested bet sizes at 1%, 5% and 10% of current volume
pub fn recommended_bet_sizes<P: PricingEngine>(pool: &P) -> Vec<f64> {
    let total = pool.total_volume();
    let sizes: Vec<f64> = RECOMMENDED_VOLUME_FRACTIONS
        .iter()
        .map(|f| total * f)
        .filter(|size| *size > 0.0)
        .collect();

    if sizes.is_empty() || sizes[0] < STARTER_BET_SIZES[0] {
        return STARTER_BET_SIZES.to_vec();
    }
    sizes
}

/// Format a probability as a percentage, e.g. 0.5 → "50.0%"
pub fn format_odds(odds: f64) -> String {
    format!("{:.1}%", odds * 100.0)
}

/// Format a fractional price impact with its sign, e.g. 0.0123 → "+1.23%"
pub fn format_price_impact(impact: f64) -> String {
    let percent = impact * 100.0;
    let sign = if percent >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amm::ConstantProductPool;

    #[test]
    fn test_severity_tiers() {
        assert_eq!(ImpactSeverity::from_impact(0.005), ImpactSeverity::Low);
        assert_eq!(ImpactSeverity::from_impact(0.03), ImpactSeverity::Medium);
        assert_eq!(ImpactSeverity::from_impact(-0.07), ImpactSeverity::High);
        assert_eq!(ImpactSeverity::from_impact(0.25), ImpactSeverity::Extreme);
    }

    #[test]
    fn test_validate_bet_size() {
        let pool = ConstantProductPool::initialize(1000.0).unwrap();

        let small = validate_bet_size(&pool, 1.0, OutcomeIndex::YES, 10.0).unwrap();
        assert!(small.valid);
        assert_eq!(small.severity, ImpactSeverity::Low);

        let huge = validate_bet_size(&pool, 5_000.0, OutcomeIndex::YES, 10.0).unwrap();
        assert!(!huge.valid);
        assert!(huge.reason.unwrap().starts_with("Price impact too high"));
    }

    #[test]
    fn test_recommended_bet_sizes() {
        let pool = ConstantProductPool::initialize(50.0).unwrap();
        assert_eq!(recommended_bet_sizes(&pool), STARTER_BET_SIZES.to_vec());

        let traded = pool.execute(200.0, OutcomeIndex::NO).unwrap().new_pool;
        let sizes = recommended_bet_sizes(&traded);
        assert_eq!(sizes.len(), 3);
        assert!((sizes[0] - 2.0).abs() < 1e-12);
        assert!((sizes[2] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_odds(0.5), "50.0%");
        assert_eq!(format_price_impact(0.0123), "+1.23%");
        assert_eq!(format_price_impact(-0.05), "-5.00%");
    }
}
