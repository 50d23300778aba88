// ============================================================================
// Virtual Bonding Curve - pump.fun style prediction markets
// ============================================================================
//
// No real liquidity is needed until graduation. Each outcome has a virtual
// token supply; odds are each outcome's share of the total supply.
//
// Lifecycle:  BONDING ──(total volume ≥ threshold)──▶ GRADUATED
//
// Graduation is one-way. Once a market graduates it never returns to
// BONDING, whatever later happens to its volume.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::reserve_math;
use super::{OutcomeIndex, PricingEngine, Quote, TradeResult};
use crate::error::{PricingError, Result};

/// Curve steepness K: average price rises by tokens / (2K)
pub const CURVE_STEEPNESS: f64 = 10_000.0;

/// Total volume (currency) at which a market graduates
pub const GRADUATION_THRESHOLD: f64 = 100.0;

/// Virtual supply used to price the very first purchases, before every
/// outcome holds tokens
pub const INITIAL_VIRTUAL_SUPPLY: f64 = CURVE_STEEPNESS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurveStatus {
    /// Virtual pricing, volume still below the graduation threshold
    Bonding,
    /// Threshold crossed; terminal
    Graduated,
}

impl fmt::Display for CurveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            CurveStatus::Bonding => "BONDING",
            CurveStatus::Graduated => "GRADUATED",
        };
        write!(f, "{}", status_str)
    }
}

impl Default for CurveStatus {
    fn default() -> Self {
        CurveStatus::Bonding
    }
}

/// Curve constants, fixed when the market is created
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveParams {
    pub steepness: f64,
    pub graduation_threshold: f64,
    pub initial_virtual_supply: f64,
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            steepness: CURVE_STEEPNESS,
            graduation_threshold: GRADUATION_THRESHOLD,
            initial_virtual_supply: INITIAL_VIRTUAL_SUPPLY,
        }
    }
}

impl CurveParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("steepness", self.steepness),
            ("graduation_threshold", self.graduation_threshold),
            ("initial_virtual_supply", self.initial_virtual_supply),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PricingError::corrupt(format!("{} must be positive, got {}", name, value)));
            }
        }
        Ok(())
    }
}

/// Snapshot of a bonding curve market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondingCurveState {
    pub market_id: String,

    /// Virtual tokens bought for each outcome
    pub outcome_supplies: Vec<f64>,

    /// Currency wagered on each outcome
    pub outcome_volumes: Vec<f64>,

    /// Total currency traded; drives graduation
    pub total_volume: f64,

    pub status: CurveStatus,

    #[serde(default)]
    pub params: CurveParams,
}

impl BondingCurveState {
    /// New market with default curve constants
    pub fn initialize(market_id: impl Into<String>, num_outcomes: usize) -> Result<Self> {
        Self::with_params(market_id, num_outcomes, CurveParams::default())
    }

    pub fn with_params(
        market_id: impl Into<String>,
        num_outcomes: usize,
        params: CurveParams,
    ) -> Result<Self> {
        if num_outcomes < 2 {
            return Err(PricingError::InvalidOutcomeCount { count: num_outcomes });
        }
        params.validate()?;

        Ok(Self {
            market_id: market_id.into(),
            outcome_supplies: vec![0.0; num_outcomes],
            outcome_volumes: vec![0.0; num_outcomes],
            total_volume: 0.0,
            status: CurveStatus::Bonding,
            params,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.outcome_supplies.len();
        if n < 2 {
            return Err(PricingError::InvalidOutcomeCount { count: n });
        }
        if self.outcome_volumes.len() != n {
            return Err(PricingError::corrupt(format!(
                "{} supplies but {} volumes",
                n,
                self.outcome_volumes.len()
            )));
        }
        if !reserve_math::all_non_negative(&self.outcome_supplies) {
            return Err(PricingError::corrupt("outcome supplies must be non-negative"));
        }
        if !reserve_math::all_non_negative(&self.outcome_volumes)
            || !self.total_volume.is_finite()
            || self.total_volume < 0.0
        {
            return Err(PricingError::corrupt("volume must be non-negative"));
        }
        self.params.validate()
    }

    /// Current odds: uniform until anything is bought, then supply share
    pub fn odds(&self) -> Result<Vec<f64>> {
        self.validate()?;
        let n = self.outcome_supplies.len();
        let total: f64 = self.outcome_supplies.iter().sum();
        if total == 0.0 {
            return Ok(vec![1.0 / n as f64; n]);
        }
        reserve_math::prices(&self.outcome_supplies)
    }

    /// Tokens purchasable with `amount_in`.
    ///
    /// Until every outcome holds supply the product is zero, so purchases
    /// are priced off the initial virtual supply split evenly. After that
    /// the average price is `price + t / (2K)`, giving
    /// `t² / (2K) + price * t - amount_in = 0`.
    fn tokens_out(&self, amount_in: f64, i: usize) -> Result<f64> {
        let n = self.outcome_supplies.len() as f64;
        if reserve_math::product(&self.outcome_supplies) == 0.0 {
            return Ok(amount_in * self.params.initial_virtual_supply / n);
        }

        let current_price = self.odds()?[i];
        let a = 1.0 / (2.0 * self.params.steepness);
        let b = current_price;
        let c = -amount_in;

        let discriminant = b * b - 4.0 * a * c;
        if !(discriminant >= 0.0) || !discriminant.is_finite() {
            return Err(PricingError::CurveDegenerate { discriminant });
        }

        // Positive root (-b + √D) / 2a, rationalized to 2·amount / (b + √D)
        // so small trades do not cancel catastrophically
        let tokens = -2.0 * c / (b + discriminant.sqrt());
        if !(tokens > 0.0) || !tokens.is_finite() {
            return Err(PricingError::CurveDegenerate { discriminant });
        }
        Ok(tokens)
    }

    /// Flip BONDING → GRADUATED once volume reaches the threshold.
    /// Never flips back.
    fn check_graduation(&mut self) {
        if self.status == CurveStatus::Bonding && self.total_volume >= self.params.graduation_threshold {
            self.status = CurveStatus::Graduated;
            info!(
                market_id = %self.market_id,
                total_volume = self.total_volume,
                "market graduated"
            );
        }
    }

    /// Graduation progress, 0-100
    pub fn graduation_progress(&self) -> f64 {
        (100.0 * self.total_volume / self.params.graduation_threshold).min(100.0)
    }

    /// Volume still needed before graduation
    pub fn remaining_to_graduate(&self) -> f64 {
        (self.params.graduation_threshold - self.total_volume).max(0.0)
    }

    pub fn is_graduated(&self) -> bool {
        self.status == CurveStatus::Graduated
    }

    fn check_outcome(&self, outcome: OutcomeIndex) -> Result<usize> {
        reserve_math::check_outcome(outcome.index(), self.outcome_supplies.len())?;
        Ok(outcome.index())
    }
}

impl PricingEngine for BondingCurveState {
    fn num_outcomes(&self) -> usize {
        self.outcome_supplies.len()
    }

    fn prices(&self) -> Result<Vec<f64>> {
        self.odds()
    }

    fn quote(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<Quote> {
        self.validate()?;
        let amount_in = reserve_math::validate_amount(amount_in)?;
        let i = self.check_outcome(outcome)?;

        let price_before = self.odds()?[i];
        let tokens_out = self.tokens_out(amount_in, i)?;

        let mut supplies = self.outcome_supplies.clone();
        supplies[i] += tokens_out;
        let new_odds = reserve_math::prices(&supplies)?;

        let quote = Quote::from_trade(amount_in, tokens_out, price_before, new_odds, outcome)?;
        debug!(market_id = %self.market_id, outcome = i, amount_in, tokens_out, "curve quote");
        Ok(quote)
    }

    fn buy(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<TradeResult<Self>> {
        let quote = self.quote(amount_in, outcome)?;
        let i = outcome.index();

        let mut new_state = self.clone();
        new_state.outcome_supplies[i] += quote.shares_out;
        new_state.outcome_volumes[i] += amount_in;
        new_state.total_volume += amount_in;
        new_state.check_graduation();

        info!(
            market_id = %self.market_id,
            outcome = i,
            amount_in,
            tokens_out = quote.shares_out,
            status = %new_state.status,
            "curve buy executed"
        );
        Ok(TradeResult {
            shares_out: quote.shares_out,
            new_pool: new_state,
        })
    }

    /// Winning token holders split the entire market volume:
    /// `tokens / supply[winning] * total_volume`
    fn payout(&self, tokens: f64, outcome: OutcomeIndex, winning: OutcomeIndex) -> Result<f64> {
        self.validate()?;
        let i = self.check_outcome(outcome)?;
        let w = self.check_outcome(winning)?;
        if !tokens.is_finite() || tokens < 0.0 {
            return Err(PricingError::InvalidAmount { amount: tokens });
        }
        if i != w {
            return Ok(0.0);
        }

        let winning_supply = self.outcome_supplies[w];
        if winning_supply == 0.0 {
            debug!(market_id = %self.market_id, outcome = w, "no winning supply, payout is zero");
            return Ok(0.0);
        }
        Ok(tokens / winning_supply * self.total_volume)
    }

    fn total_volume(&self) -> f64 {
        self.total_volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize() {
        let state = BondingCurveState::initialize("mkt-1", 3).unwrap();
        assert_eq!(state.outcome_supplies, vec![0.0; 3]);
        assert_eq!(state.total_volume, 0.0);
        assert_eq!(state.status, CurveStatus::Bonding);
        assert!(BondingCurveState::initialize("mkt-1", 1).is_err());
    }

    #[test]
    fn test_uniform_odds_when_empty() {
        let state = BondingCurveState::initialize("mkt-1", 4).unwrap();
        assert_eq!(state.odds().unwrap(), vec![0.25; 4]);
    }

    #[test]
    fn test_first_purchase_bootstraps() {
        let state = BondingCurveState::initialize("mkt-1", 2).unwrap();
        let quote = state.quote(1.0, OutcomeIndex(0)).unwrap();
        // 1 * 10_000 / 2
        assert_eq!(quote.shares_out, 5_000.0);
        assert_eq!(quote.new_odds, vec![1.0, 0.0]);
        assert_eq!(quote.price_before, 0.5);
    }

    #[test]
    fn test_untouched_outcome_impact_uses_zero_baseline() {
        let state = BondingCurveState::initialize("mkt-1", 2).unwrap();
        let state = state.buy(1.0, OutcomeIndex(0)).unwrap().new_pool;

        let quote = state.quote(1.0, OutcomeIndex(1)).unwrap();
        assert_eq!(quote.price_before, 0.0);
        assert!((quote.price_after - 0.5).abs() < 1e-12);
        assert_eq!(quote.price_impact, quote.price_after);
    }

    #[test]
    fn test_quadratic_solve_once_all_outcomes_have_supply() {
        let mut state = BondingCurveState::initialize("mkt-1", 2).unwrap();
        state.outcome_supplies = vec![3_000.0, 1_000.0];
        state.outcome_volumes = vec![3.0, 1.0];
        state.total_volume = 4.0;

        let amount = 2.0;
        let quote = state.quote(amount, OutcomeIndex(1)).unwrap();
        let t = quote.shares_out;
        let price = 0.25;
        // t²/(2K) + price·t = amount
        let lhs = t * t / (2.0 * CURVE_STEEPNESS) + price * t;
        assert!((lhs - amount).abs() < 1e-9);
        assert!(t > 0.0);
    }

    #[test]
    fn test_graduation_on_crossing_call() {
        let mut state = BondingCurveState::initialize("mkt-1", 2).unwrap();
        for call in 1..=10 {
            state = state.buy(10.0, OutcomeIndex(0)).unwrap().new_pool;
            if call < 10 {
                assert_eq!(state.status, CurveStatus::Bonding, "call {call}");
            }
        }
        assert_eq!(state.total_volume, 100.0);
        assert_eq!(state.status, CurveStatus::Graduated);
        assert_eq!(state.graduation_progress(), 100.0);

        // zero amount is rejected, status unchanged
        assert_eq!(
            state.buy(0.0, OutcomeIndex(0)),
            Err(PricingError::InvalidAmount { amount: 0.0 })
        );
        let after = state.buy(5.0, OutcomeIndex(1)).unwrap().new_pool;
        assert_eq!(after.status, CurveStatus::Graduated);
    }

    #[test]
    fn test_graduation_never_reverts() {
        let mut state = BondingCurveState::initialize("mkt-1", 2).unwrap();
        state = state.buy(150.0, OutcomeIndex(0)).unwrap().new_pool;
        assert!(state.is_graduated());

        // external tampering with volume does not un-graduate
        state.total_volume = 0.0;
        let next = state.buy(1.0, OutcomeIndex(1)).unwrap().new_pool;
        assert_eq!(next.status, CurveStatus::Graduated);
    }

    #[test]
    fn test_progress_and_remaining() {
        let state = BondingCurveState::initialize("mkt-1", 2).unwrap();
        let state = state.buy(25.0, OutcomeIndex(1)).unwrap().new_pool;
        assert_eq!(state.graduation_progress(), 25.0);
        assert_eq!(state.remaining_to_graduate(), 75.0);
    }

    #[test]
    fn test_payout_splits_entire_volume() {
        let state = BondingCurveState::initialize("mkt-1", 2).unwrap();
        let a = state.buy(30.0, OutcomeIndex(0)).unwrap();
        let b = a.new_pool.buy(10.0, OutcomeIndex(1)).unwrap();
        let c = b.new_pool.buy(20.0, OutcomeIndex(0)).unwrap();
        let resolved = c.new_pool;

        let first = resolved.payout(a.shares_out, OutcomeIndex(0), OutcomeIndex(0)).unwrap();
        let second = resolved.payout(c.shares_out, OutcomeIndex(0), OutcomeIndex(0)).unwrap();
        assert!((first + second - resolved.total_volume).abs() < 1e-9);
        assert_eq!(resolved.payout(b.shares_out, OutcomeIndex(1), OutcomeIndex(0)).unwrap(), 0.0);
    }

    #[test]
    fn test_payout_zero_winning_supply() {
        let state = BondingCurveState::initialize("mkt-1", 3).unwrap();
        let state = state.buy(10.0, OutcomeIndex(0)).unwrap().new_pool;
        assert_eq!(state.payout(1.0, OutcomeIndex(2), OutcomeIndex(2)).unwrap(), 0.0);
    }

    #[test]
    fn test_reads_reject_corrupt_snapshot() {
        let mut state = BondingCurveState::initialize("mkt-1", 2).unwrap();
        state.outcome_supplies = vec![-5.0, 10.0];
        state.outcome_volumes = vec![1.0, 1.0];
        state.total_volume = 2.0;

        assert!(matches!(state.odds(), Err(PricingError::CorruptSnapshot { .. })));
        assert!(matches!(state.prices(), Err(PricingError::CorruptSnapshot { .. })));
        assert!(matches!(
            state.payout(1.0, OutcomeIndex(1), OutcomeIndex(1)),
            Err(PricingError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&CurveStatus::Graduated).unwrap();
        assert_eq!(json, "\"GRADUATED\"");
    }
}
