use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::reserve_math::{self, RELATIVE_TOLERANCE};
use super::{OutcomeIndex, PricingEngine, Quote, SellResult, TradeResult};
use crate::error::{PricingError, Result};
use crate::slippage::format_odds;
use crate::units::lamports_to_amount;

// ============================================================================
// CPMM CONSTANTS
// ============================================================================

// Constant Product Market Maker (CPMM) for Prediction Markets
//
// Formula: x * y = k (constant product)
//
// For a binary market (Yes/No):
// - x = virtual YES reserve
// - y = virtual NO reserve
// - k = x * y (invariant that must be maintained)
//
// Betting on YES adds the bet to x and solves y = k / x. The shares paid
// out are the units removed from y.
//
// Price calculation:
// - Price(YES) = x / (x + y)
// - Price(NO) = y / (x + y)
// - Prices always sum to 1.0

/// Default virtual reserve per outcome (balanced sensitivity)
pub const DEFAULT_VIRTUAL_LIQUIDITY: f64 = 50.0;

/// Number of outcomes a constant product pool prices
pub const CPMM_OUTCOMES: usize = 2;

/// Constant Product Market Maker Pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantProductPool {
    /// Virtual units backing each outcome: [YES, NO]
    pub reserves: [f64; 2],

    /// The constant product (k = reserves[0] * reserves[1])
    pub k: f64,

    /// Actual currency wagered on each outcome: [YES, NO]
    pub real_volume: [f64; 2],
}

/// Display-ready pool summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantProductStats {
    pub yes_price: f64,
    pub no_price: f64,
    pub yes_implied_odds: String,
    pub no_implied_odds: String,
    pub total_volume: f64,
    pub yes_volume: f64,
    pub no_volume: f64,
    pub virtual_yes_reserve: f64,
    pub virtual_no_reserve: f64,
}

impl ConstantProductPool {
    /// Create a new pool with equal virtual reserves on both sides
    ///
    /// # Arguments
    /// * `virtual_liquidity` - Starting virtual reserve for each outcome.
    ///   20-100 gives a responsive market, 500-1000 a stable one.
    pub fn initialize(virtual_liquidity: f64) -> Result<Self> {
        if !virtual_liquidity.is_finite() || virtual_liquidity <= 0.0 {
            return Err(PricingError::InvalidLiquidity { value: virtual_liquidity });
        }

        Ok(Self {
            reserves: [virtual_liquidity; 2],
            k: virtual_liquidity * virtual_liquidity,
            real_volume: [0.0; 2],
        })
    }

    /// Build a pool from numbers already decoded off the ledger account.
    ///
    /// Wagered volume arrives in lamports. A zero `k` (never written by the
    /// program) is recomputed from the reserves.
    pub fn from_ledger_fields(
        virtual_yes_reserve: f64,
        virtual_no_reserve: f64,
        k: f64,
        yes_pool_lamports: u64,
        no_pool_lamports: u64,
    ) -> Result<Self> {
        let k = if k == 0.0 {
            virtual_yes_reserve * virtual_no_reserve
        } else {
            k
        };
        let pool = Self {
            reserves: [virtual_yes_reserve, virtual_no_reserve],
            k,
            real_volume: [
                lamports_to_amount(yes_pool_lamports),
                lamports_to_amount(no_pool_lamports),
            ],
        };
        pool.validate()?;
        Ok(pool)
    }

    /// Check the data-model invariants of a (possibly decoded) snapshot
    pub fn validate(&self) -> Result<()> {
        if !reserve_math::all_positive(&self.reserves) {
            return Err(PricingError::corrupt(format!(
                "reserves must be positive, got {:?}",
                self.reserves
            )));
        }
        if !self.k.is_finite() || self.k <= 0.0 {
            return Err(PricingError::corrupt(format!("k must be positive, got {}", self.k)));
        }
        if !reserve_math::all_non_negative(&self.real_volume) {
            return Err(PricingError::corrupt(format!(
                "real volume must be non-negative, got {:?}",
                self.real_volume
            )));
        }
        Ok(())
    }

    fn check_outcome(outcome: OutcomeIndex) -> Result<usize> {
        reserve_math::check_outcome(outcome.index(), CPMM_OUTCOMES)?;
        Ok(outcome.index())
    }

    /// Move `amount_in` into the bought side and solve the paired reserve.
    /// Volume is left untouched; quoting and executing share this step.
    fn simulate_buy(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<(f64, Self)> {
        self.validate()?;
        let amount_in = reserve_math::validate_amount(amount_in)?;
        let i = Self::check_outcome(outcome)?;
        let o = 1 - i;

        let new_reserve = self.reserves[i] + amount_in;
        let new_opposite = reserve_math::checked_div(self.k, new_reserve)?;
        let shares_out = self.reserves[o] - new_opposite;

        // An amount below the reserve's float resolution buys nothing
        let product = self.reserves[0] * self.reserves[1];
        if shares_out == 0.0 && reserve_math::approx_eq(product, self.k, RELATIVE_TOLERANCE) {
            return Err(PricingError::InvalidAmount { amount: amount_in });
        }
        // Only a snapshot whose k disagrees with its reserves can get here
        if !(shares_out > 0.0) {
            return Err(PricingError::InvariantViolation {
                expected: self.k,
                actual: self.reserves[0] * self.reserves[1],
            });
        }

        let mut new_pool = self.clone();
        new_pool.reserves[i] = new_reserve;
        new_pool.reserves[o] = new_opposite;
        Ok((shares_out, new_pool))
    }

    /// Execute a bet: shares received plus the new snapshot.
    ///
    /// The product of the new reserves must equal `k` within relative
    /// tolerance; drift beyond it is an `InvariantViolation`.
    pub fn execute(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<TradeResult<Self>> {
        let (shares_out, mut new_pool) = self.simulate_buy(amount_in, outcome)?;
        new_pool.real_volume[outcome.index()] += amount_in;

        let new_k = new_pool.reserves[0] * new_pool.reserves[1];
        if !reserve_math::approx_eq(new_k, self.k, RELATIVE_TOLERANCE) {
            warn!(expected = self.k, actual = new_k, "constant product drifted");
            return Err(PricingError::InvariantViolation { expected: self.k, actual: new_k });
        }

        info!(
            outcome = outcome.index(),
            amount_in,
            shares_out,
            "cpmm buy executed"
        );
        Ok(TradeResult { shares_out, new_pool })
    }

    /// Sell shares back to the pool (inverse of `execute`)
    ///
    /// The shares go back into the opposite reserve, this side's reserve is
    /// solved from k and the released units are paid out as currency. The
    /// proceeds can never exceed what was actually wagered on this side.
    pub fn sell(&self, shares: f64, outcome: OutcomeIndex) -> Result<SellResult<Self>> {
        self.validate()?;
        let shares = reserve_math::validate_amount(shares)?;
        let i = Self::check_outcome(outcome)?;
        let o = 1 - i;

        let new_opposite = self.reserves[o] + shares;
        let new_reserve = reserve_math::checked_div(self.k, new_opposite)?;
        let proceeds = self.reserves[i] - new_reserve;

        let remaining = reserve_math::withdraw_volume(self.real_volume[i], proceeds)
            .map_err(|e| {
                warn!(outcome = i, proceeds, wagered = self.real_volume[i], "cpmm sell rejected");
                e
            })?;

        let mut new_pool = self.clone();
        new_pool.reserves[i] = new_reserve;
        new_pool.reserves[o] = new_opposite;
        new_pool.real_volume[i] = remaining;

        let price_before = self.price(outcome)?;
        let price_after = new_pool.price(outcome)?;

        info!(outcome = i, shares, proceeds, "cpmm sell executed");
        Ok(SellResult {
            proceeds,
            average_price: proceeds / shares,
            price_impact: reserve_math::relative_change(price_before, price_after)?,
            new_pool,
        })
    }

    /// Payout for winning shares, failing with `NoWinningVolume` when
    /// nobody wagered on the winning side
    ///
    /// If YES wins: payout = shares * (total wagered / wagered on YES)
    pub fn try_payout(
        &self,
        shares: f64,
        outcome: OutcomeIndex,
        winning: OutcomeIndex,
    ) -> Result<f64> {
        self.validate()?;
        Self::check_outcome(outcome)?;
        Self::check_outcome(winning)?;
        reserve_math::winning_side_payout(&self.real_volume, shares, outcome.index(), winning.index())
    }

    /// Get pool statistics
    pub fn pool_stats(&self) -> Result<ConstantProductStats> {
        let prices = self.prices()?;
        Ok(ConstantProductStats {
            yes_price: prices[0],
            no_price: prices[1],
            yes_implied_odds: format_odds(prices[0]),
            no_implied_odds: format_odds(prices[1]),
            total_volume: self.total_volume(),
            yes_volume: self.real_volume[0],
            no_volume: self.real_volume[1],
            virtual_yes_reserve: self.reserves[0],
            virtual_no_reserve: self.reserves[1],
        })
    }
}

impl PricingEngine for ConstantProductPool {
    fn num_outcomes(&self) -> usize {
        CPMM_OUTCOMES
    }

    fn prices(&self) -> Result<Vec<f64>> {
        self.validate()?;
        reserve_math::prices(&self.reserves)
    }

    fn price(&self, outcome: OutcomeIndex) -> Result<f64> {
        self.validate()?;
        reserve_math::price(&self.reserves, outcome.index())
    }

    fn quote(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<Quote> {
        let (shares_out, new_pool) = self.simulate_buy(amount_in, outcome)?;
        let quote = Quote::from_trade(
            amount_in,
            shares_out,
            self.price(outcome)?,
            new_pool.prices()?,
            outcome,
        )?;
        debug!(outcome = outcome.index(), amount_in, shares_out, impact = quote.price_impact, "cpmm quote");
        Ok(quote)
    }

    fn buy(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<TradeResult<Self>> {
        self.execute(amount_in, outcome)
    }

    fn payout(&self, shares: f64, outcome: OutcomeIndex, winning: OutcomeIndex) -> Result<f64> {
        match self.try_payout(shares, outcome, winning) {
            Err(PricingError::NoWinningVolume { outcome }) => {
                debug!(outcome, "no volume on winning side, payout is zero");
                Ok(0.0)
            }
            other => other,
        }
    }

    fn total_volume(&self) -> f64 {
        self.real_volume.iter().sum()
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
