// ============================================================================
// LMSR - Logarithmic Market Scoring Rule
// ============================================================================
//
// Cost function:   C(q) = b * ln( sum_j exp(q_j / b) )
// Price:           P(i) = exp(q_i / b) / sum_j exp(q_j / b)      (softmax)
// Buying:          find dq with C(q + dq * e_i) - C(q) = amount
//
// All exponentials go through the log-sum-exp shift (subtract max q_j / b)
// so large quantities never overflow.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::reserve_math::{self, RELATIVE_TOLERANCE};
use super::{OutcomeIndex, PricingEngine, Quote, SellResult, TradeResult};
use crate::error::{PricingError, Result};
use crate::slippage::format_odds;

/// Default liquidity parameter `b` (balanced sensitivity)
pub const DEFAULT_LIQUIDITY_PARAMETER: f64 = 100.0;

/// Absolute width of the share bracket at which bisection stops
pub const SOLVER_TOLERANCE: f64 = 1e-9;

/// Bisection steps allowed before the solve counts as diverged
pub const SOLVER_MAX_ITERATIONS: usize = 200;

/// Times the upper share bound may be doubled while bracketing the root
pub const MAX_BRACKET_EXPANSIONS: usize = 64;

/// LMSR pool over N outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmsrPool {
    /// Outcome labels, e.g. ["Alice", "Bob", "Charlie"]
    pub outcomes: Vec<String>,

    /// Outstanding shares sold for each outcome (q)
    pub quantities: Vec<f64>,

    /// Liquidity parameter b; higher means slower price movement
    pub liquidity: f64,

    /// Actual currency wagered on each outcome
    pub real_volume: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmsrOutcomeStats {
    pub name: String,
    pub price: f64,
    pub implied_odds: String,
    pub volume: f64,
    pub outstanding_shares: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmsrStats {
    pub outcomes: Vec<LmsrOutcomeStats>,
    pub total_volume: f64,
    pub liquidity: f64,
}

/// Largest scaled quantity `q_j / b`, the log-sum-exp shift
fn max_scaled(quantities: &[f64], b: f64) -> f64 {
    quantities
        .iter()
        .map(|q| q / b)
        .fold(f64::NEG_INFINITY, f64::max)
}

/// `ln(sum_j exp(q_j / b))` without overflow
fn log_sum_exp(quantities: &[f64], b: f64) -> f64 {
    let m = max_scaled(quantities, b);
    let sum: f64 = quantities.iter().map(|q| (q / b - m).exp()).sum();
    m + sum.ln()
}

/// Cost function C(q) for liquidity `b`
pub fn cost(quantities: &[f64], b: f64) -> f64 {
    b * log_sum_exp(quantities, b)
}

impl LmsrPool {
    /// Create a pool with zero outstanding shares (uniform prices)
    ///
    /// # Arguments
    /// * `outcomes` - Labels, at least two
    /// * `liquidity` - b, fixed for the pool's lifetime (try 100-1000)
    pub fn initialize(outcomes: Vec<String>, liquidity: f64) -> Result<Self> {
        if outcomes.len() < 2 {
            return Err(PricingError::InvalidOutcomeCount { count: outcomes.len() });
        }
        if !liquidity.is_finite() || liquidity <= 0.0 {
            return Err(PricingError::InvalidLiquidity { value: liquidity });
        }

        let n = outcomes.len();
        Ok(Self {
            outcomes,
            quantities: vec![0.0; n],
            liquidity,
            real_volume: vec![0.0; n],
        })
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.outcomes.len();
        if n < 2 {
            return Err(PricingError::InvalidOutcomeCount { count: n });
        }
        if self.quantities.len() != n || self.real_volume.len() != n {
            return Err(PricingError::corrupt(format!(
                "{} outcomes but {} quantities and {} volumes",
                n,
                self.quantities.len(),
                self.real_volume.len()
            )));
        }
        if !self.liquidity.is_finite() || self.liquidity <= 0.0 {
            return Err(PricingError::corrupt(format!(
                "liquidity parameter must be positive, got {}",
                self.liquidity
            )));
        }
        if self.quantities.iter().any(|q| !q.is_finite()) {
            return Err(PricingError::corrupt("quantities must be finite"));
        }
        if !reserve_math::all_non_negative(&self.real_volume) {
            return Err(PricingError::corrupt("real volume must be non-negative"));
        }
        Ok(())
    }

    fn check_outcome(&self, outcome: OutcomeIndex) -> Result<usize> {
        reserve_math::check_outcome(outcome.index(), self.outcomes.len())?;
        Ok(outcome.index())
    }

    /// C(q) of the current snapshot
    pub fn cost(&self) -> f64 {
        cost(&self.quantities, self.liquidity)
    }

    /// Currency needed to buy `shares` of outcome `i`: C(q + shares) - C(q)
    pub fn cost_to_buy(&self, outcome: OutcomeIndex, shares: f64) -> Result<f64> {
        let i = self.check_outcome(outcome)?;
        Ok(self.marginal_cost(i, shares))
    }

    fn marginal_cost(&self, i: usize, shares: f64) -> f64 {
        let mut shifted = self.quantities.clone();
        shifted[i] += shares;
        cost(&shifted, self.liquidity) - self.cost()
    }

    /// Analytic share count for `amount_in`:
    /// dq = b * ln( (exp(a/b) * S - S_{-i}) / exp(q_i/b) )
    ///    = b * ln_1p( S * expm1(a/b) / exp(q_i/b) )
    pub fn closed_form_shares(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<f64> {
        let amount_in = reserve_math::validate_amount(amount_in)?;
        let i = self.check_outcome(outcome)?;
        let b = self.liquidity;

        let m = max_scaled(&self.quantities, b);
        let sum: f64 = self.quantities.iter().map(|q| (q / b - m).exp()).sum();
        let own = (self.quantities[i] / b - m).exp();

        let ratio = sum * (amount_in / b).exp_m1() / own;
        let shares = b * ratio.ln_1p();
        if !shares.is_finite() {
            return Err(PricingError::NumericalDivergence { iterations: 0 });
        }
        Ok(shares)
    }

    /// Solve C(q + dq * e_i) - C(q) = amount_in by bisection.
    ///
    /// Every price is below 1, so dq shares always cost less than dq and
    /// `amount_in` is a valid lower bound. The upper bound doubles until it
    /// brackets the root.
    fn solve_shares(&self, i: usize, amount_in: f64) -> Result<f64> {
        let excess = |shares: f64| self.marginal_cost(i, shares) - amount_in;
        let residual_tolerance = SOLVER_TOLERANCE * amount_in.max(1.0);

        let mut lo = amount_in;
        let mut hi = amount_in * 2.0;
        let mut expansions = 0;
        while excess(hi) < 0.0 {
            if expansions == MAX_BRACKET_EXPANSIONS || !hi.is_finite() {
                warn!(amount_in, expansions, "lmsr solve could not bracket root");
                return Err(PricingError::NumericalDivergence { iterations: expansions });
            }
            lo = hi;
            hi *= 2.0;
            expansions += 1;
        }

        for iteration in 0..SOLVER_MAX_ITERATIONS {
            let mid = (lo + hi) / 2.0;
            if hi - lo <= SOLVER_TOLERANCE {
                debug!(iteration, shares = mid, "lmsr solve converged");
                return Ok(mid);
            }
            // No representable midpoint left; accept only a tight residual
            if mid <= lo || mid >= hi {
                if excess(mid).abs() <= residual_tolerance {
                    debug!(iteration, shares = mid, "lmsr solve converged at float resolution");
                    return Ok(mid);
                }
                break;
            }
            if excess(mid) < 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        warn!(amount_in, outcome = i, "lmsr solve diverged");
        Err(PricingError::NumericalDivergence { iterations: SOLVER_MAX_ITERATIONS })
    }

    fn simulate_buy(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<(f64, Self)> {
        self.validate()?;
        let amount_in = reserve_math::validate_amount(amount_in)?;
        let i = self.check_outcome(outcome)?;

        let shares_out = self.solve_shares(i, amount_in)?;
        let mut new_pool = self.clone();
        new_pool.quantities[i] += shares_out;
        Ok((shares_out, new_pool))
    }

    /// Execute a bet: shares received plus the new snapshot
    pub fn execute(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<TradeResult<Self>> {
        let (shares_out, mut new_pool) = self.simulate_buy(amount_in, outcome)?;
        new_pool.real_volume[outcome.index()] += amount_in;

        info!(outcome = outcome.index(), amount_in, shares_out, "lmsr buy executed");
        Ok(TradeResult { shares_out, new_pool })
    }

    /// Sell shares back: proceeds = C(q) - C(q - shares * e_i)
    pub fn sell(&self, shares: f64, outcome: OutcomeIndex) -> Result<SellResult<Self>> {
        self.validate()?;
        let shares = reserve_math::validate_amount(shares)?;
        let i = self.check_outcome(outcome)?;

        let outstanding = self.quantities[i];
        if shares > outstanding && !reserve_math::approx_eq(shares, outstanding, RELATIVE_TOLERANCE) {
            warn!(outcome = i, shares, outstanding, "lmsr sell exceeds outstanding shares");
            return Err(PricingError::InsufficientLiquidity {
                requested: shares,
                available: outstanding,
            });
        }

        let mut new_pool = self.clone();
        new_pool.quantities[i] = (outstanding - shares).max(0.0);
        let proceeds = self.cost() - new_pool.cost();

        new_pool.real_volume[i] = reserve_math::withdraw_volume(self.real_volume[i], proceeds)
            .map_err(|e| {
                warn!(outcome = i, proceeds, wagered = self.real_volume[i], "lmsr sell rejected");
                e
            })?;

        let price_before = self.price(outcome)?;
        let price_after = new_pool.price(outcome)?;

        info!(outcome = i, shares, proceeds, "lmsr sell executed");
        Ok(SellResult {
            proceeds,
            average_price: proceeds / shares,
            price_impact: reserve_math::relative_change(price_before, price_after)?,
            new_pool,
        })
    }

    /// Payout for winning shares; real currency volume funds the pot
    pub fn try_payout(
        &self,
        shares: f64,
        outcome: OutcomeIndex,
        winning: OutcomeIndex,
    ) -> Result<f64> {
        reserve_math::winning_side_payout(&self.real_volume, shares, outcome.index(), winning.index())
    }

    pub fn pool_stats(&self) -> Result<LmsrStats> {
        let prices = self.prices()?;
        let outcomes = self
            .outcomes
            .iter()
            .enumerate()
            .map(|(i, name)| LmsrOutcomeStats {
                name: name.clone(),
                price: prices[i],
                implied_odds: format_odds(prices[i]),
                volume: self.real_volume[i],
                outstanding_shares: self.quantities[i],
            })
            .collect();

        Ok(LmsrStats {
            outcomes,
            total_volume: self.total_volume(),
            liquidity: self.liquidity,
        })
    }
}

impl PricingEngine for LmsrPool {
    fn num_outcomes(&self) -> usize {
        self.outcomes.len()
    }

    fn prices(&self) -> Result<Vec<f64>> {
        self.validate()?;
        let b = self.liquidity;
        let m = max_scaled(&self.quantities, b);
        let weights: Vec<f64> = self.quantities.iter().map(|q| (q / b - m).exp()).collect();
        // the max term is exp(0) = 1, so the sum is never zero
        reserve_math::prices(&weights)
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
        debug!(outcome = outcome.index(), amount_in, shares_out, "lmsr quote");
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
