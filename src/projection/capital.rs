// ============================================================================
// Capital to move a price
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::amm::{price_move, OutcomeIndex, PricingEngine};
use crate::error::{PricingError, Result};

/// Bisection stops once the bracket is narrower than this (currency units)
pub const CAPITAL_TOLERANCE: f64 = 0.01;
pub const CAPITAL_MAX_ITERATIONS: usize = 100;
/// Upper-bound doublings allowed before giving up on a target
pub const MAX_CAPITAL_EXPANSIONS: usize = 64;
/// Required capital must stay under this multiple of current volume
pub const FEASIBILITY_VOLUME_MULTIPLE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalEstimate {
    pub capital_needed: f64,
    /// Fractional move from the current price to the price actually reached
    pub price_impact: f64,
    pub feasible: bool,
}

/// Smallest buy of `outcome` (within `CAPITAL_TOLERANCE`) that lifts its
/// price to `target_price`.
///
/// A target at or below the current price needs no capital. Buy price is
/// monotonic in amount for every engine, so the search brackets the answer
/// by doubling and then bisects.
pub fn capital_for_target_price<P: PricingEngine>(
    pool: &P,
    outcome: OutcomeIndex,
    target_price: f64,
) -> Result<CapitalEstimate> {
    if !target_price.is_finite() || target_price <= 0.0 || target_price >= 1.0 {
        return Err(PricingError::InvalidPrice { price: target_price });
    }

    let current = pool.price(outcome)?;
    if target_price <= current {
        return Ok(CapitalEstimate {
            capital_needed: 0.0,
            price_impact: 0.0,
            feasible: true,
        });
    }

    let reaches = |amount: f64| -> Result<bool> {
        Ok(pool.quote(amount, outcome)?.price_after >= target_price)
    };

    let mut lo = 0.0;
    let mut hi = pool.total_volume().max(1.0);
    let mut expansions = 0;
    while !reaches(hi)? {
        if expansions == MAX_CAPITAL_EXPANSIONS {
            return Err(PricingError::NumericalDivergence { iterations: expansions });
        }
        lo = hi;
        hi *= 2.0;
        expansions += 1;
    }

    let mut iterations = 0;
    while hi - lo > CAPITAL_TOLERANCE && iterations < CAPITAL_MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        if reaches(mid)? {
            hi = mid;
        } else {
            lo = mid;
        }
        iterations += 1;
    }

    let reached = pool.quote(hi, outcome)?.price_after;
    let feasible = hi < pool.total_volume() * FEASIBILITY_VOLUME_MULTIPLE;
    debug!(
        outcome = outcome.index(),
        target_price,
        capital = hi,
        iterations,
        feasible,
        "capital for target price"
    );

    Ok(CapitalEstimate {
        capital_needed: hi,
        price_impact: price_move(current, reached),
        feasible,
    })
}
