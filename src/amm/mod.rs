// ============================================================================
// AMM Module - Outcome Pricing Engines
// ============================================================================
//
// Three interchangeable pricing models for prediction markets:
//   - cpmm: two-outcome constant product (x * y = k) with virtual reserves
//   - lmsr: N-outcome logarithmic market scoring rule
//   - bonding_curve: N-outcome virtual supply curve that graduates once
//     enough volume has traded
//
// Every engine works on an immutable snapshot. Quotes never mutate; trades
// return a fresh snapshot and leave the original untouched. Persisting and
// ordering snapshots is the caller's job.
//
// ============================================================================

pub mod bonding_curve;
pub mod cpmm;
pub mod lmsr;
pub mod reserve_math;

pub use bonding_curve::*;
pub use cpmm::*;
pub use lmsr::*;

use crate::error::{PricingError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// OUTCOME
// ============================================================================

/// Outcome index for a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutcomeIndex(pub usize);

impl OutcomeIndex {
    pub const YES: OutcomeIndex = OutcomeIndex(0);
    pub const NO: OutcomeIndex = OutcomeIndex(1);

    pub fn new(index: usize) -> Self {
        OutcomeIndex(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    /// The other side of a binary market
    pub fn opposite(&self) -> Self {
        OutcomeIndex(if self.0 == 0 { 1 } else { 0 })
    }
}

impl From<usize> for OutcomeIndex {
    fn from(index: usize) -> Self {
        OutcomeIndex(index)
    }
}

// ============================================================================
// QUOTES & TRADE RESULTS
// ============================================================================

/// Read-only preview of a buy. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Shares (or curve tokens) the buyer would receive
    pub shares_out: f64,
    /// Currency paid per share received
    pub average_price: f64,
    /// Price of the bought outcome before the trade
    pub price_before: f64,
    /// Price of the bought outcome after the trade
    pub price_after: f64,
    /// Signed fractional price change of the bought outcome
    pub price_impact: f64,
    /// Prices of every outcome after the trade
    pub new_odds: Vec<f64>,
    /// Magnitude of `price_impact`
    pub slippage: f64,
}

impl Quote {
    pub(crate) fn from_trade(
        amount_in: f64,
        shares_out: f64,
        price_before: f64,
        new_odds: Vec<f64>,
        outcome: OutcomeIndex,
    ) -> Result<Self> {
        let average_price = reserve_math::checked_div(amount_in, shares_out)?;
        let price_after = *new_odds
            .get(outcome.index())
            .ok_or(PricingError::InvalidOutcomeIndex {
                index: outcome.index(),
                num_outcomes: new_odds.len(),
            })?;
        let price_impact = price_move(price_before, price_after);

        Ok(Self {
            shares_out,
            average_price,
            price_before,
            price_after,
            price_impact,
            new_odds,
            slippage: price_impact.abs(),
        })
    }
}

/// Before/after price of one outcome for a hypothetical buy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceImpact {
    pub before: f64,
    pub after: f64,
    /// `|after - before| / before`
    pub impact: f64,
}

/// Outcome of a buy: shares received and the new snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct TradeResult<P> {
    pub shares_out: f64,
    pub new_pool: P,
}

/// Outcome of selling shares back to the pool
#[derive(Debug, Clone, PartialEq)]
pub struct SellResult<P> {
    pub proceeds: f64,
    pub average_price: f64,
    /// Signed fractional price change (negative for a sell)
    pub price_impact: f64,
    pub new_pool: P,
}

/// Fractional price change. An outcome priced at zero (an untouched bonding
/// curve outcome) has no baseline, so its move is the absolute new price.
pub(crate) fn price_move(before: f64, after: f64) -> f64 {
    if before == 0.0 {
        after
    } else {
        (after - before) / before
    }
}

// ============================================================================
// ENGINE SEAM
// ============================================================================

/// Operations common to every pricing model
pub trait PricingEngine {
    fn num_outcomes(&self) -> usize;

    /// Current price of every outcome (sums to 1.0)
    fn prices(&self) -> Result<Vec<f64>>;

    fn price(&self, outcome: OutcomeIndex) -> Result<f64> {
        reserve_math::check_outcome(outcome.index(), self.num_outcomes())?;
        Ok(self.prices()?[outcome.index()])
    }

    /// Preview buying `outcome` with `amount_in` currency
    fn quote(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<Quote>;

    /// Execute a buy, returning shares received and the new snapshot
    fn buy(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<TradeResult<Self>>
    where
        Self: Sized;

    fn price_impact(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<PriceImpact> {
        let quote = self.quote(amount_in, outcome)?;
        Ok(PriceImpact {
            before: quote.price_before,
            after: quote.price_after,
            impact: quote.slippage,
        })
    }

    /// Terminal payout for `shares` of `outcome` once `winning` is known
    fn payout(&self, shares: f64, outcome: OutcomeIndex, winning: OutcomeIndex) -> Result<f64>;

    /// Currency actually wagered across all outcomes
    fn total_volume(&self) -> f64;
}

// ============================================================================
// TAGGED POOL
// ============================================================================

/// A snapshot of any pricing model, tagged so one engine's state can never
/// be fed to another engine's functions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum MarketPool {
    ConstantProduct(ConstantProductPool),
    Lmsr(LmsrPool),
    BondingCurve(BondingCurveState),
}

impl MarketPool {
    pub fn model_name(&self) -> &'static str {
        match self {
            MarketPool::ConstantProduct(_) => "constant_product",
            MarketPool::Lmsr(_) => "lmsr",
            MarketPool::BondingCurve(_) => "bonding_curve",
        }
    }
}

impl From<ConstantProductPool> for MarketPool {
    fn from(pool: ConstantProductPool) -> Self {
        MarketPool::ConstantProduct(pool)
    }
}

impl From<LmsrPool> for MarketPool {
    fn from(pool: LmsrPool) -> Self {
        MarketPool::Lmsr(pool)
    }
}

impl From<BondingCurveState> for MarketPool {
    fn from(state: BondingCurveState) -> Self {
        MarketPool::BondingCurve(state)
    }
}

impl PricingEngine for MarketPool {
    fn num_outcomes(&self) -> usize {
        match self {
            MarketPool::ConstantProduct(p) => p.num_outcomes(),
            MarketPool::Lmsr(p) => p.num_outcomes(),
            MarketPool::BondingCurve(s) => s.num_outcomes(),
        }
    }

    fn prices(&self) -> Result<Vec<f64>> {
        match self {
            MarketPool::ConstantProduct(p) => p.prices(),
            MarketPool::Lmsr(p) => p.prices(),
            MarketPool::BondingCurve(s) => s.prices(),
        }
    }

    fn quote(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<Quote> {
        match self {
            MarketPool::ConstantProduct(p) => p.quote(amount_in, outcome),
            MarketPool::Lmsr(p) => p.quote(amount_in, outcome),
            MarketPool::BondingCurve(s) => s.quote(amount_in, outcome),
        }
    }

    fn buy(&self, amount_in: f64, outcome: OutcomeIndex) -> Result<TradeResult<Self>> {
        let (shares_out, new_pool) = match self {
            MarketPool::ConstantProduct(p) => {
                let r = p.buy(amount_in, outcome)?;
                (r.shares_out, MarketPool::from(r.new_pool))
            }
            MarketPool::Lmsr(p) => {
                let r = p.buy(amount_in, outcome)?;
                (r.shares_out, MarketPool::from(r.new_pool))
            }
            MarketPool::BondingCurve(s) => {
                let r = s.buy(amount_in, outcome)?;
                (r.shares_out, MarketPool::from(r.new_pool))
            }
        };
        Ok(TradeResult { shares_out, new_pool })
    }

    fn payout(&self, shares: f64, outcome: OutcomeIndex, winning: OutcomeIndex) -> Result<f64> {
        match self {
            MarketPool::ConstantProduct(p) => p.payout(shares, outcome, winning),
            MarketPool::Lmsr(p) => p.payout(shares, outcome, winning),
            MarketPool::BondingCurve(s) => s.payout(shares, outcome, winning),
        }
    }

    fn total_volume(&self) -> f64 {
        match self {
            MarketPool::ConstantProduct(p) => p.total_volume(),
            MarketPool::Lmsr(p) => p.total_volume(),
            MarketPool::BondingCurve(s) => s.total_volume(),
        }
    }
}
