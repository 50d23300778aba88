// ============================================================================
// Gain Projection - "what if" scenarios for a position
// ============================================================================
//
// Read-only calculators layered on the engines' price/quote operations:
//   - multiplier scenarios (2x, 5x, 10x, max) for a position
//   - expected value of a bet given the trader's own probability estimate
//   - capital needed to push an outcome's price to a target
//
// Prices here are outcome probabilities in (0, 1]; a winning share is
// worth 1.0 at resolution.
//
// ============================================================================

pub mod capital;

pub use capital::*;

use serde::{Deserialize, Serialize};

use crate::amm::{OutcomeIndex, PricingEngine};
use crate::error::{PricingError, Result};

/// Multipliers projected below the "max" (price 1.0) scenario
const SCENARIO_MULTIPLIERS: [(f64, &str, Likelihood); 3] = [
    (2.0, "2x", Likelihood::Conservative),
    (5.0, "5x", Likelihood::Realistic),
    (10.0, "10x", Likelihood::Moon),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Likelihood {
    Conservative,
    Realistic,
    Moon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainScenario {
    pub label: String,
    pub multiplier: f64,
    pub target_price: f64,
    pub profit: f64,
    pub profit_percent: f64,
    /// Percent move from the current price needed to reach the target
    pub required_price_move: f64,
    pub likelihood: Likelihood,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainProjection {
    /// Upside scenarios only, ordered by target price
    pub scenarios: Vec<GainScenario>,
    pub break_even: f64,
    pub max_gain: Option<GainScenario>,
}

fn check_price(price: f64) -> Result<f64> {
    if !price.is_finite() || price <= 0.0 || price > 1.0 {
        return Err(PricingError::InvalidPrice { price });
    }
    Ok(price)
}

fn scenario(
    label: &str,
    entry_price: f64,
    target_price: f64,
    tokens: f64,
    current_price: f64,
    likelihood: Likelihood,
) -> GainScenario {
    GainScenario {
        label: label.to_string(),
        multiplier: target_price / entry_price,
        target_price,
        profit: (target_price - entry_price) * tokens,
        profit_percent: (target_price - entry_price) / entry_price * 100.0,
        required_price_move: (target_price - current_price) / current_price * 100.0,
        likelihood,
    }
}

/// Project gains for `tokens` bought at `entry_price` with the outcome now
/// trading at `current_price`.
///
/// Scenarios whose target is not above the current price are dropped. A
/// multiplier that would push the target to 1.0 or beyond is covered by
/// the "max" scenario instead.
pub fn project_gains(entry_price: f64, tokens: f64, current_price: f64) -> Result<GainProjection> {
    let entry_price = check_price(entry_price)?;
    let current_price = check_price(current_price)?;
    if !tokens.is_finite() || tokens < 0.0 {
        return Err(PricingError::InvalidAmount { amount: tokens });
    }

    let mut scenarios: Vec<GainScenario> = SCENARIO_MULTIPLIERS
        .iter()
        .filter(|(multiplier, _, _)| entry_price * multiplier < 1.0)
        .map(|(multiplier, label, likelihood)| {
            scenario(label, entry_price, entry_price * multiplier, tokens, current_price, *likelihood)
        })
        .collect();
    scenarios.push(scenario("max", entry_price, 1.0, tokens, current_price, Likelihood::Moon));
    scenarios.retain(|s| s.target_price > current_price);

    Ok(GainProjection {
        max_gain: scenarios.last().cloned(),
        scenarios,
        break_even: entry_price,
    })
}

/// `project_gains` with the current price read from a pool snapshot
pub fn project_gains_for<P: PricingEngine>(
    pool: &P,
    outcome: OutcomeIndex,
    entry_price: f64,
    tokens: f64,
) -> Result<GainProjection> {
    let current_price = pool.price(outcome)?;
    project_gains(entry_price, tokens, current_price)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Heavily undervalued
    StrongBuy,
    Buy,
    /// Small edge
    SlightBuy,
    /// Fair price
    Neutral,
    /// Overpriced
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedValue {
    pub ev: f64,
    pub ev_percent: f64,
    pub is_positive: bool,
    pub recommendation: Recommendation,
}

/// EV of one share bought at `buy_price` that pays 1.0 with probability
/// `win_probability`: `ev = p * 1 - cost`
pub fn expected_value(buy_price: f64, win_probability: f64) -> Result<ExpectedValue> {
    let cost = check_price(buy_price)?;
    if !win_probability.is_finite() || !(0.0..=1.0).contains(&win_probability) {
        return Err(PricingError::InvalidPrice { price: win_probability });
    }

    let ev = win_probability - cost;
    let recommendation = if ev > cost * 0.5 {
        Recommendation::StrongBuy
    } else if ev > cost * 0.2 {
        Recommendation::Buy
    } else if ev > 0.0 {
        Recommendation::SlightBuy
    } else if ev > -cost * 0.2 {
        Recommendation::Neutral
    } else {
        Recommendation::Avoid
    };

    Ok(ExpectedValue {
        ev,
        ev_percent: ev / cost * 100.0,
        is_positive: ev > 0.0,
        recommendation,
    })
}
