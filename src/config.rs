// ============================================================================
// Engine Configuration
// ============================================================================
//
// Defaults come from the pricing engines' constants. Any of them can be
// overridden through the environment (or a .env file):
//
//   PRICING_CPMM_VIRTUAL_LIQUIDITY   virtual reserve per outcome     (50)
//   PRICING_LMSR_LIQUIDITY           LMSR liquidity parameter b      (100)
//   PRICING_CURVE_STEEPNESS          bonding curve K                 (10000)
//   PRICING_GRADUATION_THRESHOLD     bonding curve graduation volume (100)
//   PRICING_MAX_SLIPPAGE_PERCENT     bet-size slippage ceiling       (10)
//
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::amm::{
    BondingCurveState, ConstantProductPool, CurveParams, LmsrPool, DEFAULT_LIQUIDITY_PARAMETER,
    DEFAULT_VIRTUAL_LIQUIDITY,
};
use crate::error::{ConfigError, Result};
use crate::slippage::DEFAULT_MAX_SLIPPAGE_PERCENT;

pub const ENV_CPMM_VIRTUAL_LIQUIDITY: &str = "PRICING_CPMM_VIRTUAL_LIQUIDITY";
pub const ENV_LMSR_LIQUIDITY: &str = "PRICING_LMSR_LIQUIDITY";
pub const ENV_CURVE_STEEPNESS: &str = "PRICING_CURVE_STEEPNESS";
pub const ENV_GRADUATION_THRESHOLD: &str = "PRICING_GRADUATION_THRESHOLD";
pub const ENV_MAX_SLIPPAGE_PERCENT: &str = "PRICING_MAX_SLIPPAGE_PERCENT";

/// Fraction of expected volume used as virtual liquidity
const RECOMMENDED_LIQUIDITY_RATIO: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    ConstantProduct,
    Lmsr,
}

impl PricingModel {
    /// Clamp bounds for recommended liquidity
    fn liquidity_bounds(&self) -> (f64, f64) {
        match self {
            PricingModel::ConstantProduct => (20.0, 1000.0),
            PricingModel::Lmsr => (50.0, 2000.0),
        }
    }
}

/// Liquidity tiers by market size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidityPreset {
    /// Under 1K volume; prices move 5-15% on typical bets
    Small,
    /// 1K-10K volume; prices move 2-8%
    Medium,
    /// 10K-100K volume; prices move 1-5%
    Large,
    /// 100K+ volume; prices move under 1%
    Mega,
}

impl LiquidityPreset {
    pub fn constant_product(&self) -> f64 {
        match self {
            LiquidityPreset::Small => 20.0,
            LiquidityPreset::Medium => 50.0,
            LiquidityPreset::Large => 200.0,
            LiquidityPreset::Mega => 1000.0,
        }
    }

    pub fn lmsr(&self) -> f64 {
        match self {
            LiquidityPreset::Small => 50.0,
            LiquidityPreset::Medium => 100.0,
            LiquidityPreset::Large => 500.0,
            LiquidityPreset::Mega => 2000.0,
        }
    }

    pub fn liquidity_for(&self, model: PricingModel) -> f64 {
        match model {
            PricingModel::ConstantProduct => self.constant_product(),
            PricingModel::Lmsr => self.lmsr(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LiquidityPreset::Small => "High sensitivity - Prices move quickly",
            LiquidityPreset::Medium => "Balanced - Good price discovery",
            LiquidityPreset::Large => "Stable - Less volatile pricing",
            LiquidityPreset::Mega => "Very stable - Institutional grade",
        }
    }
}

impl Default for LiquidityPreset {
    fn default() -> Self {
        LiquidityPreset::Medium
    }
}

/// Virtual liquidity sized at 15% of expected volume, clamped per model
pub fn recommended_liquidity(expected_volume: f64, model: PricingModel) -> f64 {
    let (min, max) = model.liquidity_bounds();
    (expected_volume * RECOMMENDED_LIQUIDITY_RATIO).round().clamp(min, max)
}

/// Recommended liquidity from a market category's typical volume
pub fn liquidity_for_category(category: &str, model: PricingModel) -> f64 {
    let expected_volume = match category {
        "Politics" => 500.0,
        "Sports" => 300.0,
        "Crypto" => 400.0,
        "Entertainment" => 200.0,
        "Science" => 100.0,
        "Other" => 50.0,
        _ => 100.0,
    };
    recommended_liquidity(expected_volume, model)
}

/// Tunables for creating pools and guarding bets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub cpmm_virtual_liquidity: f64,
    pub lmsr_liquidity: f64,
    pub curve: CurveParams,
    pub max_slippage_percent: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cpmm_virtual_liquidity: DEFAULT_VIRTUAL_LIQUIDITY,
            lmsr_liquidity: DEFAULT_LIQUIDITY_PARAMETER,
            curve: CurveParams::default(),
            max_slippage_percent: DEFAULT_MAX_SLIPPAGE_PERCENT,
        }
    }
}

impl EngineConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |var: &'static str, default: f64| -> std::result::Result<f64, ConfigError> {
            match lookup(var) {
                None => Ok(default),
                Some(raw) => {
                    let value: f64 = raw.trim().parse().map_err(|_| ConfigError::NotANumber {
                        var,
                        value: raw.clone(),
                    })?;
                    if !value.is_finite() || value <= 0.0 {
                        return Err(ConfigError::NotPositive { var, value });
                    }
                    Ok(value)
                }
            }
        };

        config.cpmm_virtual_liquidity =
            read(ENV_CPMM_VIRTUAL_LIQUIDITY, config.cpmm_virtual_liquidity)?;
        config.lmsr_liquidity = read(ENV_LMSR_LIQUIDITY, config.lmsr_liquidity)?;
        config.curve.steepness = read(ENV_CURVE_STEEPNESS, config.curve.steepness)?;
        // bootstrap issuance prices off the same K as the quadratic regime
        config.curve.initial_virtual_supply = config.curve.steepness;
        config.curve.graduation_threshold =
            read(ENV_GRADUATION_THRESHOLD, config.curve.graduation_threshold)?;
        config.max_slippage_percent = read(ENV_MAX_SLIPPAGE_PERCENT, config.max_slippage_percent)?;

        debug!(?config, "engine config loaded");
        Ok(config)
    }

    /// Config using a liquidity preset for both AMMs
    pub fn with_preset(preset: LiquidityPreset) -> Self {
        Self {
            cpmm_virtual_liquidity: preset.constant_product(),
            lmsr_liquidity: preset.lmsr(),
            ..Self::default()
        }
    }

    pub fn new_constant_product_pool(&self) -> Result<ConstantProductPool> {
        ConstantProductPool::initialize(self.cpmm_virtual_liquidity)
    }

    pub fn new_lmsr_pool(&self, outcomes: Vec<String>) -> Result<LmsrPool> {
        LmsrPool::initialize(outcomes, self.lmsr_liquidity)
    }

    pub fn new_bonding_curve(
        &self,
        market_id: impl Into<String>,
        num_outcomes: usize,
    ) -> Result<BondingCurveState> {
        BondingCurveState::with_params(market_id, num_outcomes, self.curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amm::{OutcomeIndex, PricingEngine};
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.cpmm_virtual_liquidity, 50.0);
        assert_eq!(config.curve.graduation_threshold, 100.0);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            (ENV_LMSR_LIQUIDITY, "500"),
            (ENV_GRADUATION_THRESHOLD, " 250.5 "),
        ]))
        .unwrap();
        assert_eq!(config.lmsr_liquidity, 500.0);
        assert_eq!(config.curve.graduation_threshold, 250.5);
        assert_eq!(config.curve.steepness, 10_000.0);
    }

    #[test]
    fn test_invalid_values() {
        let err = EngineConfig::from_lookup(lookup_from(&[(ENV_CURVE_STEEPNESS, "steep")])).unwrap_err();
        assert!(matches!(err, ConfigError::NotANumber { var: ENV_CURVE_STEEPNESS, .. }));

        let err = EngineConfig::from_lookup(lookup_from(&[(ENV_CPMM_VIRTUAL_LIQUIDITY, "-4")])).unwrap_err();
        assert_eq!(err, ConfigError::NotPositive { var: ENV_CPMM_VIRTUAL_LIQUIDITY, value: -4.0 });
    }

    #[test]
    fn test_steepness_override_moves_bootstrap_supply() {
        let config = EngineConfig::from_lookup(lookup_from(&[(ENV_CURVE_STEEPNESS, "100")])).unwrap();
        assert_eq!(config.curve.steepness, 100.0);
        assert_eq!(config.curve.initial_virtual_supply, 100.0);

        let curve = config.new_bonding_curve("m", 2).unwrap();
        let first = curve.buy(1.0, OutcomeIndex::YES).unwrap();
        assert_eq!(first.shares_out, 50.0);
    }

    #[test]
    fn test_recommended_liquidity() {
        assert_eq!(recommended_liquidity(1000.0, PricingModel::ConstantProduct), 150.0);
        assert_eq!(recommended_liquidity(10.0, PricingModel::ConstantProduct), 20.0);
        assert_eq!(recommended_liquidity(1e6, PricingModel::Lmsr), 2000.0);
        assert_eq!(liquidity_for_category("Politics", PricingModel::ConstantProduct), 75.0);
        assert_eq!(liquidity_for_category("Unknown", PricingModel::Lmsr), 50.0);
    }

    #[test]
    fn test_presets_build_pools() {
        let config = EngineConfig::with_preset(LiquidityPreset::Large);
        let pool = config.new_constant_product_pool().unwrap();
        assert_eq!(pool.reserves, [200.0, 200.0]);

        let lmsr = config.new_lmsr_pool(vec!["A".into(), "B".into()]).unwrap();
        assert_eq!(lmsr.liquidity, 500.0);

        let curve = config.new_bonding_curve("m", 2).unwrap();
        assert_eq!(curve.params, CurveParams::default());
        assert_eq!(LiquidityPreset::default().liquidity_for(PricingModel::Lmsr), 100.0);
    }
}
