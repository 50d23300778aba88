//! DriftShield outcome pricing
//!
//! Pure pricing engines for prediction markets (constant product, LMSR and
//! a graduating bonding curve), plus slippage guards, gain projections and
//! optional snapshot stores for callers that want them.

pub mod amm;
pub mod config;
pub mod error;
pub mod projection;
pub mod slippage;
pub mod store;
pub mod units;

// Engines and the shared trading types
pub use amm::{
    BondingCurveState, ConstantProductPool, CurveParams, CurveStatus, LmsrPool, MarketPool,
    OutcomeIndex, PriceImpact, PricingEngine, Quote, SellResult, TradeResult,
};

pub use config::{EngineConfig, LiquidityPreset, PricingModel};
pub use error::{ConfigError, PricingError, Result, StoreError};

pub use projection::{
    capital_for_target_price, expected_value, project_gains, project_gains_for, CapitalEstimate,
    ExpectedValue, GainProjection, GainScenario,
};
pub use slippage::{validate_bet_size, BetSizeCheck, ImpactSeverity};

pub use store::{ActivityKind, ActivityLog, MemoryStore, PoolStore, SledStore};
pub use units::{amount_to_lamports, lamports_to_amount, LAMPORTS_PER_SOL};
