// ============================================================================
// Units - ledger base units <-> engine currency
// ============================================================================
//
// The engines price in plain decimal currency. Ledger accounts store
// lamports. Conversion goes through rust_decimal so amounts round the same
// way every time instead of inheriting f64 representation error.
//
// ============================================================================

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::{PricingError, Result};

/// Lamports in one unit of currency
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

fn lamports_per_sol() -> Decimal {
    dec!(1000000000)
}

/// Convert ledger lamports to engine currency
pub fn lamports_to_amount(lamports: u64) -> f64 {
    (Decimal::from(lamports) / lamports_per_sol())
        .to_f64()
        .unwrap_or(lamports as f64 / LAMPORTS_PER_SOL as f64)
}

/// Convert engine currency to lamports, rounding half away from zero
pub fn amount_to_lamports(amount: f64) -> Result<u64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(PricingError::InvalidAmount { amount });
    }
    let value = Decimal::from_f64(amount).ok_or(PricingError::InvalidAmount { amount })?;

    (value * lamports_per_sol())
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(PricingError::InvalidAmount { amount })
}
