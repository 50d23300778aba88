// ============================================================================
// Reserve Math - shared primitives for every pricing engine
// ============================================================================

use crate::error::{PricingError, Result};

/// Relative tolerance used when comparing floating quantities that should be
/// equal (k before/after a trade, sell proceeds against wagered volume)
pub const RELATIVE_TOLERANCE: f64 = 1e-9;

/// Price of outcome `i` as its share of the summed reserves
///
/// Fails with `DivisionByZero` when every reserve is zero.
pub fn price(reserves: &[f64], i: usize) -> Result<f64> {
    check_outcome(i, reserves.len())?;
    let total: f64 = reserves.iter().sum();
    if total == 0.0 {
        return Err(PricingError::DivisionByZero);
    }
    Ok(reserves[i] / total)
}

/// Prices of all outcomes (sum to 1.0)
pub fn prices(reserves: &[f64]) -> Result<Vec<f64>> {
    let total: f64 = reserves.iter().sum();
    if total == 0.0 {
        return Err(PricingError::DivisionByZero);
    }
    Ok(reserves.iter().map(|r| r / total).collect())
}

/// Product of all reserves; 0 if any reserve is 0 (uninitialized pool)
pub fn product(reserves: &[f64]) -> f64 {
    if reserves.iter().any(|r| *r == 0.0) {
        return 0.0;
    }
    reserves.iter().product()
}

/// Signed fractional change from `before` to `after`
pub fn relative_change(before: f64, after: f64) -> Result<f64> {
    if before == 0.0 {
        return Err(PricingError::DivisionByZero);
    }
    Ok((after - before) / before)
}

/// `numerator / denominator`, refusing a zero denominator
pub fn checked_div(numerator: f64, denominator: f64) -> Result<f64> {
    if denominator == 0.0 {
        return Err(PricingError::DivisionByZero);
    }
    Ok(numerator / denominator)
}

/// Reject amounts that are zero, negative, NaN or infinite
pub fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PricingError::InvalidAmount { amount });
    }
    Ok(amount)
}

pub fn check_outcome(index: usize, num_outcomes: usize) -> Result<()> {
    if index >= num_outcomes {
        return Err(PricingError::InvalidOutcomeIndex { index, num_outcomes });
    }
    Ok(())
}

/// `|a - b| <= tol * max(|a|, |b|, 1)`
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tol * scale
}

/// Every value finite and strictly positive
pub(crate) fn all_positive(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite() && *v > 0.0)
}

/// Every value finite and non-negative
pub(crate) fn all_non_negative(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite() && *v >= 0.0)
}

/// Subtract sell proceeds from wagered volume.
///
/// Proceeds land within floating noise of the volume when a position is
/// sold back in full; that residue drains the side to exactly zero. A real
/// overshoot is `InsufficientLiquidity`.
pub(crate) fn withdraw_volume(volume: f64, proceeds: f64) -> Result<f64> {
    if approx_eq(proceeds, volume, RELATIVE_TOLERANCE) {
        return Ok(0.0);
    }
    if proceeds > volume {
        return Err(PricingError::InsufficientLiquidity {
            requested: proceeds,
            available: volume,
        });
    }
    Ok((volume - proceeds).max(0.0))
}

/// Pari-mutuel payout: winners split the whole pot pro-rata to the volume
/// wagered on the winning side.
///
/// `payout = shares * (total_volume / volume[winning])`. A winning side with
/// no wagered volume is reported as `NoWinningVolume`.
pub fn winning_side_payout(
    real_volume: &[f64],
    shares: f64,
    outcome: usize,
    winning: usize,
) -> Result<f64> {
    check_outcome(outcome, real_volume.len())?;
    check_outcome(winning, real_volume.len())?;
    if !shares.is_finite() || shares < 0.0 {
        return Err(PricingError::InvalidAmount { amount: shares });
    }
    if outcome != winning {
        return Ok(0.0);
    }

    let winning_volume = real_volume[winning];
    if winning_volume == 0.0 {
        return Err(PricingError::NoWinningVolume { outcome: winning });
    }
    let total: f64 = real_volume.iter().sum();
    Ok(shares * (total / winning_volume))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winning_side_payout() {
        let volume = [300.0, 100.0];
        // winners split 400 over 300 wagered on their side
        let p = winning_side_payout(&volume, 30.0, 0, 0).unwrap();
        assert!((p - 40.0).abs() < 1e-12);
        assert_eq!(winning_side_payout(&volume, 30.0, 1, 0).unwrap(), 0.0);
        assert_eq!(
            winning_side_payout(&[0.0, 100.0], 5.0, 0, 0),
            Err(PricingError::NoWinningVolume { outcome: 0 })
        );
    }

    #[test]
    fn test_price_share_of_total() {
        let reserves = [30.0, 70.0];
        assert!((price(&reserves, 0).unwrap() - 0.3).abs() < 1e-12);
        assert!((price(&reserves, 1).unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_price_all_zero_is_division_by_zero() {
        assert_eq!(price(&[0.0, 0.0], 0), Err(PricingError::DivisionByZero));
        assert_eq!(prices(&[0.0, 0.0, 0.0]), Err(PricingError::DivisionByZero));
    }

    #[test]
    fn test_price_out_of_range() {
        assert_eq!(
            price(&[1.0, 1.0], 2),
            Err(PricingError::InvalidOutcomeIndex { index: 2, num_outcomes: 2 })
        );
    }

    #[test]
    fn test_product_detects_uninitialized() {
        assert_eq!(product(&[5.0, 0.0, 2.0]), 0.0);
        assert_eq!(product(&[5.0, 4.0, 2.0]), 40.0);
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(1.5).is_ok());
        assert!(validate_amount(0.0).is_err());
        assert!(validate_amount(-3.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
    }

    #[test]
    fn test_withdraw_volume() {
        assert_eq!(withdraw_volume(100.0, 40.0).unwrap(), 60.0);
        // floating residue drains to zero
        assert_eq!(withdraw_volume(100.0, 100.0 + 1e-12).unwrap(), 0.0);
        assert_eq!(withdraw_volume(100.0, 100.0 - 1e-12).unwrap(), 0.0);
        assert!(matches!(
            withdraw_volume(100.0, 101.0),
            Err(PricingError::InsufficientLiquidity { .. })
        ));
    }
}
