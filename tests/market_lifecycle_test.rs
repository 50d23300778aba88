/// Market lifecycle tests: create a pool, trade against it, persist the
/// snapshots and settle once the winner is known.
///
/// Alice and Bob trade every market; amounts are in whole currency units.

use driftshield_pricing::amm::{CurveStatus, GRADUATION_THRESHOLD};
use driftshield_pricing::store::{ActivityEntry, ActivityKind, ActivityLog};
use driftshield_pricing::{
    capital_for_target_price, project_gains_for, validate_bet_size, BondingCurveState,
    ConstantProductPool, EngineConfig, LmsrPool, MarketPool, MemoryStore, OutcomeIndex,
    PoolStore, PricingEngine, SledStore,
};

const YES: OutcomeIndex = OutcomeIndex::YES;
const NO: OutcomeIndex = OutcomeIndex::NO;

fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

// ============================================================================
// CONSTANT PRODUCT
// ============================================================================

#[test]
fn test_cpmm_alice_and_bob_settle() {
    let pool = ConstantProductPool::initialize(50.0).unwrap();
    let opening = pool.clone();

    // Alice takes YES for 100
    let quote = pool.quote(100.0, YES).unwrap();
    let alice = pool.buy(100.0, YES).unwrap();
    assert!(approx(alice.shares_out, quote.shares_out, 1e-12));
    assert!(approx(alice.shares_out, 100.0 / 3.0, 1e-9));
    assert!(approx(alice.new_pool.price(YES).unwrap(), 0.9, 1e-9));
    assert_eq!(pool, opening);

    // Bob fades it with NO for 50
    let bob = alice.new_pool.buy(50.0, NO).unwrap();
    let pool = bob.new_pool;
    assert!(approx(pool.reserves[0] * pool.reserves[1], pool.k, pool.k * 1e-9));
    assert!(pool.price(YES).unwrap() < 0.9);
    assert_eq!(pool.total_volume(), 150.0);

    // YES wins: the whole 150 pot goes to YES holders
    let alice_payout = pool.payout(alice.shares_out, YES, YES).unwrap();
    let bob_payout = pool.payout(bob.shares_out, NO, YES).unwrap();
    assert!(approx(alice_payout, alice.shares_out * 1.5, 1e-9));
    assert_eq!(bob_payout, 0.0);
}

#[test]
fn test_cpmm_guards_and_projection() {
    let config = EngineConfig::default();
    let pool = config.new_constant_product_pool().unwrap();

    let check = validate_bet_size(&pool, 500.0, YES, config.max_slippage_percent).unwrap();
    assert!(!check.valid);

    let pool = pool.buy(40.0, NO).unwrap().new_pool;
    let entry = pool.quote(5.0, YES).unwrap();
    let projection = project_gains_for(&pool, YES, entry.average_price, entry.shares_out).unwrap();
    assert_eq!(projection.scenarios.last().unwrap().label, "max");
    assert!(projection.scenarios.iter().all(|s| s.target_price > pool.price(YES).unwrap()));

    let estimate = capital_for_target_price(&pool, YES, 0.5).unwrap();
    assert!(estimate.capital_needed > 0.0);
    let reached = pool.quote(estimate.capital_needed, YES).unwrap().price_after;
    assert!(reached >= 0.5);
}

// ============================================================================
// LMSR
// ============================================================================

#[test]
fn test_lmsr_three_way_market() {
    let outcomes = vec!["Alice".to_string(), "Bob".to_string(), "Charlie".to_string()];
    let pool = LmsrPool::initialize(outcomes, 100.0).unwrap();
    let charlie = OutcomeIndex::new(2);

    let first = pool.buy(30.0, OutcomeIndex::new(0)).unwrap();
    let second = first.new_pool.buy(20.0, charlie).unwrap();
    let pool = second.new_pool;

    let prices = pool.prices().unwrap();
    assert!(approx(prices.iter().sum::<f64>(), 1.0, 1e-9));
    assert!(prices[0] > prices[2] && prices[2] > prices[1]);

    // selling straight back returns what was paid
    let sold = pool.sell(second.shares_out, charlie).unwrap();
    assert!(approx(sold.proceeds, 20.0, 1e-6));
    assert!(sold.price_impact < 0.0);
    assert!(sold.new_pool.real_volume[2] < 1e-6);

    // Bob wins with nothing wagered on that side
    let bob = OutcomeIndex::new(1);
    assert_eq!(sold.new_pool.payout(1.0, bob, bob).unwrap(), 0.0);
    assert!(sold.new_pool.try_payout(1.0, bob, bob).is_err());
}

// ============================================================================
// BONDING CURVE
// ============================================================================

#[test]
fn test_bonding_curve_graduates_and_settles() {
    let mut state = BondingCurveState::initialize("eth-etf", 2).unwrap();
    let mut yes_tokens = 0.0;
    let mut log = ActivityLog::new();

    for (n, ts) in (1..=10).zip(1_700_000_000u64..) {
        let side = if n % 2 == 0 { NO } else { YES };
        let trade = state.buy(10.0, side).unwrap();
        if side == YES {
            yes_tokens += trade.shares_out;
        }
        let was_bonding = !state.is_graduated();
        state = trade.new_pool;

        log.record(ActivityEntry {
            timestamp: ts,
            kind: ActivityKind::Buy,
            market_id: state.market_id.clone(),
            outcome: Some(side.index()),
            amount: Some(10.0),
            details: format!("buy #{}", n),
        });
        if was_bonding && state.is_graduated() {
            log.record(ActivityEntry {
                timestamp: ts,
                kind: ActivityKind::Graduation,
                market_id: state.market_id.clone(),
                outcome: None,
                amount: None,
                details: "curve graduated".to_string(),
            });
        }

        let expect_graduated = n as f64 * 10.0 >= GRADUATION_THRESHOLD;
        assert_eq!(state.is_graduated(), expect_graduated, "after buy {}", n);
    }

    assert_eq!(state.status, CurveStatus::Graduated);
    assert_eq!(state.remaining_to_graduate(), 0.0);
    assert_eq!(log.len(), 11);
    assert_eq!(log.recent(1)[0].kind, ActivityKind::Graduation);

    // YES holders split the entire market volume
    let payout = state.payout(yes_tokens, YES, YES).unwrap();
    assert!(approx(payout, state.total_volume, 1e-6));
}

// ============================================================================
// PERSISTENCE
// ============================================================================

fn exercise_store(store: &dyn PoolStore) {
    let cpmm = MarketPool::from(ConstantProductPool::initialize(50.0).unwrap());
    let curve = MarketPool::from(BondingCurveState::initialize("curve", 4).unwrap());

    store.save("cpmm", &cpmm).unwrap();
    store.save("curve", &curve).unwrap();

    let traded = cpmm.buy(25.0, YES).unwrap().new_pool;
    store.save("cpmm", &traded).unwrap();

    assert_eq!(store.load("cpmm").unwrap(), Some(traded));
    assert_eq!(store.load("curve").unwrap(), Some(curve));
    assert_eq!(store.ids().unwrap(), vec!["cpmm".to_string(), "curve".to_string()]);

    store.remove("curve").unwrap();
    assert_eq!(store.load("curve").unwrap(), None);
}

#[test]
fn test_memory_store_lifecycle() {
    exercise_store(&MemoryStore::new());
}

#[test]
fn test_sled_store_lifecycle() {
    exercise_store(&SledStore::temporary().unwrap());
}
