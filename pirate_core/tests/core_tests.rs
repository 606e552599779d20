use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pirate_core::{
    play_spin, CountingRandom, EngineConfig, InMemoryLedger, Ledger, LedgerError, Paytable,
    PaytableStep, ProvablyFairRng, RandomSource, ScriptedRandom, SpinEngine, SpinError, Symbol,
    Wager,
};

const MISS: f64 = 0.99;

/// Unit draws that produce a grid with `counts[i]` of regular symbol `i` and
/// `scatters` scatters, in that order, for the default 6+1 alphabet.
fn grid_script(counts: &[u32], scatters: u32) -> Vec<f64> {
    let buckets = counts.len() as u32 + 1;
    let mut draws = Vec::new();
    for (i, n) in counts.iter().enumerate() {
        for _ in 0..*n {
            draws.push(ScriptedRandom::bucket(i as u32, buckets));
        }
    }
    for _ in 0..scatters {
        draws.push(ScriptedRandom::bucket(buckets - 1, buckets));
    }
    draws
}

fn single_step_engine() -> SpinEngine {
    let config = EngineConfig {
        paytable: Paytable::new(vec![PaytableStep {
            min_count: 8,
            multiplier: 1,
        }]),
        ..EngineConfig::default()
    };
    SpinEngine::new(config).unwrap()
}

#[test]
fn rng_repeatable() {
    let mut rng1 = ProvablyFairRng::new("s", "c", 42);
    let mut rng2 = ProvablyFairRng::new("s", "c", 42);
    let a: Vec<f64> = (0..10).map(|_| rng1.next_unit()).collect();
    let b: Vec<f64> = (0..10).map(|_| rng2.next_unit()).collect();
    assert_eq!(a, b);
}

#[test]
fn draw_budget_is_grid_plus_chip_rolls() {
    let engine = SpinEngine::new(EngineConfig::default()).unwrap();
    let cells = engine.config().cells();
    let mut saw_chips = false;
    let mut saw_none = false;
    for nonce in 0..300u64 {
        let mut rng = CountingRandom::new(ProvablyFairRng::new("server", "client", nonce));
        let out = engine.spin(1, 1, &mut rng).unwrap();
        let extra = rng.draws() - cells;
        if out.multipliers.is_empty() {
            saw_none = true;
            assert_eq!(extra, 1);
        } else {
            saw_chips = true;
            assert_eq!(extra, 2);
            assert!(out.multipliers.len() <= 2);
        }
        assert_eq!(out.grid.len(), 5);
        assert!(out.grid.iter().all(|row| row.len() == 6));
    }
    assert!(saw_chips && saw_none);
}

#[test]
fn insufficient_funds_consumes_no_draws() {
    let engine = SpinEngine::new(EngineConfig::default()).unwrap();
    let mut rng = CountingRandom::new(ProvablyFairRng::new("server", "client", 1));
    assert_eq!(
        engine.spin(10, 5, &mut rng),
        Err(SpinError::InsufficientFunds {
            balance: 5,
            wager: 10
        })
    );
    assert_eq!(rng.draws(), 0);
}

#[test]
fn base_win_is_stable_for_a_fixed_grid() {
    let engine = SpinEngine::new(EngineConfig::default()).unwrap();
    let mut rng = ScriptedRandom::new(grid_script(&[12, 10, 8, 0, 0, 0], 0));
    let grid = engine.generate_grid(&mut rng);
    let tally = engine.tally(&grid);
    let first = engine.base_win(&tally, 3);
    // an unrelated spin in between does not change the score
    let _ = engine.spin(3, 100, &mut ProvablyFairRng::new("x", "y", 0));
    assert_eq!(engine.base_win(&engine.tally(&grid), 3), first);
    assert_eq!(first, 3 * (5 + 2 + 1));
}

#[test]
fn scatter_bonus_applies_without_base_win() {
    let engine = SpinEngine::new(EngineConfig::default()).unwrap();
    let mut draws = grid_script(&[5, 5, 4, 4, 4, 4], 4);
    draws.push(MISS);
    let out = engine
        .spin(10, 10, &mut ScriptedRandom::new(draws))
        .unwrap();
    assert_eq!(out.base_win, 0);
    assert_eq!(out.scatter_count, 4);
    assert!(out.multipliers.is_empty());
    assert_eq!(out.total_win, 50);
}

#[test]
fn scatter_bonus_is_not_scaled_by_chips() {
    let engine = SpinEngine::new(EngineConfig::default()).unwrap();
    // symbol 0 hits 12 -> 5x; 4 scatters; chip roll 0.0 -> 5%, second 0.01 -> 5%
    let mut draws = grid_script(&[12, 4, 4, 3, 3, 0], 4);
    draws.extend([0.0, 0.01]);
    let out = engine
        .spin(10, 10, &mut ScriptedRandom::new(draws))
        .unwrap();
    assert_eq!(out.base_win, 50);
    assert_eq!(out.multipliers, vec![5, 5]);
    assert_eq!(out.total_win, 55 + 50);
}

#[test]
fn three_scatters_do_not_trigger_bonus() {
    let engine = SpinEngine::new(EngineConfig::default()).unwrap();
    let mut draws = grid_script(&[5, 5, 5, 4, 4, 4], 3);
    draws.push(MISS);
    let out = engine
        .spin(10, 10, &mut ScriptedRandom::new(draws))
        .unwrap();
    assert_eq!(out.scatter_count, 3);
    assert_eq!(out.total_win, 0);
}

#[test]
fn exact_threshold_scores_that_tier() {
    let engine = single_step_engine();
    let mut draws = grid_script(&[8, 5, 5, 4, 4, 4], 0);
    draws.push(MISS);
    let out = engine
        .spin(10, 10, &mut ScriptedRandom::new(draws))
        .unwrap();
    assert_eq!(out.grid.iter().flatten().filter(|s| **s == Symbol::Regular(0)).count(), 8);
    assert_eq!(out.base_win, 10);
    assert_eq!(out.total_win, 10);
}

#[tokio::test]
async fn break_even_spin_settles_to_same_balance() {
    let engine = single_step_engine();
    let ledger = InMemoryLedger::new(0).with_balance("captain", 10);
    let mut draws = grid_script(&[8, 5, 5, 4, 4, 4], 0);
    draws.push(MISS);
    let mut rng = ScriptedRandom::new(draws);
    let result = play_spin(&engine, &ledger, "captain", Wager::new(10).unwrap(), &mut rng)
        .await
        .unwrap();
    assert_eq!(result.base_win, 10);
    assert_eq!(result.total_win, 10);
    assert_eq!(result.balance_after, 10);
    assert_eq!(ledger.balance("captain").await, Ok(10));
}

#[tokio::test]
async fn short_balance_is_rejected_and_unchanged() {
    let engine = SpinEngine::new(EngineConfig::default()).unwrap();
    let ledger = InMemoryLedger::new(0).with_balance("deckhand", 5);
    let mut rng = CountingRandom::new(ProvablyFairRng::new("s", "c", 0));
    let err = play_spin(&engine, &ledger, "deckhand", Wager::new(10).unwrap(), &mut rng)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SpinError::InsufficientFunds {
            balance: 5,
            wager: 10
        }
    );
    assert_eq!(rng.draws(), 0);
    assert_eq!(ledger.balance("deckhand").await, Ok(5));
}

#[tokio::test]
async fn losing_spin_debits_wager() {
    let engine = single_step_engine();
    let ledger = InMemoryLedger::new(0).with_balance("a", 30);
    let mut draws = grid_script(&[5, 5, 5, 5, 5, 5], 0);
    draws.push(MISS);
    let result = play_spin(
        &engine,
        &ledger,
        "a",
        Wager::new(10).unwrap(),
        &mut ScriptedRandom::new(draws),
    )
    .await
    .unwrap();
    assert_eq!(result.total_win, 0);
    assert_eq!(result.balance_after, 20);
}

/// Reports a balance it no longer has, as if another spin settled first.
struct StaleLedger {
    inner: InMemoryLedger,
    reported: u64,
}

#[async_trait]
impl Ledger for StaleLedger {
    async fn balance(&self, _account: &str) -> Result<u64, LedgerError> {
        Ok(self.reported)
    }

    async fn settle_spin(
        &self,
        account: &str,
        wager: u64,
        total_win: u64,
    ) -> Result<u64, LedgerError> {
        self.inner.settle_spin(account, wager, total_win).await
    }

    async fn apply_net_change(&self, account: &str, delta: i64) -> Result<u64, LedgerError> {
        self.inner.apply_net_change(account, delta).await
    }
}

#[tokio::test]
async fn lost_balance_race_is_insufficient_funds() {
    let engine = single_step_engine();
    let ledger = StaleLedger {
        inner: InMemoryLedger::new(0).with_balance("a", 0),
        reported: 10,
    };
    let mut draws = grid_script(&[5, 5, 5, 5, 5, 5], 0);
    draws.push(MISS);
    let err = play_spin(
        &engine,
        &ledger,
        "a",
        Wager::new(10).unwrap(),
        &mut ScriptedRandom::new(draws),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SpinError::InsufficientFunds { .. }));
    assert_eq!(ledger.inner.balance("a").await, Ok(0));
}

/// A rival spin on the same account stakes the whole balance right after
/// the funds check has read it.
struct RacingLedger {
    inner: InMemoryLedger,
    rival_wager: u64,
}

#[async_trait]
impl Ledger for RacingLedger {
    async fn balance(&self, account: &str) -> Result<u64, LedgerError> {
        let seen = self.inner.balance(account).await?;
        self.inner.settle_spin(account, self.rival_wager, 0).await?;
        Ok(seen)
    }

    async fn settle_spin(
        &self,
        account: &str,
        wager: u64,
        total_win: u64,
    ) -> Result<u64, LedgerError> {
        self.inner.settle_spin(account, wager, total_win).await
    }

    async fn apply_net_change(&self, account: &str, delta: i64) -> Result<u64, LedgerError> {
        self.inner.apply_net_change(account, delta).await
    }
}

#[tokio::test]
async fn winning_spin_on_a_spent_balance_is_not_credited() {
    let engine = SpinEngine::new(EngineConfig::default()).unwrap();
    let ledger = RacingLedger {
        inner: InMemoryLedger::new(0).with_balance("a", 10),
        rival_wager: 10,
    };
    // symbol 0 lands 12 times: 5x the wager
    let mut draws = grid_script(&[12, 4, 4, 4, 3, 3], 0);
    draws.push(MISS);
    let outcome = engine
        .spin(10, 10, &mut ScriptedRandom::new(draws.clone()))
        .unwrap();
    assert_eq!(outcome.total_win, 50);

    let err = play_spin(
        &engine,
        &ledger,
        "a",
        Wager::new(10).unwrap(),
        &mut ScriptedRandom::new(draws),
    )
    .await
    .unwrap_err();
    assert_eq!(
        err,
        SpinError::InsufficientFunds {
            balance: 10,
            wager: 10
        }
    );
    assert_eq!(ledger.inner.balance("a").await, Ok(0));
}

#[tokio::test]
async fn break_even_spin_on_a_spent_balance_is_not_settled() {
    let engine = single_step_engine();
    let ledger = RacingLedger {
        inner: InMemoryLedger::new(0).with_balance("a", 10),
        rival_wager: 10,
    };
    let mut draws = grid_script(&[8, 5, 5, 4, 4, 4], 0);
    draws.push(MISS);
    let err = play_spin(
        &engine,
        &ledger,
        "a",
        Wager::new(10).unwrap(),
        &mut ScriptedRandom::new(draws),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SpinError::InsufficientFunds { .. }));
    assert_eq!(ledger.inner.balance("a").await, Ok(0));
}

struct BrokenLedger {
    settle_calls: AtomicUsize,
}

#[async_trait]
impl Ledger for BrokenLedger {
    async fn balance(&self, _account: &str) -> Result<u64, LedgerError> {
        Ok(100)
    }

    async fn settle_spin(
        &self,
        _account: &str,
        _wager: u64,
        _total_win: u64,
    ) -> Result<u64, LedgerError> {
        self.settle_calls.fetch_add(1, Ordering::SeqCst);
        Err(LedgerError::Unavailable("disk full".into()))
    }

    async fn apply_net_change(&self, _account: &str, _delta: i64) -> Result<u64, LedgerError> {
        Err(LedgerError::Unavailable("disk full".into()))
    }
}

#[tokio::test]
async fn settlement_failure_is_surfaced_once() {
    let engine = SpinEngine::new(EngineConfig::default()).unwrap();
    let ledger = BrokenLedger {
        settle_calls: AtomicUsize::new(0),
    };
    let mut rng = ProvablyFairRng::new("s", "c", 5);
    let err = play_spin(&engine, &ledger, "a", Wager::new(1).unwrap(), &mut rng)
        .await
        .unwrap_err();
    assert!(matches!(err, SpinError::SettlementFailed(LedgerError::Unavailable(_))));
    assert_eq!(ledger.settle_calls.load(Ordering::SeqCst), 1);
}

fn binomial_pmf(trials: usize, p: f64) -> Vec<f64> {
    let mut pmf = vec![0.0; trials + 1];
    pmf[0] = (1.0 - p).powi(trials as i32);
    for k in 1..=trials {
        pmf[k] = pmf[k - 1] * (trials - k + 1) as f64 / k as f64 * p / (1.0 - p);
    }
    pmf
}

/// Return to player implied by a uniform config: each symbol count is
/// Binomial(cells, 1 / (regular + 1)), chips scale the base win only.
fn expected_rtp(config: &EngineConfig) -> f64 {
    let regular = config.symbols.regular.len();
    let pmf = binomial_pmf(config.cells(), 1.0 / (regular + 1) as f64);
    let base: f64 = regular as f64
        * pmf
            .iter()
            .enumerate()
            .map(|(k, p)| p * config.paytable.payout(k as u32, 1) as f64)
            .sum::<f64>();
    let m = &config.multipliers;
    let mean_chip =
        m.chips.iter().map(|c| *c as f64).sum::<f64>() / m.chips.len() as f64 / 100.0;
    let chip_factor = 1.0 + m.first_probability * mean_chip * (1.0 + m.second_probability);
    let scatter_hit: f64 = pmf[config.scatter.threshold as usize..].iter().sum();
    base * chip_factor + scatter_hit * config.scatter.bonus_multiplier as f64
}

#[test]
fn simulated_rtp_tracks_the_paytable() {
    let engine = SpinEngine::new(EngineConfig::default()).unwrap();
    let expected = expected_rtp(engine.config());
    assert!((3.5..3.7).contains(&expected), "expected rtp {expected}");

    let spins = 2000u64;
    let total_payout: u64 = (0..spins)
        .map(|n| {
            let mut rng = ProvablyFairRng::new("server", "client", n);
            engine.spin(10, 10, &mut rng).unwrap().total_win
        })
        .sum();
    let rtp = total_payout as f64 / (spins * 10) as f64;
    // about four standard errors at this sample size
    assert!((rtp - expected).abs() < 0.25, "rtp {rtp} vs {expected}");
}
