//! Escalation boundaries forced with injected simulation batches.

use clustersig::adaptive::AdaptiveController;
use clustersig::{Config, SimulationBatch};

/// `n` trials, `exceed` of which are more extreme than 1.0.
fn batch(n: usize, exceed: usize) -> SimulationBatch {
    let statistics = (0..n)
        .map(|i| match i {
            i if i < exceed && i % 2 == 0 => 3.0,
            i if i < exceed => -3.0,
            _ => 0.25,
        })
        .collect();
    SimulationBatch {
        n_trials: n,
        statistics,
        discarded: 0,
    }
}

fn visited(exceed_at: impl Fn(usize) -> usize) -> Vec<usize> {
    AdaptiveController::from_config(&Config::new())
        .unwrap()
        .run(1.0, |n, _| Ok(batch(n, exceed_at(n))))
        .unwrap()
        .levels
        .iter()
        .map(|l| l.n_trials)
        .collect()
}

#[test]
fn one_exceedance_at_twenty_goes_to_hundred() {
    assert_eq!(visited(|n| if n == 20 { 1 } else { 40 }), vec![20, 100]);
}

#[test]
fn two_exceedances_at_twenty_stop() {
    assert_eq!(visited(|_| 2), vec![20]);
}

#[test]
fn three_at_hundred_goes_to_two_thousand() {
    assert_eq!(
        visited(|n| match n {
            20 => 0,
            100 => 3,
            _ => 500,
        }),
        vec![20, 100, 2_000]
    );
}

#[test]
fn nine_at_two_thousand_goes_to_five_thousand() {
    assert_eq!(
        visited(|n| match n {
            20 | 100 => 0,
            2_000 => 9,
            _ => 10,
        }),
        vec![20, 100, 2_000, 5_000]
    );
}

#[test]
fn terminal_level_never_escalates() {
    let outcome = AdaptiveController::from_config(&Config::new())
        .unwrap()
        .run(1.0, |n, _| Ok(batch(n, 0)))
        .unwrap();
    assert_eq!(outcome.levels.len(), 5);
    assert_eq!(outcome.n_trials, 15_000);
    assert!(outcome.levels.iter().take(4).all(|l| l.escalated));
    assert!(!outcome.levels[4].escalated);
    assert_eq!(outcome.p, 1.0 / 15_001.0);
}

#[test]
fn both_tails_count() {
    let outcome = AdaptiveController::from_config(&Config::new())
        .unwrap()
        .run(-1.0, |n, _| Ok(batch(n, 6)))
        .unwrap();
    assert_eq!(outcome.exceed, 6);
    assert_eq!(outcome.p, 7.0 / 21.0);
}
