#![forbid(unsafe_code)]

//! Reproducibility of pinned runs and independence from evaluation order.

use smellproof_harness::corpus::builtin_registry;
use smellproof_harness::{Oracle, OracleConfig, Selection, SourceMode, Sources, Verdict};
use tracing::Level;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
}

fn pinned(seed: u64) -> Oracle {
    Oracle::new(OracleConfig::pinned(seed).with_samples(32))
}

fn run_all(oracle: &Oracle) -> Vec<Verdict> {
    let registry = builtin_registry().unwrap();
    oracle.run(&registry, &Selection::All, None).unwrap()
}

#[test]
fn consecutive_pinned_runs_are_identical() {
    init_tracing();
    for seed in [0, 1, 0xDEAD_BEEF] {
        assert_eq!(run_all(&pinned(seed)), run_all(&pinned(seed)), "seed {seed}");
    }
}

#[test]
fn reversed_order_yields_the_same_verdicts() {
    let registry = builtin_registry().unwrap();
    let oracle = pinned(7);
    let forward = oracle.run(&registry, &Selection::All, None).unwrap();
    let mut reversed: Vec<Verdict> = registry
        .all()
        .iter()
        .rev()
        .map(|fixture| oracle.check_default(fixture))
        .collect();
    reversed.reverse();
    assert_eq!(forward, reversed);
}

#[test]
fn single_fixture_selection_matches_full_run() {
    let registry = builtin_registry().unwrap();
    let oracle = pinned(3);
    let full = oracle.run(&registry, &Selection::All, None).unwrap();
    for (idx, rule_id) in registry.rule_ids().enumerate() {
        let alone = oracle
            .run(&registry, &Selection::Named(vec![rule_id.to_string()]), None)
            .unwrap();
        assert_eq!(alone.len(), 1);
        assert_eq!(alone[0], full[idx], "{rule_id}");
    }
}

#[test]
fn parallel_run_matches_sequential() {
    init_tracing();
    let registry = builtin_registry().unwrap();
    let oracle = pinned(11);
    let sequential = oracle.run(&registry, &Selection::All, None).unwrap();
    let parallel = oracle.run_parallel(&registry, &Selection::All, None).unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn verdicts_record_the_pinned_mode() {
    let verdicts = run_all(&pinned(42));
    assert!(
        verdicts
            .iter()
            .all(|v| v.mode == SourceMode::Pinned { seed: 42 })
    );
}

#[test]
fn live_mode_still_classifies_deterministic_fixtures() {
    let registry = builtin_registry().unwrap();
    let oracle = Oracle::new(OracleConfig::live().with_samples(4));
    let fixture = registry.get("prefer-immediate-return").unwrap();
    let verdict = oracle.check_default(fixture);
    assert!(verdict.is_equivalent(), "{verdict}");
    assert_eq!(verdict.mode, SourceMode::Live);
}

#[test]
fn identical_sources_feed_identical_values() {
    let mut a = Sources::pinned_with_step(99, 10);
    let mut b = Sources::pinned_with_step(99, 10);
    for _ in 0..32 {
        assert_eq!(a.percent(), b.percent());
        assert_eq!(a.now_ms(), b.now_ms());
    }
}
