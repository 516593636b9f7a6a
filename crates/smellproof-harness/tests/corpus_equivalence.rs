#![forbid(unsafe_code)]

//! Full-corpus checks: every fixture meets its declared expectation under
//! pinned sources, and the two concrete scenarios hold.
//!
//! # Running
//!
//! ```sh
//! cargo test -p smellproof-harness --test corpus_equivalence
//! ```

use smellproof_harness::corpus::{RULE_IDS, builtin_registry};
use smellproof_harness::{
    Expectation, InputRecord, InvocationError, Oracle, OracleConfig, RegistryError, Selection,
    Side, VerdictStatus, summarize,
};

fn oracle() -> Oracle {
    Oracle::new(OracleConfig::pinned(0).with_samples(128))
}

#[test]
fn every_fixture_meets_its_declared_expectation() {
    let registry = builtin_registry().expect("builtin corpus registers");
    let verdicts = oracle()
        .run(&registry, &Selection::All, None)
        .expect("selection resolves");
    assert_eq!(verdicts.len(), RULE_IDS.len());
    for verdict in &verdicts {
        assert!(verdict.meets_expectation(), "{verdict}");
    }
}

#[test]
fn all_but_the_intentional_ones_are_equivalent() {
    let registry = builtin_registry().unwrap();
    let oracle = oracle();
    for fixture in registry.all() {
        let verdict = oracle.check_default(fixture);
        match fixture.expectation() {
            Expectation::Equivalent => {
                assert_eq!(verdict.status, VerdictStatus::Equivalent, "{verdict}");
                let per_input = match fixture.draw_space() {
                    Some(space) => space.len(),
                    None if fixture.is_nondeterministic() => 128,
                    None => 1,
                };
                let expected_probes = fixture.domain().len() * per_input;
                assert_eq!(verdict.inputs_checked, expected_probes, "{verdict}");
            }
            Expectation::Diverged => assert_eq!(verdict.status, VerdictStatus::Diverged),
            Expectation::BeforeErrors => assert_eq!(verdict.status, VerdictStatus::Errored),
        }
    }
}

#[test]
fn array_delete_before_errors_and_after_renders() {
    let registry = builtin_registry().unwrap();
    let fixture = registry.get("no-array-delete").unwrap();
    let verdict = oracle().check_default(fixture);
    assert_eq!(verdict.status, VerdictStatus::Errored);
    let detail = verdict.error_detail.as_ref().expect("error detail");
    assert_eq!(detail.side, Side::Before);
    assert!(matches!(
        detail.error,
        InvocationError::NonFiniteNumber { .. }
    ));
    assert_eq!(verdict.first_diverging_input, Some(InputRecord::empty()));

    let after = oracle().check_golden_text(fixture, Side::After, &InputRecord::empty(), "1.5");
    assert_eq!(after.status, VerdictStatus::Equivalent);
}

#[test]
fn function_inside_loop_scenario() {
    let registry = builtin_registry().unwrap();
    let fixture = registry.get("function-inside-loop").unwrap();
    let oracle = oracle();

    let verdict = oracle.check_default(fixture);
    assert_eq!(verdict.status, VerdictStatus::Diverged);
    assert_eq!(
        verdict.before_value.as_ref().map(|v| v.text.as_str()),
        Some("13,13,13,13,13,13,13,13,13,13,13,13,13")
    );
    assert_eq!(
        verdict.after_value.as_ref().map(|v| v.text.as_str()),
        Some("0,1,2,3,4,5,6,7,8,9,10,11,12")
    );

    let empty = InputRecord::empty();
    let before = oracle.check_golden_text(
        fixture,
        Side::Before,
        &empty,
        "13,13,13,13,13,13,13,13,13,13,13,13,13",
    );
    let after = oracle.check_golden_text(fixture, Side::After, &empty, "0,1,2,3,4,5,6,7,8,9,10,11,12");
    assert_eq!(before.status, VerdictStatus::Equivalent);
    assert_eq!(after.status, VerdictStatus::Equivalent);
}

#[test]
fn prefer_immediate_return_scenario() {
    let registry = builtin_registry().unwrap();
    let fixture = registry.get("prefer-immediate-return").unwrap();
    let input: InputRecord = "hours=1,minutes=30,seconds=45".parse().unwrap();
    let verdict = oracle().check(fixture, std::slice::from_ref(&input));
    assert_eq!(verdict.status, VerdictStatus::Equivalent);
    assert_eq!(
        verdict.after_value.map(|v| v.text),
        Some("5445000 milliseconds".to_string())
    );
}

#[test]
fn domain_override_replaces_declared_inputs() {
    let registry = builtin_registry().unwrap();
    let bad = vec![InputRecord::empty().with("hours", 1)];
    let verdicts = oracle()
        .run(
            &registry,
            &Selection::Named(vec!["prefer-immediate-return".into()]),
            Some(&bad),
        )
        .unwrap();
    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0].status, VerdictStatus::Errored);
    assert!(matches!(
        verdicts[0].error_detail.as_ref().map(|d| &d.error),
        Some(InvocationError::MissingParam { name }) if name == "minutes"
    ));
}

#[test]
fn unknown_rule_fails_before_running() {
    let registry = builtin_registry().unwrap();
    let err = oracle()
        .run(
            &registry,
            &Selection::from_csv("no-array-delete,no-such-rule"),
            None,
        )
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::UnknownRule {
            rule_id: "no-such-rule".into()
        }
    );
}

#[test]
fn summary_fails_strictly_but_passes_declared() {
    let registry = builtin_registry().unwrap();
    let summary = summarize(oracle().run(&registry, &Selection::All, None).unwrap());
    assert_eq!(summary.total, 11);
    assert_eq!(summary.equivalent_count, 9);
    assert_eq!(summary.diverged_count, 1);
    assert_eq!(summary.errored_count, 1);
    assert!(!summary.is_success());
    assert!(summary.unexpected().is_empty());
    assert_eq!(summary.render_text().lines().count(), 12);
}

#[test]
fn random_fixtures_cover_their_whole_draw_space() {
    let registry = builtin_registry().unwrap();
    let spaces: Vec<(&str, usize)> = registry
        .all()
        .iter()
        .filter_map(|fixture| fixture.draw_space().map(|space| (fixture.rule_id(), space.len())))
        .collect();
    assert_eq!(
        spaces,
        [
            ("cyclomatic-complexity", 100),
            ("elseif-without-else", 100),
            ("no-identical-conditions", 100),
            ("cognitive-complexity", 100),
            ("cognitive-complexity-nesting", 8),
        ]
    );
    // Sample count is irrelevant once the space is declared.
    let verdict = Oracle::new(OracleConfig::pinned(0).with_samples(1))
        .check_default(registry.get("no-identical-conditions").unwrap());
    assert_eq!(verdict.inputs_checked, 100);
    assert!(verdict.is_equivalent(), "{verdict}");
}

#[test]
fn strict_lockstep_exposes_the_nesting_clock_read() {
    let registry = builtin_registry().unwrap();
    let fixture = registry.get("cognitive-complexity-nesting").unwrap();
    let relaxed = oracle().check_default(fixture);
    assert_eq!(relaxed.status, VerdictStatus::Equivalent);

    // The draw space holds the all-false combination, so the clock branch is
    // always reached whatever the seed.
    for seed in [0, 1, 99] {
        let strict = Oracle::new(OracleConfig::pinned(seed).with_strict_lockstep(true))
            .check_default(fixture);
        assert_eq!(strict.status, VerdictStatus::Diverged, "{strict}");
    }
}
