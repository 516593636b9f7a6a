#![forbid(unsafe_code)]

//! Fixture registry and equivalence oracle for before/after refactoring
//! pairs.
//!
//! Each [`RuleFixture`] pairs a smelly implementation with its fix. The
//! [`Oracle`] runs both against the same pinned [`Sources`], normalizes their
//! render trees and reports a [`Verdict`] per fixture; [`summarize`] folds a
//! run into a pass/fail [`Summary`].

pub mod config;
pub mod corpus;
pub mod determinism;
pub mod error;
pub mod input;
pub mod ledger;
pub mod normalize;
pub mod oracle;
pub mod registry;
pub mod render;
pub mod report;

pub use config::OracleConfig;
pub use determinism::{
    DrawSpace, SourceMode, SourceUsage, Sources, derive_probe_seed, percent_draw,
};
pub use error::{InvocationError, InvocationResult, RegistryError, RegistryResult};
pub use input::{InputRecord, InputValue};
pub use ledger::JsonlLedger;
pub use normalize::{CanonicalDiff, CanonicalValue, normalize};
pub use oracle::{ErrorDetail, Oracle, ProbeOutcome, ProbePlan, Verdict, VerdictStatus};
pub use registry::{Expectation, FixtureRegistry, RuleFixture, Selection, Side};
pub use render::{RenderNode, RenderTree};
pub use report::{RunStatus, Summary, summarize};
