#![forbid(unsafe_code)]

//! Run summary.

use serde::Serialize;

use crate::oracle::{Verdict, VerdictStatus};

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failure,
}

impl RunStatus {
    /// Process exit code for this status.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

/// Aggregated verdicts, in the order the oracle produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub equivalent_count: usize,
    pub diverged_count: usize,
    pub errored_count: usize,
    pub status: RunStatus,
    pub details: Vec<Verdict>,
}

/// Fold verdicts into a [`Summary`].
#[must_use]
pub fn summarize(verdicts: Vec<Verdict>) -> Summary {
    let count = |status: VerdictStatus| verdicts.iter().filter(|v| v.status == status).count();
    let equivalent_count = count(VerdictStatus::Equivalent);
    let diverged_count = count(VerdictStatus::Diverged);
    let errored_count = count(VerdictStatus::Errored);
    let status = if equivalent_count == verdicts.len() {
        RunStatus::Success
    } else {
        RunStatus::Failure
    };
    Summary {
        total: verdicts.len(),
        equivalent_count,
        diverged_count,
        errored_count,
        status,
        details: verdicts,
    }
}

impl Summary {
    /// True when every verdict is `Equivalent`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Verdicts whose outcome differs from the fixture's declared expectation.
    #[must_use]
    pub fn unexpected(&self) -> Vec<&Verdict> {
        self.details
            .iter()
            .filter(|verdict| !verdict.meets_expectation())
            .collect()
    }

    /// Status judged against declared expectations rather than strict
    /// equivalence.
    #[must_use]
    pub fn status_against_expectations(&self) -> RunStatus {
        if self.unexpected().is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Failure
        }
    }

    /// One line per fixture followed by a totals line.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for verdict in &self.details {
            out.push_str(&verdict.to_string());
            out.push('\n');
        }
        out.push_str(&self.totals_line());
        out.push('\n');
        out
    }

    #[must_use]
    pub fn totals_line(&self) -> String {
        format!(
            "{} fixtures: {} equivalent, {} diverged, {} errored",
            self.total, self.equivalent_count, self.diverged_count, self.errored_count
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
