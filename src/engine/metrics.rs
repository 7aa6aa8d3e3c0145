//! Dispatch metrics.
//!
//! [`dispatch`](crate::dispatch) returns only the result;
//! [`dispatch_verbose`](crate::dispatch_verbose) also returns a
//! [`DispatchMetrics`] describing what happened to every rule that was looked
//! at. The CLI prints this trace; tests use it to assert that rules after the
//! winner were never evaluated.
//!
//! ```text
//! rule 1  NoMatch    regex did not match
//! rule 2  Rejected   matched, a lookup-backed capture failed validation
//! rule 3  Declined   matched, callback set no template and returned nothing
//! rule 4  Selected   matched, template set          (evaluation stops)
//! rule 5  -          never evaluated
//! ```

use crate::api::Dispatch;
use std::fmt;
use std::time::Duration;

// --- Metrics -----------------------------------------------------------------

/// What happened to one evaluated rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NoMatch,
    Rejected,
    Declined,
    Selected,
    Emitted,
    NotFound,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::NoMatch => "no-match",
            Verdict::Rejected => "rejected",
            Verdict::Declined => "declined",
            Verdict::Selected => "selected",
            Verdict::Emitted => "emitted",
            Verdict::NotFound => "not-found",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTrace {
    /// The rule as declared.
    pub rule: String,
    /// The anchored regex it compiled to.
    pub regex: String,
    pub verdict: Verdict,
}

#[derive(Debug, Default, Clone)]
pub struct DispatchMetrics {
    /// Total elapsed time for the dispatch.
    pub total: Duration,
    /// Time spent in the before hook.
    pub before_hook: Duration,
    /// Rules whose regex was evaluated.
    pub rules_considered: usize,
    /// Rules whose regex matched.
    pub rules_matched: usize,
    /// Matching rules dropped by validation.
    pub rules_rejected: usize,
    /// Lookup round trips made by validators and callbacks.
    pub lookups: usize,
    pub trace: Vec<RuleTrace>,
}

impl DispatchMetrics {
    pub(crate) fn record(&mut self, rule: &str, regex: &str, verdict: Verdict) {
        self.rules_considered += 1;
        if verdict != Verdict::NoMatch {
            self.rules_matched += 1;
        }
        if verdict == Verdict::Rejected {
            self.rules_rejected += 1;
        }
        self.trace.push(RuleTrace { rule: rule.to_string(), regex: regex.to_string(), verdict });
    }
}

/// Dispatch output bundled with metrics.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub dispatch: Dispatch,
    pub metrics: DispatchMetrics,
}
