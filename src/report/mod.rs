//! Turns vetting verdicts and bounded runs into the caller-facing envelope.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analyze::mentions_dom;
use crate::error::ExecutionError;
use crate::models::{ResultEnvelope, VettingVerdict};
use crate::output::format::format_value;
use crate::sandbox::BoundedRun;

/// Placed ahead of all other logs when the run touched (or talked about) the page.
pub const DOM_NOTICE: &[&str] = &[
    "📝 Note: Running with simulated DOM (no visual output)",
    "💡 Tip: Use the HTML tab + Preview for visual DOM output",
    "",
];

/// Reading an undeclared name, or assigning to one in strict code.
static UNDEFINED_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w+) is not defined|cannot assign to uninitialized global property `(\w+)`")
        .unwrap()
});

/// Rewrite "`x` is not defined" into a hint about declarations; pass anything else through.
pub fn classify_runtime_error(message: &str) -> String {
    let name = UNDEFINED_IDENTIFIER
        .captures(message)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)));

    match name {
        Some(name) => format!(
            "ReferenceError: '{}' is not defined. Did you forget to declare it?",
            name.as_str()
        ),
        None => message.to_string(),
    }
}

/// Envelope for source the vetter refused. Nothing ran, so there are no logs.
pub fn rejected(verdict: &VettingVerdict) -> ResultEnvelope {
    let rule = verdict.matched_rule.clone().unwrap_or_default();
    ResultEnvelope::failed(
        ExecutionError::SecurityRejection { rule }.to_string(),
        Vec::new(),
    )
}

/// Envelope for a request that failed before any source ran.
pub fn failed(err: &ExecutionError) -> ResultEnvelope {
    ResultEnvelope::failed(err.to_string(), Vec::new())
}

/// Build the envelope for a completed bounded run.
///
/// Timeout takes precedence over a thrown error, and both keep the logs
/// recorded before the failure.
pub fn assemble(source: &str, run: BoundedRun, budget: Duration) -> ResultEnvelope {
    let BoundedRun { outcome, record } = run;

    let mut logs = Vec::with_capacity(record.logs.len() + DOM_NOTICE.len());
    if record.dom_touched || mentions_dom(source) {
        logs.extend(DOM_NOTICE.iter().map(|line| line.to_string()));
    }
    logs.extend(record.logs);

    if outcome.timed_out {
        let err = ExecutionError::Timeout {
            budget_ms: budget.as_millis(),
        };
        return ResultEnvelope::failed(err.to_string(), logs);
    }

    if let Some(thrown) = outcome.thrown {
        let err = ExecutionError::RuntimeFault(classify_runtime_error(&thrown));
        tracing::debug!(error = %err, "script raised");
        return ResultEnvelope::failed(err.to_string(), logs);
    }

    let output = outcome
        .returned_value
        .as_ref()
        .map(format_value)
        .unwrap_or_default();
    ResultEnvelope::succeeded(output, logs)
}
