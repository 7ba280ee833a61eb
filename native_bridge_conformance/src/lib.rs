// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared fixtures for the `native_bridge` conformance suite.
//!
//! The tests themselves live under `tests/`. This crate only provides a recording trace sink and
//! a few helpers that drive a [`LocalRuntime`] and unpack its outcomes.

use std::sync::Arc;

use parking_lot::Mutex;

use native_bridge::runtime::{CallOutcome, CallReport, LocalRuntime};
use native_bridge::term::Term;
use native_bridge::trace::{ScopeKind, TraceEvent, TraceMask, TraceSink};

/// A trace sink that renders every callback into a shared log.
///
/// Clones share the log, so a test can hand one clone to the runtime and read the other.
#[derive(Clone, Debug)]
pub struct RecordingSink {
    mask: TraceMask,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    /// Creates a sink receiving the callbacks in `mask`.
    #[must_use]
    pub fn new(mask: TraceMask) -> Self {
        Self {
            mask,
            log: Arc::default(),
        }
    }

    /// Recorded lines so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn push(&self, line: String) {
        self.log.lock().push(line);
    }
}

impl TraceSink for RecordingSink {
    fn mask(&self) -> TraceMask {
        self.mask
    }

    fn scope_enter(&mut self, kind: ScopeKind<'_>) {
        self.push(format!("enter {}", render_scope(kind)));
    }

    fn scope_exit(&mut self, kind: ScopeKind<'_>) {
        self.push(format!("exit {}", render_scope(kind)));
    }

    fn event(&mut self, event: TraceEvent<'_>) {
        let line = match event {
            TraceEvent::BadArg { name, reason } => format!("badarg {name}: {reason}"),
            TraceEvent::Fault { name, message } => format!("fault {name}: {message}"),
            TraceEvent::Suspended { name, steps, .. } => format!("suspended {name} after {steps}"),
            TraceEvent::Finished { name, steps } => format!("finished {name} in {steps}"),
        };
        self.push(line);
    }
}

fn render_scope(kind: ScopeKind<'_>) -> String {
    match kind {
        ScopeKind::Call { name, arity, .. } => format!("call {name}/{arity}"),
        ScopeKind::Step { name, step } => format!("step {name}#{step}"),
    }
}

/// Returns the value term of a call, panicking on any other outcome.
#[must_use]
#[track_caller]
pub fn expect_value(report: CallReport) -> Term {
    match report.outcome {
        CallOutcome::Value(term) => term,
        other => panic!("expected a value, got {other:?}"),
    }
}

/// Calls `name` and renders its value term.
#[track_caller]
pub fn call_describe(rt: &mut LocalRuntime, name: &str, argv: &[Term]) -> String {
    let report = match rt.call(name, argv) {
        Ok(report) => report,
        Err(err) => panic!("call failed: {err}"),
    };
    let term = expect_value(report);
    rt.describe(term)
}

/// Renders the reason of a raised exception, panicking on any other outcome.
#[must_use]
#[track_caller]
pub fn raised_reason(rt: &LocalRuntime, report: CallReport) -> String {
    match report.outcome {
        CallOutcome::Raised(reason) => rt.describe(reason),
        other => panic!("expected a raise, got {other:?}"),
    }
}
