// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::resolver::{DefaultLabelResolver, LabelResolver, default_call_label, default_step_label};
use native_bridge::trace::{ScopeKind, TraceEvent, TraceMask, TraceSink};
use std::string::String;
use std::vec::Vec;

type BackendGuard = tracy_client::Span;

/// Identity of an open scope, owned so it outlives the callback's borrow.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ScopeKey {
    Call { name: String, arity: usize },
    Step { name: String, step: u32 },
}

impl ScopeKey {
    fn matches(&self, kind: ScopeKind<'_>) -> bool {
        match (self, kind) {
            (Self::Call { name, arity }, ScopeKind::Call { name: n, arity: a, .. }) => {
                name == n && *arity == a
            }
            (Self::Step { name, step }, ScopeKind::Step { name: n, step: s }) => {
                name == n && *step == s
            }
            _ => false,
        }
    }
}

impl From<ScopeKind<'_>> for ScopeKey {
    fn from(kind: ScopeKind<'_>) -> Self {
        match kind {
            ScopeKind::Call { name, arity, .. } => Self::Call {
                name: name.to_owned(),
                arity,
            },
            ScopeKind::Step { name, step } => Self::Step {
                name: name.to_owned(),
                step,
            },
        }
    }
}

struct ScopeEntry {
    key: ScopeKey,
    // Keep the label alive for backends that may borrow it.
    label: String,
    guard: Option<BackendGuard>,
}

/// A `TraceSink` that emits Tracy zones via `tracy-client`.
///
/// When no Tracy client is running, scopes are still tracked but nothing is emitted.
pub struct ProfilingTraceSink<R = DefaultLabelResolver> {
    resolver: R,
    stack: Vec<ScopeEntry>,
}

impl ProfilingTraceSink<DefaultLabelResolver> {
    /// Create a new sink with name-based labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: LabelResolver> ProfilingTraceSink<R> {
    /// Create a new sink with a custom label resolver.
    #[must_use]
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            stack: Vec::new(),
        }
    }

    /// Number of scopes currently open.
    #[must_use]
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn on_scope_enter(&mut self, kind: ScopeKind<'_>) {
        let label = self.resolve_label(kind);
        let guard = self.start_scope(kind, &label);
        self.stack.push(ScopeEntry {
            key: kind.into(),
            label,
            guard,
        });
    }

    fn on_scope_exit(&mut self, kind: ScopeKind<'_>) {
        if let Some(top) = self.stack.last()
            && top.key.matches(kind)
        {
            if let Some(entry) = self.stack.pop() {
                let ScopeEntry {
                    label: _label,
                    guard: _guard,
                    ..
                } = entry;
                let _ = (_label, _guard);
            }
            return;
        }
        // If the stack got out of sync, drop any active scopes to avoid leaking.
        self.drop_active_scopes();
    }

    fn resolve_label(&mut self, kind: ScopeKind<'_>) -> String {
        match kind {
            ScopeKind::Call { name, arity, class } => self
                .resolver
                .call_label(name, arity, class)
                .unwrap_or_else(|| default_call_label(name, arity)),
            ScopeKind::Step { name, step } => self
                .resolver
                .step_label(name, step)
                .unwrap_or_else(|| default_step_label(name)),
        }
    }

    fn start_scope(&self, kind: ScopeKind<'_>, label: &str) -> Option<BackendGuard> {
        let (function_name, line) = match kind {
            ScopeKind::Call { .. } => ("native_bridge.call", 0),
            ScopeKind::Step { step, .. } => ("native_bridge.step", step),
        };
        let client = tracy_client::Client::running()?;
        Some(client.span_alloc(Some(label), function_name, "native_bridge", line, 0))
    }

    fn on_event(&self, event: TraceEvent<'_>) {
        let Some(client) = tracy_client::Client::running() else {
            return;
        };
        let text = match event {
            TraceEvent::BadArg { name, reason } => format!("badarg in {name}: {reason}"),
            TraceEvent::Fault { name, message } => format!("fault in {name}: {message}"),
            TraceEvent::Suspended { .. } | TraceEvent::Finished { .. } => return,
        };
        client.message(&text, 0);
    }

    // Drop in LIFO order so nested spans close inner-to-outer.
    fn drop_active_scopes(&mut self) {
        while let Some(entry) = self.stack.pop() {
            let ScopeEntry {
                label: _label,
                guard: _guard,
                ..
            } = entry;
            let _ = (_label, _guard);
        }
    }
}

impl<R: LabelResolver> TraceSink for ProfilingTraceSink<R> {
    fn mask(&self) -> TraceMask {
        TraceMask::CALL | TraceMask::STEP | TraceMask::FAILURE
    }

    fn scope_enter(&mut self, kind: ScopeKind<'_>) {
        self.on_scope_enter(kind);
    }

    fn scope_exit(&mut self, kind: ScopeKind<'_>) {
        self.on_scope_exit(kind);
    }

    fn event(&mut self, event: TraceEvent<'_>) {
        self.on_event(event);
    }
}

impl<R> Default for ProfilingTraceSink<R>
where
    R: LabelResolver + Default,
{
    fn default() -> Self {
        Self::with_resolver(R::default())
    }
}

impl<R> std::fmt::Debug for ProfilingTraceSink<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilingTraceSink")
            .field("stack_depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}
