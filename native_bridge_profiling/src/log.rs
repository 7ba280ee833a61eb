// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use native_bridge::trace::{ScopeKind, TraceEvent, TraceMask, TraceSink};
use std::vec::Vec;
use tracing::span::EnteredSpan;
use tracing::{debug, debug_span, trace, trace_span, warn};

/// A `TraceSink` that forwards callbacks to `tracing`.
///
/// Calls open `debug` spans and steps open `trace` spans. Faults are logged at `warn`, bad
/// arguments at `debug`, suspensions at `trace`.
pub struct LogTraceSink {
    mask: TraceMask,
    spans: Vec<EnteredSpan>,
}

impl LogTraceSink {
    /// Create a sink that receives every callback.
    #[must_use]
    pub fn new() -> Self {
        Self::with_mask(TraceMask::ALL)
    }

    /// Create a sink that only receives the callbacks in `mask`.
    #[must_use]
    pub fn with_mask(mask: TraceMask) -> Self {
        Self {
            mask,
            spans: Vec::new(),
        }
    }

    /// Number of spans currently entered.
    #[must_use]
    #[inline]
    pub fn depth(&self) -> usize {
        self.spans.len()
    }
}

impl TraceSink for LogTraceSink {
    fn mask(&self) -> TraceMask {
        self.mask
    }

    fn scope_enter(&mut self, kind: ScopeKind<'_>) {
        let span = match kind {
            ScopeKind::Call { name, arity, class } => {
                debug_span!("call", function = name, arity, %class)
            }
            ScopeKind::Step { name, step } => trace_span!("step", function = name, step),
        };
        self.spans.push(span.entered());
    }

    fn scope_exit(&mut self, _kind: ScopeKind<'_>) {
        // Scopes nest strictly; the innermost entered span is the one closing.
        drop(self.spans.pop());
    }

    fn event(&mut self, event: TraceEvent<'_>) {
        match event {
            TraceEvent::BadArg { name, reason } => {
                debug!(function = name, %reason, "bad argument");
            }
            TraceEvent::Fault { name, message } => {
                warn!(function = name, detail = message, "native call raised");
            }
            TraceEvent::Suspended {
                name,
                steps,
                checkpoints,
            } => {
                trace!(function = name, steps, checkpoints, "suspended");
            }
            TraceEvent::Finished { name, steps } => {
                debug!(function = name, steps, "continuation finished");
            }
        }
    }
}

impl Default for LogTraceSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogTraceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogTraceSink")
            .field("mask", &self.mask)
            .field("depth", &self.spans.len())
            .finish()
    }
}
