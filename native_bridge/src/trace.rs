// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structured tracing hooks.
//!
//! The core never logs on its own. Hosts that want visibility pass a [`TraceSink`] through
//! [`CallCx`](crate::env::CallCx); the sink declares which families of callbacks it wants via
//! [`TraceMask`], and the core skips building anything the sink did not ask for.
//!
//! `native_bridge_profiling` provides Tracy and `tracing` backed sinks.

use core::ops::BitOr;

use crate::error::DecodeError;
use crate::term::ExecClass;

/// Bitmask selecting which trace callbacks a sink receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceMask(u8);

impl TraceMask {
    /// No callbacks.
    pub const NONE: Self = Self(0);
    /// Scopes around top-level bound-function calls.
    pub const CALL: Self = Self(1 << 0);
    /// Scopes around stepper re-entries, plus suspension and completion events.
    pub const STEP: Self = Self(1 << 1);
    /// Bad-argument and fault events.
    pub const FAILURE: Self = Self(1 << 2);
    /// Every callback.
    pub const ALL: Self = Self(Self::CALL.0 | Self::STEP.0 | Self::FAILURE.0);

    /// Returns `true` if this mask contains every bit in `other`.
    #[must_use]
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl BitOr for TraceMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The kind of scope being entered or exited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind<'a> {
    /// A host call into a bound function.
    Call {
        /// Function name.
        name: &'a str,
        /// Declared arity.
        arity: usize,
        /// Execution class the function was registered with.
        class: ExecClass,
    },
    /// A re-entry stepping a suspended continuation.
    Step {
        /// Name of the function that created the continuation.
        name: &'a str,
        /// 1-based index of this step within the continuation.
        step: u32,
    },
}

impl ScopeKind<'_> {
    /// Returns the mask bit that enables this scope.
    #[must_use]
    #[inline]
    pub const fn mask(&self) -> TraceMask {
        match self {
            Self::Call { .. } => TraceMask::CALL,
            Self::Step { .. } => TraceMask::STEP,
        }
    }
}

/// A point event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TraceEvent<'a> {
    /// A call or step ended with bad arguments.
    BadArg {
        /// Function name.
        name: &'a str,
        /// Why the arguments were rejected.
        reason: &'a DecodeError,
    },
    /// A call or step raised a fault.
    Fault {
        /// Function name.
        name: &'a str,
        /// Diagnostic message handed to the host.
        message: &'a str,
    },
    /// A continuation ran out of budget and was rescheduled.
    Suspended {
        /// Function name.
        name: &'a str,
        /// Steps run so far.
        steps: u32,
        /// Checkpoints passed during the step that just ended.
        checkpoints: u32,
    },
    /// A continuation finished (successfully or with a domain error).
    Finished {
        /// Function name.
        name: &'a str,
        /// Total steps run.
        steps: u32,
    },
}

impl TraceEvent<'_> {
    /// Returns the mask bit that enables this event.
    #[must_use]
    #[inline]
    pub const fn mask(&self) -> TraceMask {
        match self {
            Self::BadArg { .. } | Self::Fault { .. } => TraceMask::FAILURE,
            Self::Suspended { .. } | Self::Finished { .. } => TraceMask::STEP,
        }
    }
}

/// Receiver for trace callbacks.
pub trait TraceSink {
    /// Callback families this sink wants.
    fn mask(&self) -> TraceMask;

    /// Called when a scope starts.
    fn scope_enter(&mut self, kind: ScopeKind<'_>) {
        let _ = kind;
    }

    /// Called when a scope ends. Scopes nest strictly.
    fn scope_exit(&mut self, kind: ScopeKind<'_>) {
        let _ = kind;
    }

    /// Called for point events.
    fn event(&mut self, event: TraceEvent<'_>) {
        let _ = event;
    }
}
