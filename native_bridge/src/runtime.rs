// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A minimal scheduler driving a [`Module`] on a [`LocalEnv`].
//!
//! `LocalRuntime` plays the host's part end to end: it loads the module, looks functions up by
//! name and arity, runs scheduled re-entries until the call settles, and releases the
//! continuation once its chain ends.

use core::fmt;

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::env::{CallCx, ScheduledCall};
use crate::error::{DecodeError, LoadError};
use crate::local::{LocalEnv, Raised};
use crate::module::Module;
use crate::term::Term;
use crate::trace::TraceSink;

/// Final outcome of a call, as the host sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call returned a value.
    Value(Term),
    /// The call failed with bad arguments.
    BadArg,
    /// The call raised an exception with this reason.
    Raised(Term),
}

/// Result of one scheduler hop.
#[derive(Debug)]
pub enum Dispatched {
    /// The call settled.
    Done(CallOutcome),
    /// The call asked to be re-entered.
    Scheduled(ScheduledCall),
}

/// A call driven to completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallReport {
    /// How the call ended.
    pub outcome: CallOutcome,
    /// Scheduler hops taken: the initial call plus every re-entry.
    pub steps: u32,
}

/// The runtime could not start or route a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    /// No function with this name and arity.
    UndefinedFunction {
        /// Requested name.
        name: Box<str>,
        /// Requested arity.
        arity: usize,
    },
    /// The module failed to load.
    Load(LoadError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedFunction { name, arity } => {
                write!(f, "undefined function: {name}/{arity}")
            }
            Self::Load(err) => write!(f, "load failed: {err}"),
        }
    }
}

impl core::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::UndefinedFunction { .. } => None,
        }
    }
}

impl From<LoadError> for RuntimeError {
    fn from(err: LoadError) -> Self {
        Self::Load(err)
    }
}

/// The reference host's scheduler.
pub struct LocalRuntime {
    env: LocalEnv,
    module: Module,
    sink: Option<Box<dyn TraceSink>>,
}

impl LocalRuntime {
    /// Loads `module` into a fresh [`LocalEnv`].
    pub fn new(mut module: Module) -> Result<Self, RuntimeError> {
        let mut env = LocalEnv::new();
        module.load(&mut env)?;
        Ok(Self {
            env,
            module,
            sink: None,
        })
    }

    /// Routes trace callbacks of every subsequent call to `sink`.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Takes the trace sink back.
    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.sink.take()
    }

    /// The host.
    #[must_use]
    #[inline]
    pub fn env(&self) -> &LocalEnv {
        &self.env
    }

    /// The host, mutably.
    #[inline]
    pub fn env_mut(&mut self) -> &mut LocalEnv {
        &mut self.env
    }

    /// The loaded module.
    #[must_use]
    #[inline]
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Encodes `value` into a term owned by this runtime's host.
    pub fn encode<T: Encode>(&mut self, value: T) -> Result<Term, String> {
        let mut e = Encoder::new(&mut self.env, self.module.registry());
        let term = value.encode(&mut e);
        e.finish(term)
    }

    /// Decodes a term owned by this runtime's host.
    pub fn decode<'s, T: Decode<'s>>(&'s self, term: Term) -> Result<T, DecodeError> {
        Decoder::new(&self.env, self.module.registry()).decode(term)
    }

    /// Renders a term for diagnostics.
    #[must_use]
    pub fn describe(&self, term: Term) -> String {
        self.env.describe(term)
    }

    /// Makes one call and returns after the first hop.
    pub fn dispatch(&mut self, name: &str, argv: &[Term]) -> Result<Dispatched, RuntimeError> {
        let entry =
            self.module
                .function(name, argv.len())
                .ok_or_else(|| RuntimeError::UndefinedFunction {
                    name: name.into(),
                    arity: argv.len(),
                })?;
        let sink = self.sink.as_deref_mut().map(|s| s as &mut dyn TraceSink);
        let mut cx = CallCx::new(self.module.registry(), sink);
        let term = entry.call(&mut cx, &mut self.env, argv);
        Ok(self.settle(term))
    }

    /// Runs one scheduled re-entry.
    pub fn resume(&mut self, call: &ScheduledCall) -> Dispatched {
        let sink = self.sink.as_deref_mut().map(|s| s as &mut dyn TraceSink);
        let mut cx = CallCx::new(self.module.registry(), sink);
        let term = (call.entry)(&mut cx, &mut self.env, &call.args);
        self.settle(term)
    }

    /// Makes one call and runs re-entries until it settles.
    ///
    /// Once the chain ends, the host reference held by the scheduled arguments is released, so
    /// the continuation is destroyed.
    pub fn call(&mut self, name: &str, argv: &[Term]) -> Result<CallReport, RuntimeError> {
        let mut steps = 1_u32;
        let mut last: Option<ScheduledCall> = None;
        let mut next = self.dispatch(name, argv)?;
        let outcome = loop {
            match next {
                Dispatched::Done(outcome) => break outcome,
                Dispatched::Scheduled(call) => {
                    steps += 1;
                    next = self.resume(&call);
                    last = Some(call);
                }
            }
        };
        if let Some(call) = last {
            for &arg in &call.args {
                self.env.release_resource(arg);
            }
        }
        Ok(CallReport { outcome, steps })
    }

    fn settle(&mut self, term: Term) -> Dispatched {
        match self.env.take_exception() {
            Some(Raised::BadArg) => Dispatched::Done(CallOutcome::BadArg),
            Some(Raised::Exception(reason)) => Dispatched::Done(CallOutcome::Raised(reason)),
            None => match self.env.take_scheduled() {
                Some(call) => Dispatched::Scheduled(call),
                None => Dispatched::Done(CallOutcome::Value(term)),
            },
        }
    }
}

impl fmt::Debug for LocalRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRuntime")
            .field("env", &self.env)
            .field("module", &self.module)
            .field("traced", &self.sink.is_some())
            .finish()
    }
}
