// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cooperative stepping for long-running native work.
//!
//! A [`Resumable`] computation runs in *steps*. Within a step it calls [`Budget::checkpoint`] at
//! points where it could stop; once the budget reports exhaustion it saves its progress in
//! `self` and returns [`Progress::Yield`]. The binding layer then parks the machine in a
//! continuation resource and asks the host to re-enter later, so the host's worker thread is
//! never held for more than about one quantum.
//!
//! ## States
//!
//! ```text
//! Fresh -> Running -> Suspended -> Running -> ... -> Completed | Failed
//! ```
//!
//! The first step runs synchronously inside the original call. A computation that finishes
//! there never allocates a continuation.

use core::fmt;
use core::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;

use crate::binding::{Reply, guard};
use crate::codec::{Decoder, Encode, Encoder};
use crate::env::{CallCx, Env, ScheduledCall};
use crate::error::{DecodeError, Failure, NativeResult};
use crate::registry::Registry;
use crate::resource::{InvalidHandle, ResourceHandle};
use crate::term::{ExecClass, Term};
use crate::trace::{ScopeKind, TraceEvent};

/// Host-visible name of the internal continuation resource type.
pub const CONTINUATION_RESOURCE: &str = "native_bridge.continuation";

/// Host-visible name of the fixed re-entry function.
pub const REENTRY_NAME: &str = "resume_continuation";

const DEFAULT_TIME_SLICE: Duration = Duration::from_micros(990);

/// How much work a single step may do before it should yield.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantum {
    /// Wall-clock time since the step started.
    Time(Duration),
    /// Number of [`Budget::checkpoint`] calls. Deterministic; intended for tests.
    Checkpoints(u32),
    /// Never exhausted.
    Unbounded,
}

impl Default for Quantum {
    fn default() -> Self {
        Self::Time(DEFAULT_TIME_SLICE)
    }
}

/// Scheduling configuration shared by every binding of a module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Budget granted to each step.
    pub quantum: Quantum,
    /// Execution class requested for re-entries.
    pub reentry_class: ExecClass,
}

/// The allowance of one step.
#[derive(Clone, Debug)]
pub struct Budget {
    quantum: Quantum,
    started: Instant,
    checkpoints: u32,
}

impl Budget {
    /// Starts a budget now.
    #[must_use]
    pub fn new(quantum: Quantum) -> Self {
        Self {
            quantum,
            started: Instant::now(),
            checkpoints: 0,
        }
    }

    /// Records a checkpoint and returns `true` if the step should yield.
    pub fn checkpoint(&mut self) -> bool {
        self.checkpoints = self.checkpoints.saturating_add(1);
        match self.quantum {
            Quantum::Time(slice) => self.started.elapsed() >= slice,
            Quantum::Checkpoints(limit) => self.checkpoints >= limit,
            Quantum::Unbounded => false,
        }
    }

    /// Checkpoints recorded so far.
    #[must_use]
    #[inline]
    pub fn checkpoints(&self) -> u32 {
        self.checkpoints
    }

    /// Time since the step started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Result of one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress<T> {
    /// Out of budget; call `step` again later.
    Yield,
    /// Finished with a value.
    Done(T),
}

/// A computation that can be suspended between checkpoints.
///
/// `step` must leave `self` in a state from which the next call continues where this one
/// stopped. Arguments are moved into the machine when it is created, so it never borrows from a
/// call that has already returned.
pub trait Resumable: Send + 'static {
    /// Value produced on completion.
    type Output: Encode;
    /// Domain error type.
    type Error: Encode;

    /// Runs until done or until `budget` is exhausted.
    fn step(&mut self, budget: &mut Budget) -> Result<Progress<Self::Output>, Failure<Self::Error>>;
}

/// Lifecycle of a continuation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepState {
    /// Created, not yet stepped.
    Fresh,
    /// A step is executing.
    Running,
    /// Waiting for re-entry.
    Suspended,
    /// Finished with a value.
    Completed,
    /// Finished with a domain error, bad arguments, or a fault.
    Failed,
}

impl StepState {
    /// Returns `true` for [`StepState::Completed`] and [`StepState::Failed`].
    #[must_use]
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Drives `machine` to completion on the current thread, ignoring yields.
pub fn run_blocking<M: Resumable>(mut machine: M) -> NativeResult<M::Output, M::Error> {
    loop {
        let mut budget = Budget::new(Quantum::Unbounded);
        if let Progress::Done(value) = Resumable::step(&mut machine, &mut budget)? {
            return Ok(value);
        }
    }
}

/// A [`Resumable`] backed by a closure. State lives in the closure's captures.
pub struct FromFn<F>(F);

/// Adapts `f` into a [`Resumable`].
pub fn from_fn<F, T, E>(f: F) -> FromFn<F>
where
    F: FnMut(&mut Budget) -> Result<Progress<T>, Failure<E>> + Send + 'static,
    T: Encode,
    E: Encode,
{
    FromFn(f)
}

impl<F, T, E> Resumable for FromFn<F>
where
    F: FnMut(&mut Budget) -> Result<Progress<T>, Failure<E>> + Send + 'static,
    T: Encode,
    E: Encode,
{
    type Output = T;
    type Error = E;

    fn step(&mut self, budget: &mut Budget) -> Result<Progress<T>, Failure<E>> {
        (self.0)(budget)
    }
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

/// Reports the state of the continuation behind `term`.
pub fn inspect(registry: &Registry, env: &dyn Env, term: Term) -> Result<StepState, InvalidHandle> {
    let handle = ResourceHandle::<Continuation>::rematerialize(Decoder::new(env, registry), term)?;
    Ok(match handle.state.try_lock() {
        Some(state) => state.phase,
        None => StepState::Running,
    })
}

enum StepOutcome {
    Yield,
    Completed(Reply),
    Failed(Reply),
}

trait ErasedMachine: Send {
    fn step(&mut self, budget: &mut Budget, env: &mut dyn Env, registry: &Registry)
    -> StepOutcome;
}

impl<M: Resumable> ErasedMachine for M {
    fn step(
        &mut self,
        budget: &mut Budget,
        env: &mut dyn Env,
        registry: &Registry,
    ) -> StepOutcome {
        match guard(|| Resumable::step(self, budget)) {
            Ok(Progress::Yield) => StepOutcome::Yield,
            Ok(Progress::Done(value)) => {
                StepOutcome::Completed(Reply::from_result::<_, M::Error>(Ok(value), env, registry))
            }
            Err(failure) => StepOutcome::Failed(Reply::from_failure(failure, env, registry)),
        }
    }
}

struct ContinuationState {
    phase: StepState,
    machine: Option<Box<dyn ErasedMachine>>,
    steps: u32,
}

/// Persisted state of a suspended computation, owned by the host as a resource.
pub(crate) struct Continuation {
    name: Box<str>,
    state: Mutex<ContinuationState>,
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Runs the first step of `machine` inside the call that created it.
pub(crate) fn start<M: Resumable>(
    cx: &mut CallCx<'_>,
    env: &mut dyn Env,
    name: &str,
    mut machine: M,
) -> Term {
    let registry = cx.registry();
    let mut budget = Budget::new(registry.config().quantum);
    match ErasedMachine::step(&mut machine, &mut budget, env, registry) {
        StepOutcome::Completed(reply) | StepOutcome::Failed(reply) => {
            cx.event(TraceEvent::Finished { name, steps: 1 });
            reply.into_term(cx, name, env)
        }
        StepOutcome::Yield => {
            let continuation = Continuation {
                name: name.into(),
                state: Mutex::new(ContinuationState {
                    phase: StepState::Suspended,
                    machine: Some(Box::new(machine)),
                    steps: 1,
                }),
            };
            let mut e = Encoder::new(env, registry);
            let term = ResourceHandle::alloc(continuation).encode(&mut e);
            if let Err(message) = e.finish(term) {
                return Reply::Raise(message).into_term(cx, name, env);
            }
            cx.event(TraceEvent::Suspended {
                name,
                steps: 1,
                checkpoints: budget.checkpoints(),
            });
            reschedule(registry, env, term)
        }
    }
}

fn reschedule(registry: &Registry, env: &mut dyn Env, term: Term) -> Term {
    env.schedule(ScheduledCall {
        name: REENTRY_NAME,
        class: registry.config().reentry_class,
        entry: resume_continuation,
        args: vec![term],
    })
}

/// Fixed re-entry point: steps the continuation passed as the only argument.
pub(crate) fn resume_continuation(cx: &mut CallCx<'_>, env: &mut dyn Env, argv: &[Term]) -> Term {
    let registry = cx.registry();
    let &[term] = argv else {
        let reason = DecodeError::ArityMismatch {
            expected: 1,
            found: argv.len(),
        };
        return Reply::BadArg(reason).into_term(cx, REENTRY_NAME, env);
    };
    let handle =
        match ResourceHandle::<Continuation>::rematerialize(Decoder::new(&*env, registry), term) {
            Ok(handle) => handle,
            Err(err) => return Reply::BadArg(err.into()).into_term(cx, REENTRY_NAME, env),
        };
    let name = &*handle.name;
    let Some(mut state) = handle.state.try_lock() else {
        return Reply::Raise("continuation is already running".into()).into_term(cx, name, env);
    };
    if state.phase != StepState::Suspended {
        return Reply::BadArg(InvalidHandle::Stale.into()).into_term(cx, name, env);
    }
    let Some(mut machine) = state.machine.take() else {
        return Reply::BadArg(InvalidHandle::Stale.into()).into_term(cx, name, env);
    };

    state.phase = StepState::Running;
    state.steps = state.steps.saturating_add(1);
    let steps = state.steps;
    let kind = ScopeKind::Step { name, step: steps };
    cx.scope_enter(kind);
    let mut budget = Budget::new(registry.config().quantum);
    let outcome = ErasedMachine::step(&mut *machine, &mut budget, env, registry);
    cx.scope_exit(kind);

    match outcome {
        StepOutcome::Yield => {
            state.phase = StepState::Suspended;
            state.machine = Some(machine);
            cx.event(TraceEvent::Suspended {
                name,
                steps,
                checkpoints: budget.checkpoints(),
            });
            reschedule(registry, env, term)
        }
        StepOutcome::Completed(reply) => {
            state.phase = StepState::Completed;
            cx.event(TraceEvent::Finished { name, steps });
            reply.into_term(cx, name, env)
        }
        StepOutcome::Failed(reply) => {
            state.phase = StepState::Failed;
            cx.event(TraceEvent::Finished { name, steps });
            reply.into_term(cx, name, env)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown(u32);

    impl Resumable for Countdown {
        type Output = u32;
        type Error = ();

        fn step(&mut self, budget: &mut Budget) -> Result<Progress<u32>, Failure<()>> {
            while self.0 > 0 {
                self.0 -= 1;
                if budget.checkpoint() && self.0 > 0 {
                    return Ok(Progress::Yield);
                }
            }
            Ok(Progress::Done(7))
        }
    }

    #[test]
    fn checkpoint_quantum_is_deterministic() {
        let mut budget = Budget::new(Quantum::Checkpoints(2));
        assert!(!budget.checkpoint());
        assert!(budget.checkpoint());
        assert!(budget.checkpoint());
        assert_eq!(budget.checkpoints(), 3);
    }

    #[test]
    fn unbounded_never_exhausts() {
        let mut budget = Budget::new(Quantum::Unbounded);
        assert!((0..10_000).all(|_| !budget.checkpoint()));
    }

    #[test]
    fn zero_time_slice_exhausts_immediately() {
        let mut budget = Budget::new(Quantum::Time(Duration::ZERO));
        assert!(budget.checkpoint());
    }

    #[test]
    fn machine_yields_per_quantum() {
        let mut m = Countdown(5);
        let mut yields = 0;
        loop {
            let mut budget = Budget::new(Quantum::Checkpoints(2));
            match Resumable::step(&mut m, &mut budget) {
                Ok(Progress::Yield) => yields += 1,
                Ok(Progress::Done(v)) => {
                    assert_eq!(v, 7);
                    break;
                }
                Err(_) => unreachable!(),
            }
        }
        assert_eq!(yields, 2);
    }

    #[test]
    fn run_blocking_ignores_budget() {
        assert_eq!(run_blocking(Countdown(1_000)), Ok(7));
    }

    #[test]
    fn from_fn_keeps_state_in_captures() {
        let mut left = 3_u32;
        let m = from_fn(move |budget: &mut Budget| -> Result<Progress<u32>, Failure> {
            while left > 0 {
                left -= 1;
                if budget.checkpoint() {
                    return Ok(Progress::Yield);
                }
            }
            Ok(Progress::Done(0))
        });
        assert_eq!(run_blocking(m), Ok(0));
    }

    #[test]
    fn concurrent_reentry_is_rejected() {
        use crate::local::{LocalEnv, Raised};
        use crate::module::ModuleBuilder;

        let mut module = ModuleBuilder::new("m")
            .scheduler(SchedulerConfig {
                quantum: Quantum::Checkpoints(1),
                ..SchedulerConfig::default()
            })
            .build()
            .unwrap();
        let mut env = LocalEnv::new();
        module.load(&mut env).unwrap();
        let registry = module.registry();

        let handle = ResourceHandle::alloc(Continuation {
            name: "countdown".into(),
            state: Mutex::new(ContinuationState {
                phase: StepState::Suspended,
                machine: Some(Box::new(Countdown(4))),
                steps: 1,
            }),
        });
        let mut e = Encoder::new(&mut env, registry);
        let term = handle.encode(&mut e);
        let term = e.finish(term).unwrap();
        let held =
            ResourceHandle::<Continuation>::rematerialize(Decoder::new(&env, registry), term)
                .unwrap();

        // Another worker is mid-step.
        let lock = held.state.lock();
        assert_eq!(inspect(registry, &env, term), Ok(StepState::Running));
        let mut cx = CallCx::new(registry, None);
        let _ = resume_continuation(&mut cx, &mut env, &[term]);
        assert!(matches!(env.take_exception(), Some(Raised::Exception(_))));
        drop(lock);

        assert_eq!(inspect(registry, &env, term), Ok(StepState::Suspended));
        let mut cx = CallCx::new(registry, None);
        let _ = resume_continuation(&mut cx, &mut env, &[term]);
        assert_eq!(env.take_exception(), None);
        assert!(env.take_scheduled().is_some());
    }

    #[test]
    fn default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.quantum, Quantum::Time(Duration::from_micros(990)));
        assert_eq!(config.reentry_class, ExecClass::Normal);
        assert!(StepState::Failed.is_terminal());
        assert!(!StepState::Suspended.is_terminal());
    }
}
