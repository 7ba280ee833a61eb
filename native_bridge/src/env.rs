// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host contract.
//!
//! [`Env`] is everything the core needs from the host runtime during one call: building and
//! inspecting terms, handing native objects over as resources, raising exceptions, and asking
//! for a later re-entry. The host owns term storage and resource lifetimes; the core never
//! frees anything itself.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use crate::registry::Registry;
use crate::resource::InvalidHandle;
use crate::term::{ExecClass, ResourceTypeId, Term};
use crate::trace::{ScopeKind, TraceEvent, TraceSink};

/// A native object as the host stores it.
pub type ResourceObject = Arc<dyn Any + Send + Sync>;

/// Per-type destructor the host invokes when a resource's reference count reaches zero.
pub type Destructor = fn(ResourceObject);

/// Entry point the host invokes for a scheduled re-entry.
pub type ReentryFn = fn(&mut CallCx<'_>, &mut dyn Env, &[Term]) -> Term;

/// Host-side operations available to native code during a call.
pub trait Env {
    /// Creates an integer term.
    fn make_i64(&mut self, value: i64) -> Term;
    /// Creates an integer term.
    fn make_u64(&mut self, value: u64) -> Term;
    /// Reads an integer term that fits in `i64`.
    fn get_i64(&self, term: Term) -> Option<i64>;
    /// Reads an integer term that fits in `u64`.
    fn get_u64(&self, term: Term) -> Option<u64>;

    /// Creates a float term.
    fn make_f64(&mut self, value: f64) -> Term;
    /// Reads a float term. Integer terms are not floats.
    fn get_f64(&self, term: Term) -> Option<f64>;

    /// Creates (or finds) the atom named `name`.
    fn make_atom(&mut self, name: &str) -> Term;
    /// Reads an atom's name.
    fn get_atom(&self, term: Term) -> Option<&str>;

    /// Creates a binary holding a copy of `bytes`.
    fn make_binary(&mut self, bytes: &[u8]) -> Term;
    /// Borrows the bytes of a binary term.
    fn inspect_binary(&self, term: Term) -> Option<&[u8]>;

    /// Creates a fixed-arity tuple.
    fn make_tuple(&mut self, elems: &[Term]) -> Term;
    /// Borrows the elements of a tuple term.
    fn get_tuple(&self, term: Term) -> Option<&[Term]>;

    /// Creates an ordered sequence.
    fn make_list(&mut self, elems: &[Term]) -> Term;
    /// Borrows the elements of a list term.
    fn get_list(&self, term: Term) -> Option<&[Term]>;

    /// Creates a map. Keys are unique under host equality; a repeated key keeps its last value.
    fn make_map(&mut self, entries: &[(Term, Term)]) -> Term;
    /// Borrows the entries of a map term, in unspecified order.
    fn get_map(&self, term: Term) -> Option<&[(Term, Term)]>;

    /// Registers a resource type. Returns `None` if the host refuses.
    fn open_resource_type(&mut self, name: &str, destructor: Destructor)
    -> Option<ResourceTypeId>;
    /// Hands `object` to the host. The returned term holds the host's first reference.
    fn make_resource(&mut self, ty: ResourceTypeId, object: ResourceObject) -> Term;
    /// Drops the reference [`Env::make_resource`] created for a term that never reached the host.
    fn discard_resource(&mut self, term: Term);
    /// Looks up the object behind a resource term, checking its type tag.
    fn get_resource(&self, term: Term, ty: ResourceTypeId) -> Result<ResourceObject, InvalidHandle>;

    /// Flags the current call as failed with bad arguments and returns the term to hand back.
    fn make_badarg(&mut self) -> Term;
    /// Flags the current call as raising `reason` and returns the term to hand back.
    fn raise_exception(&mut self, reason: Term) -> Term;
    /// Asks the host to invoke `call` later instead of returning a value now.
    fn schedule(&mut self, call: ScheduledCall) -> Term;
}

/// A deferred invocation requested through [`Env::schedule`].
#[derive(Clone)]
pub struct ScheduledCall {
    /// Name the host shows for the re-entry.
    pub name: &'static str,
    /// Pool the re-entry should run on.
    pub class: ExecClass,
    /// Function to invoke.
    pub entry: ReentryFn,
    /// Arguments for `entry`.
    pub args: Vec<Term>,
}

impl fmt::Debug for ScheduledCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledCall")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Per-call context threaded from the host into every dispatcher.
///
/// Carries the loaded [`Registry`] and an optional trace sink.
pub struct CallCx<'a> {
    registry: &'a Registry,
    sink: Option<&'a mut dyn TraceSink>,
}

impl<'a> CallCx<'a> {
    /// Creates a call context.
    #[inline]
    pub fn new(registry: &'a Registry, sink: Option<&'a mut dyn TraceSink>) -> Self {
        Self { registry, sink }
    }

    /// Returns the registry of the module being called.
    #[must_use]
    #[inline]
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub(crate) fn scope_enter(&mut self, kind: ScopeKind<'_>) {
        if let Some(sink) = self.sink.as_deref_mut()
            && sink.mask().contains(kind.mask())
        {
            sink.scope_enter(kind);
        }
    }

    pub(crate) fn scope_exit(&mut self, kind: ScopeKind<'_>) {
        if let Some(sink) = self.sink.as_deref_mut()
            && sink.mask().contains(kind.mask())
        {
            sink.scope_exit(kind);
        }
    }

    pub(crate) fn event(&mut self, event: TraceEvent<'_>) {
        if let Some(sink) = self.sink.as_deref_mut()
            && sink.mask().contains(event.mask())
        {
            sink.event(event);
        }
    }
}

impl fmt::Debug for CallCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallCx")
            .field("registry", &self.registry)
            .field("traced", &self.sink.is_some())
            .finish()
    }
}
