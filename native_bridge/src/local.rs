// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-process host.
//!
//! [`LocalEnv`] implements [`Env`] over an append-only term arena. It is not a runtime: there is
//! no garbage collection, and terms stay valid for the life of the env. It does model the host
//! behaviors the core relies on:
//!
//! - atoms are interned, so equal names produce equal terms;
//! - maps keep one entry per key, last write wins;
//! - resources carry an explicit reference count, and the registered destructor runs exactly
//!   once when it drops to zero;
//! - bad-argument and exception outcomes, and scheduled re-entries, are parked in slots the
//!   caller drains after each call.

use core::fmt;
use core::fmt::Write as _;

use hashbrown::HashMap;

use crate::env::{Destructor, Env, ResourceObject, ScheduledCall};
use crate::resource::InvalidHandle;
use crate::term::{ResourceTypeId, Term};

#[derive(Clone, Debug)]
enum Node {
    Int(i128),
    Float(f64),
    Atom(u32),
    Binary(Box<[u8]>),
    Tuple(Box<[Term]>),
    List(Box<[Term]>),
    Map(Box<[(Term, Term)]>),
    Resource(u32),
}

struct LocalResourceType {
    name: Box<str>,
    destructor: Destructor,
}

struct Slot {
    ty: ResourceTypeId,
    object: Option<ResourceObject>,
    refs: u32,
}

/// How the last call ended, when it did not simply return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Raised {
    /// The call failed with bad arguments.
    BadArg,
    /// The call raised an exception with this reason.
    Exception(Term),
}

/// Resource allocation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceStats {
    /// Resources handed to the host.
    pub allocated: usize,
    /// Resources whose destructor ran.
    pub destroyed: usize,
}

impl ResourceStats {
    /// Resources still alive.
    #[must_use]
    #[inline]
    pub fn live(&self) -> usize {
        self.allocated - self.destroyed
    }
}

/// The reference host.
#[derive(Default)]
pub struct LocalEnv {
    nodes: Vec<Node>,
    atoms: Vec<Box<str>>,
    atom_index: HashMap<Box<str>, u32>,
    types: Vec<LocalResourceType>,
    slots: Vec<Slot>,
    stats: ResourceStats,
    exception: Option<Raised>,
    scheduled: Option<ScheduledCall>,
}

fn index_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl LocalEnv {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Node) -> Term {
        let term = Term::from_raw(self.nodes.len() as u64);
        self.nodes.push(node);
        term
    }

    fn node(&self, term: Term) -> Option<&Node> {
        usize::try_from(term.as_raw())
            .ok()
            .and_then(|i| self.nodes.get(i))
    }

    fn slot_of(&self, term: Term) -> Option<u32> {
        match self.node(term)? {
            Node::Resource(slot) => Some(*slot),
            _ => None,
        }
    }

    /// Takes the pending bad-argument or exception outcome.
    pub fn take_exception(&mut self) -> Option<Raised> {
        self.exception.take()
    }

    /// Takes the pending re-entry request.
    pub fn take_scheduled(&mut self) -> Option<ScheduledCall> {
        self.scheduled.take()
    }

    /// Adds a host reference to a resource. Returns `false` if `term` is not a live resource.
    pub fn keep_resource(&mut self, term: Term) -> bool {
        let Some(slot) = self.slot_of(term) else {
            return false;
        };
        let slot = &mut self.slots[slot as usize];
        if slot.object.is_none() {
            return false;
        }
        slot.refs += 1;
        true
    }

    /// Drops a host reference to a resource, running its destructor when the count reaches zero.
    /// Returns `false` if `term` is not a live resource.
    pub fn release_resource(&mut self, term: Term) -> bool {
        let Some(idx) = self.slot_of(term) else {
            return false;
        };
        let slot = &mut self.slots[idx as usize];
        if slot.object.is_none() {
            return false;
        }
        slot.refs -= 1;
        if slot.refs == 0
            && let Some(object) = slot.object.take()
        {
            let destructor = self.types[slot.ty.as_u32() as usize].destructor;
            self.stats.destroyed += 1;
            destructor(object);
        }
        true
    }

    /// Current reference count of a resource, or `None` if it is not a live resource.
    #[must_use]
    pub fn resource_refs(&self, term: Term) -> Option<u32> {
        let slot = &self.slots[self.slot_of(term)? as usize];
        slot.object.as_ref().map(|_| slot.refs)
    }

    /// Resource counters.
    #[must_use]
    #[inline]
    pub fn stats(&self) -> ResourceStats {
        self.stats
    }

    /// Number of terms created so far.
    #[must_use]
    #[inline]
    pub fn term_count(&self) -> usize {
        self.nodes.len()
    }

    /// Structural equality, as the host compares values.
    #[must_use]
    pub fn term_eq(&self, a: Term, b: Term) -> bool {
        if a == b {
            return true;
        }
        match (self.node(a), self.node(b)) {
            (Some(Node::Int(x)), Some(Node::Int(y))) => x == y,
            (Some(Node::Float(x)), Some(Node::Float(y))) => x.to_bits() == y.to_bits(),
            (Some(Node::Atom(x)), Some(Node::Atom(y))) => x == y,
            (Some(Node::Binary(x)), Some(Node::Binary(y))) => x == y,
            (Some(Node::Resource(x)), Some(Node::Resource(y))) => x == y,
            (Some(Node::Tuple(x)), Some(Node::Tuple(y)))
            | (Some(Node::List(x)), Some(Node::List(y))) => {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(&p, &q)| self.term_eq(p, q))
            }
            (Some(Node::Map(x)), Some(Node::Map(y))) => {
                x.len() == y.len()
                    && x.iter().all(|&(k, v)| {
                        y.iter()
                            .any(|&(k2, v2)| self.term_eq(k, k2) && self.term_eq(v, v2))
                    })
            }
            _ => false,
        }
    }

    /// Renders `term` in Erlang-like syntax, for diagnostics and tests.
    #[must_use]
    pub fn describe(&self, term: Term) -> String {
        let mut out = String::new();
        self.describe_into(term, &mut out);
        out
    }

    fn describe_into(&self, term: Term, out: &mut String) {
        let Some(node) = self.node(term) else {
            let _ = write!(out, "#Invalid<{}>", term.as_raw());
            return;
        };
        match node {
            Node::Int(v) => {
                let _ = write!(out, "{v}");
            }
            Node::Float(v) => {
                let _ = write!(out, "{v:?}");
            }
            Node::Atom(a) => out.push_str(&self.atoms[*a as usize]),
            Node::Binary(bytes) => match core::str::from_utf8(bytes) {
                Ok(text) if !text.chars().any(char::is_control) => {
                    let _ = write!(out, "<<{text:?}>>");
                }
                _ => {
                    out.push_str("<<");
                    for (i, b) in bytes.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        let _ = write!(out, "{b}");
                    }
                    out.push_str(">>");
                }
            },
            Node::Tuple(elems) => self.describe_seq(elems, '{', '}', out),
            Node::List(elems) => self.describe_seq(elems, '[', ']', out),
            Node::Map(entries) => {
                out.push_str("#{");
                for (i, &(k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.describe_into(k, out);
                    out.push_str(" => ");
                    self.describe_into(v, out);
                }
                out.push('}');
            }
            Node::Resource(slot) => {
                let ty = self.slots[*slot as usize].ty;
                let name = &self.types[ty.as_u32() as usize].name;
                let _ = write!(out, "#Ref<{name}.{slot}>");
            }
        }
    }

    fn describe_seq(&self, elems: &[Term], open: char, close: char, out: &mut String) {
        out.push(open);
        for (i, &t) in elems.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.describe_into(t, out);
        }
        out.push(close);
    }
}

impl Env for LocalEnv {
    fn make_i64(&mut self, value: i64) -> Term {
        self.push(Node::Int(value.into()))
    }

    fn make_u64(&mut self, value: u64) -> Term {
        self.push(Node::Int(value.into()))
    }

    fn get_i64(&self, term: Term) -> Option<i64> {
        match self.node(term)? {
            Node::Int(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    fn get_u64(&self, term: Term) -> Option<u64> {
        match self.node(term)? {
            Node::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    fn make_f64(&mut self, value: f64) -> Term {
        self.push(Node::Float(value))
    }

    fn get_f64(&self, term: Term) -> Option<f64> {
        match self.node(term)? {
            Node::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn make_atom(&mut self, name: &str) -> Term {
        let id = match self.atom_index.get(name) {
            Some(&id) => id,
            None => {
                let id = index_u32(self.atoms.len());
                self.atoms.push(name.into());
                self.atom_index.insert(name.into(), id);
                id
            }
        };
        self.push(Node::Atom(id))
    }

    fn get_atom(&self, term: Term) -> Option<&str> {
        match self.node(term)? {
            Node::Atom(id) => self.atoms.get(*id as usize).map(|a| &**a),
            _ => None,
        }
    }

    fn make_binary(&mut self, bytes: &[u8]) -> Term {
        self.push(Node::Binary(bytes.into()))
    }

    fn inspect_binary(&self, term: Term) -> Option<&[u8]> {
        match self.node(term)? {
            Node::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    fn make_tuple(&mut self, elems: &[Term]) -> Term {
        self.push(Node::Tuple(elems.into()))
    }

    fn get_tuple(&self, term: Term) -> Option<&[Term]> {
        match self.node(term)? {
            Node::Tuple(elems) => Some(elems),
            _ => None,
        }
    }

    fn make_list(&mut self, elems: &[Term]) -> Term {
        self.push(Node::List(elems.into()))
    }

    fn get_list(&self, term: Term) -> Option<&[Term]> {
        match self.node(term)? {
            Node::List(elems) => Some(elems),
            _ => None,
        }
    }

    fn make_map(&mut self, entries: &[(Term, Term)]) -> Term {
        let mut unique: Vec<(Term, Term)> = Vec::with_capacity(entries.len());
        for &(k, v) in entries {
            match unique.iter_mut().find(|(k2, _)| self.term_eq(k, *k2)) {
                Some(entry) => entry.1 = v,
                None => unique.push((k, v)),
            }
        }
        self.push(Node::Map(unique.into()))
    }

    fn get_map(&self, term: Term) -> Option<&[(Term, Term)]> {
        match self.node(term)? {
            Node::Map(entries) => Some(entries),
            _ => None,
        }
    }

    fn open_resource_type(
        &mut self,
        name: &str,
        destructor: Destructor,
    ) -> Option<ResourceTypeId> {
        if self.types.iter().any(|t| &*t.name == name) {
            return None;
        }
        let id = ResourceTypeId::new(index_u32(self.types.len()));
        self.types.push(LocalResourceType {
            name: name.into(),
            destructor,
        });
        Some(id)
    }

    fn make_resource(&mut self, ty: ResourceTypeId, object: ResourceObject) -> Term {
        let slot = index_u32(self.slots.len());
        self.slots.push(Slot {
            ty,
            object: Some(object),
            refs: 1,
        });
        self.stats.allocated += 1;
        self.push(Node::Resource(slot))
    }

    fn discard_resource(&mut self, term: Term) {
        let _ = self.release_resource(term);
    }

    fn get_resource(&self, term: Term, ty: ResourceTypeId) -> Result<ResourceObject, InvalidHandle> {
        let slot = self.slot_of(term).ok_or(InvalidHandle::NotAResource)?;
        let slot = &self.slots[slot as usize];
        if slot.ty != ty {
            return Err(InvalidHandle::WrongType);
        }
        slot.object.clone().ok_or(InvalidHandle::Stale)
    }

    fn make_badarg(&mut self) -> Term {
        self.exception = Some(Raised::BadArg);
        self.make_atom("badarg")
    }

    fn raise_exception(&mut self, reason: Term) -> Term {
        self.exception = Some(Raised::Exception(reason));
        reason
    }

    fn schedule(&mut self, call: ScheduledCall) -> Term {
        self.scheduled = Some(call);
        self.make_atom("scheduled")
    }
}

impl fmt::Debug for LocalEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEnv")
            .field("terms", &self.nodes.len())
            .field("atoms", &self.atoms.len())
            .field("resource_types", &self.types.len())
            .field("stats", &self.stats)
            .field("exception", &self.exception)
            .field("scheduled", &self.scheduled)
            .finish_non_exhaustive()
    }
}
