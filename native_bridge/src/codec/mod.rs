// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversion between host [`Term`]s and native types.
//!
//! Decoding is partial: a term of the wrong shape is a [`DecodeError`]. Encoding is total, with
//! one exception: a [`ResourceHandle`](crate::resource::ResourceHandle) whose type was never
//! registered records a fault on the [`Encoder`] instead of producing a value.
//!
//! ## Composition
//!
//! Converters compose structurally: `Option<T>`, tuples, arrays, `Vec<T>`, maps and the
//! [`Union2`]..[`Union4`] alternatives delegate to their element converters. `Vec<u8>` and
//! `Vec<i8>` are packed host binaries rather than lists.
//!
//! ## `Option` and `nil`
//!
//! The empty optional is the atom `nil`. Wrapping a type for which `nil` is already a valid value
//! would make `None` and `Some(nil)` indistinguishable, so it is rejected when the decoder is
//! instantiated:
//!
//! ```compile_fail
//! use native_bridge::codec::{Decode, Decoder};
//! use native_bridge::term::{Atom, Term};
//!
//! fn decode_optional_atom(d: Decoder<'_>, term: Term) {
//!     let _ = <Option<Atom> as Decode<'_>>::decode(d, term);
//! }
//! # fn main() {
//! #     let mut env = native_bridge::local::LocalEnv::new();
//! #     let registry = native_bridge::registry::Registry::default();
//! #     let t = native_bridge::env::Env::make_atom(&mut env, "nil");
//! #     decode_optional_atom(Decoder::new(&env, &registry), t);
//! # }
//! ```

use core::marker::PhantomData;

use crate::env::{Env, ResourceObject};
use crate::error::DecodeError;
use crate::registry::Registry;
use crate::term::{ResourceTypeId, Term, atoms};

mod binary;
mod collection;
mod composite;
mod primitive;
mod union;

pub use binary::BinaryView;
pub use union::{Union2, Union3, Union4};

/// Conversion from a host term.
///
/// `'a` is the lifetime of the call's host memory; borrowing converters such as `&'a str` and
/// [`BinaryView<'a>`] tie their output to it.
pub trait Decode<'a>: Sized {
    /// `true` if the atom `nil` can decode successfully as `Self`.
    const NIL_IS_VALUE: bool = false;

    /// Decodes `term`.
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError>;

    #[doc(hidden)]
    fn decode_seq(d: Decoder<'a>, term: Term) -> Result<Vec<Self>, DecodeError> {
        d.list(term)?.iter().map(|&t| Self::decode(d, t)).collect()
    }
}

/// A [`Decode`] implementation whose output never borrows from the host.
pub trait DecodeOwned: for<'a> Decode<'a> {}

impl<T> DecodeOwned for T where T: for<'a> Decode<'a> {}

/// A decoded value that stays valid after the call that produced it returns.
///
/// Arguments of resumable functions are moved into a machine that outlives the originating call,
/// so they must be `Persistent`. Raw [`Term`]s are not: a host may invalidate them as soon as the
/// call returns.
pub trait Persistent: DecodeOwned + Send + 'static {
    /// Forgets every term of the originating call that `self` still refers to.
    fn detach(&mut self) {}
}

/// Conversion into a host term.
pub trait Encode {
    /// Encodes `self`.
    fn encode(self, e: &mut Encoder<'_>) -> Term;

    #[doc(hidden)]
    fn encode_seq(items: Vec<Self>, e: &mut Encoder<'_>) -> Term
    where
        Self: Sized,
    {
        let terms: Vec<Term> = items.into_iter().map(|v| v.encode(e)).collect();
        e.list(&terms)
    }
}

/// Read-only decoding context.
#[derive(Clone, Copy)]
pub struct Decoder<'a> {
    env: &'a dyn Env,
    registry: &'a Registry,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over `env`, resolving resource types through `registry`.
    #[inline]
    pub fn new(env: &'a dyn Env, registry: &'a Registry) -> Self {
        Self { env, registry }
    }

    /// Returns the host.
    #[must_use]
    #[inline]
    pub fn env(self) -> &'a dyn Env {
        self.env
    }

    /// Returns the registry used for resource lookups.
    #[must_use]
    #[inline]
    pub fn registry(self) -> &'a Registry {
        self.registry
    }

    /// Decodes `term` as `T`.
    pub fn decode<T: Decode<'a>>(self, term: Term) -> Result<T, DecodeError> {
        T::decode(self, term)
    }

    /// Borrows the elements of a tuple.
    pub fn tuple(self, term: Term) -> Result<&'a [Term], DecodeError> {
        self.env
            .get_tuple(term)
            .ok_or(DecodeError::mismatch("tuple"))
    }

    /// Borrows the elements of a tuple of exactly `arity` elements.
    pub fn tuple_of_arity(self, term: Term, arity: usize) -> Result<&'a [Term], DecodeError> {
        let elems = self.tuple(term)?;
        if elems.len() != arity {
            return Err(DecodeError::ArityMismatch {
                expected: arity,
                found: elems.len(),
            });
        }
        Ok(elems)
    }

    /// Borrows the elements of a list.
    pub fn list(self, term: Term) -> Result<&'a [Term], DecodeError> {
        self.env.get_list(term).ok_or(DecodeError::mismatch("list"))
    }

    /// Borrows the entries of a map.
    pub fn map(self, term: Term) -> Result<&'a [(Term, Term)], DecodeError> {
        self.env.get_map(term).ok_or(DecodeError::mismatch("map"))
    }

    /// Borrows an atom's name.
    pub fn atom(self, term: Term) -> Result<&'a str, DecodeError> {
        self.env.get_atom(term).ok_or(DecodeError::mismatch("atom"))
    }

    /// Borrows a binary's bytes.
    pub fn binary(self, term: Term) -> Result<&'a [u8], DecodeError> {
        self.env
            .inspect_binary(term)
            .ok_or(DecodeError::mismatch("binary"))
    }

    /// Returns `true` if `term` is the atom `name`.
    #[must_use]
    pub fn is_atom(self, term: Term, name: &str) -> bool {
        self.env.get_atom(term) == Some(name)
    }
}

impl core::fmt::Debug for Decoder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Decoder")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Encoding context.
///
/// Holds the first encode fault, if any. Callers that hand the result to the host check it with
/// [`Encoder::finish`]. Resources materialized by a faulted encoder never reach the host, so
/// `finish` discards them again.
pub struct Encoder<'a> {
    env: &'a mut dyn Env,
    registry: &'a Registry,
    fault: Option<String>,
    materialized: Vec<Term>,
}

impl<'a> Encoder<'a> {
    /// Creates an encoder over `env`, resolving resource types through `registry`.
    #[inline]
    pub fn new(env: &'a mut dyn Env, registry: &'a Registry) -> Self {
        Self {
            env,
            registry,
            fault: None,
            materialized: Vec::new(),
        }
    }

    /// Returns the host.
    #[inline]
    pub fn env(&mut self) -> &mut dyn Env {
        &mut *self.env
    }

    /// Returns the registry used for resource lookups.
    #[must_use]
    #[inline]
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Encodes `value`.
    pub fn encode<T: Encode>(&mut self, value: T) -> Term {
        value.encode(self)
    }

    /// Creates (or finds) an atom.
    pub fn atom(&mut self, name: &str) -> Term {
        self.env.make_atom(name)
    }

    /// Creates a tuple.
    pub fn tuple(&mut self, elems: &[Term]) -> Term {
        self.env.make_tuple(elems)
    }

    /// Creates a list.
    pub fn list(&mut self, elems: &[Term]) -> Term {
        self.env.make_list(elems)
    }

    /// Creates a map.
    pub fn map(&mut self, entries: &[(Term, Term)]) -> Term {
        self.env.make_map(entries)
    }

    /// Creates a binary.
    pub fn binary(&mut self, bytes: &[u8]) -> Term {
        self.env.make_binary(bytes)
    }

    /// Hands `object` to the host as a new resource of type `ty`.
    pub fn resource(&mut self, ty: ResourceTypeId, object: ResourceObject) -> Term {
        let term = self.env.make_resource(ty, object);
        self.materialized.push(term);
        term
    }

    /// Creates a `{tag, value}` pair.
    pub fn tagged(&mut self, tag: &str, value: Term) -> Term {
        let tag = self.atom(tag);
        self.tuple(&[tag, value])
    }

    /// Records an encode fault and returns a placeholder term.
    ///
    /// Only the first fault is kept.
    pub fn fail(&mut self, message: String) -> Term {
        self.fault.get_or_insert(message);
        self.env.make_atom(atoms::NIL)
    }

    /// Returns `true` if a fault was recorded.
    #[must_use]
    #[inline]
    pub fn has_failed(&self) -> bool {
        self.fault.is_some()
    }

    /// Returns `term`, or the first recorded fault.
    pub fn finish(mut self, term: Term) -> Result<Term, String> {
        match self.fault.take() {
            Some(message) => {
                self.abandon();
                Err(message)
            }
            None => Ok(term),
        }
    }

    /// Drops the host references of every resource this encoder materialized.
    pub(crate) fn abandon(mut self) {
        for term in self.materialized.drain(..) {
            self.env.discard_resource(term);
        }
    }
}

impl core::fmt::Debug for Encoder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Encoder")
            .field("registry", &self.registry)
            .field("fault", &self.fault)
            .field("materialized", &self.materialized.len())
            .finish_non_exhaustive()
    }
}

/// Post-monomorphization check that `T` never decodes from `nil`.
pub(crate) struct NilDistinct<'a, T>(PhantomData<(&'a (), T)>);

impl<'a, T: Decode<'a>> NilDistinct<'a, T> {
    pub(crate) const ASSERT: () = assert!(
        !T::NIL_IS_VALUE,
        "Option<T> requires a T that cannot decode from `nil`"
    );
}
