// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native objects owned by the host as opaque, reference-counted handles.
//!
//! ## Lifecycle
//!
//! 1. [`ResourceHandle::alloc`] builds the object on the native side.
//! 2. Encoding the handle *materializes* it: the object is registered with the host under its
//!    type's [`ResourceTypeId`] and the handle is consumed, so this happens at most once per
//!    allocation.
//! 3. Decoding a resource term *rematerializes* it into a new handle sharing the same object,
//!    after checking the term's type tag and the object's native type.
//! 4. When the host's reference count reaches zero it calls the destructor registered for the
//!    type. The core never destroys a materialized object itself.
//!
//! A rematerialized handle remembers its term and encodes back to it. Handles passed to a
//! resumable function are [detached](Persistent::detach) first, since that term belongs to a call
//! which has returned by the time the machine finishes; encoding a detached handle materializes
//! the same object again under a fresh host reference.

use core::fmt;
use core::ops::Deref;
use std::sync::Arc;

use crate::codec::{Decode, Decoder, Encode, Encoder, Persistent};
use crate::env::ResourceObject;
use crate::error::DecodeError;
use crate::term::Term;

/// A resource term failed to rematerialize.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvalidHandle {
    /// The native type was never registered with the module.
    Unregistered,
    /// The term is not a resource.
    NotAResource,
    /// The term is a resource of another type.
    WrongType,
    /// The resource was already destroyed, or its continuation already finished.
    Stale,
}

impl fmt::Display for InvalidHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered => write!(f, "resource type not registered"),
            Self::NotAResource => write!(f, "term is not a resource"),
            Self::WrongType => write!(f, "resource type mismatch"),
            Self::Stale => write!(f, "stale resource"),
        }
    }
}

impl core::error::Error for InvalidHandle {}

/// A native object that is, or will be, owned by the host.
///
/// Handles are not `Clone`: an unmaterialized handle is the only owner of its object, and
/// materializing it twice would register the same object twice.
pub struct ResourceHandle<T> {
    object: Arc<T>,
    term: Option<Term>,
}

impl<T> ResourceHandle<T>
where
    T: Send + Sync + 'static,
{
    /// Allocates a new, not yet materialized handle.
    #[must_use]
    pub fn alloc(value: T) -> Self {
        Self {
            object: Arc::new(value),
            term: None,
        }
    }

    /// Borrows the wrapped object.
    #[must_use]
    #[inline]
    pub fn get(&self) -> &T {
        &self.object
    }

    /// Returns the host term for this handle, once materialized or rematerialized.
    #[must_use]
    #[inline]
    pub fn term(&self) -> Option<Term> {
        self.term
    }

    /// Returns `true` if both handles wrap the same object.
    #[must_use]
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.object, &b.object)
    }

    /// Rematerializes `term` as a handle of this type.
    pub fn rematerialize(d: Decoder<'_>, term: Term) -> Result<Self, InvalidHandle> {
        let ty = d
            .registry()
            .resource_type_id::<T>()
            .ok_or(InvalidHandle::Unregistered)?;
        let object: ResourceObject = d.env().get_resource(term, ty)?;
        let object = object
            .downcast::<T>()
            .map_err(|_| InvalidHandle::WrongType)?;
        Ok(Self {
            object,
            term: Some(term),
        })
    }
}

impl<T> Deref for ResourceHandle<T>
where
    T: Send + Sync + 'static,
{
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("type", &core::any::type_name::<T>())
            .field("term", &self.term)
            .finish_non_exhaustive()
    }
}

impl<'a, T> Decode<'a> for ResourceHandle<T>
where
    T: Send + Sync + 'static,
{
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        Ok(Self::rematerialize(d, term)?)
    }
}

impl<T> Persistent for ResourceHandle<T>
where
    T: Send + Sync + 'static,
{
    fn detach(&mut self) {
        self.term = None;
    }
}

impl<T> Encode for ResourceHandle<T>
where
    T: Send + Sync + 'static,
{
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        if let Some(term) = self.term {
            return term;
        }
        match e.registry().resource_type_id::<T>() {
            Some(ty) => e.resource(ty, self.object),
            None => e.fail(format!(
                "resource type {} was not registered",
                core::any::type_name::<T>()
            )),
        }
    }
}

/// Destructor registered for every resource type: releases the host's reference.
pub(crate) fn release_object<T>(object: ResourceObject)
where
    T: Send + Sync + 'static,
{
    debug_assert!(object.is::<T>(), "destructor invoked for another resource type");
    // `T::drop` runs here unless a call still holds a rematerialized handle.
    drop(object);
}
