// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for the native boundary.
//!
//! Native function bodies report failure through [`Failure`], which the binding layer maps onto
//! the three host-visible outcomes:
//!
//! - [`Failure::BadArg`]: the generic "bad arguments" outcome, shared with arity and decode
//!   failures.
//! - [`Failure::Domain`]: an expected failure, returned to the caller as `{error, E}` data.
//! - [`Failure::Fault`]: something broke; raised in the host as an exception. Panics inside a
//!   body end up here too.

use core::convert::Infallible;
use core::fmt;

use crate::resource::InvalidHandle;

/// A term did not have the shape a native type requires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The term's kind or value range does not match the target type.
    TypeMismatch {
        /// Short name of the expected shape.
        expected: &'static str,
    },
    /// A fixed-arity container (argument list, tuple, array) had the wrong size.
    ArityMismatch {
        /// Declared arity.
        expected: usize,
        /// Arity of the term.
        found: usize,
    },
    /// A resource term failed to rematerialize.
    InvalidHandle(InvalidHandle),
    /// The argument decoded, but the function body rejected its value.
    InvalidArgument(&'static str),
}

impl DecodeError {
    /// Shorthand for [`DecodeError::TypeMismatch`].
    #[must_use]
    #[inline]
    pub const fn mismatch(expected: &'static str) -> Self {
        Self::TypeMismatch { expected }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected } => write!(f, "type mismatch: expected {expected}"),
            Self::ArityMismatch { expected, found } => {
                write!(f, "arity mismatch: expected {expected}, found {found}")
            }
            Self::InvalidHandle(err) => write!(f, "invalid handle: {err}"),
            Self::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
        }
    }
}

impl core::error::Error for DecodeError {}

impl From<InvalidHandle> for DecodeError {
    fn from(err: InvalidHandle) -> Self {
        Self::InvalidHandle(err)
    }
}

/// Failure channel of a native function body.
///
/// `E` is the declared domain error type. Functions without one use the default
/// [`Infallible`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure<E = Infallible> {
    /// Reported to the host as bad arguments.
    BadArg(DecodeError),
    /// An expected failure, encoded as `{error, E}`.
    Domain(E),
    /// An unanticipated fault, raised in the host with this message.
    Fault(String),
}

impl<E> Failure<E> {
    /// Rejects an argument whose value the body found unacceptable.
    #[must_use]
    #[inline]
    pub const fn bad_arg(reason: &'static str) -> Self {
        Self::BadArg(DecodeError::InvalidArgument(reason))
    }

    /// Reports an unanticipated fault.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault(message.into())
    }

    /// Maps the domain error, leaving the other variants untouched.
    pub fn map_domain<F, G>(self, f: G) -> Failure<F>
    where
        G: FnOnce(E) -> F,
    {
        match self {
            Self::BadArg(err) => Failure::BadArg(err),
            Self::Domain(err) => Failure::Domain(f(err)),
            Self::Fault(msg) => Failure::Fault(msg),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadArg(err) => write!(f, "bad argument: {err}"),
            Self::Domain(err) => write!(f, "domain error: {err:?}"),
            Self::Fault(msg) => write!(f, "fault: {msg}"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Failure<E> {}

impl<E> From<DecodeError> for Failure<E> {
    fn from(err: DecodeError) -> Self {
        Self::BadArg(err)
    }
}

impl<E> From<InvalidHandle> for Failure<E> {
    fn from(err: InvalidHandle) -> Self {
        Self::BadArg(DecodeError::InvalidHandle(err))
    }
}

/// Return type of every bound native function.
pub type NativeResult<T, E = Infallible> = Result<T, Failure<E>>;

/// A [`ModuleBuilder`](crate::module::ModuleBuilder) rejected its registration table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleError {
    /// Two functions share a name and arity.
    DuplicateFunction {
        /// Function name.
        name: Box<str>,
        /// Function arity.
        arity: usize,
    },
    /// Two resource types share a host-visible name.
    DuplicateResourceName(Box<str>),
    /// The same native type was registered twice.
    DuplicateResourceType(Box<str>),
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFunction { name, arity } => {
                write!(f, "duplicate function: {name}/{arity}")
            }
            Self::DuplicateResourceName(name) => write!(f, "duplicate resource name: {name}"),
            Self::DuplicateResourceType(name) => {
                write!(f, "resource type registered twice (as {name})")
            }
        }
    }
}

impl core::error::Error for ModuleError {}

/// Module load failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// `load` already ran for this module.
    AlreadyLoaded,
    /// The host refused to open a resource type.
    ResourceTypeRejected {
        /// Name of the rejected resource type.
        name: Box<str>,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyLoaded => write!(f, "module already loaded"),
            Self::ResourceTypeRejected { name } => {
                write!(f, "host rejected resource type: {name}")
            }
        }
    }
}

impl core::error::Error for LoadError {}
