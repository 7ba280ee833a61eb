// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host value references and the small value types that name host concepts.
//!
//! A [`Term`] is owned by the host runtime. Native code never looks inside one directly; it goes
//! through [`Env`](crate::env::Env) or the [codec](crate::codec).

use core::borrow::Borrow;
use core::fmt;

/// Names of the atoms the codec gives meaning to.
pub mod atoms {
    /// Sentinel for an empty optional.
    pub const NIL: &str = "nil";
    /// Boolean `true`.
    pub const TRUE: &str = "true";
    /// Boolean `false`.
    pub const FALSE: &str = "false";
    /// Success tag of a result tuple. Also the encoding of `()`.
    pub const OK: &str = "ok";
    /// Failure tag of a result tuple.
    pub const ERROR: &str = "error";
}

/// An opaque reference to a host-owned value.
///
/// The raw bits are chosen by the host; equality of two `Term`s says nothing about equality of
/// the values they reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Term(u64);

impl Term {
    /// Wraps host-chosen raw bits.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw bits backing this term.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

/// Host-assigned identifier of a registered resource type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ResourceTypeId(u32);

impl ResourceTypeId {
    /// Creates a resource type id.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer backing this id.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// A symbolic host constant.
///
/// `Atom` cannot be wrapped in `Option`: the empty optional is itself the atom `nil`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Atom(Box<str>);

impl Atom {
    /// Creates an atom from its name.
    #[inline]
    pub fn new(name: impl Into<Box<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the atom's name.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Atom {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Borrow<str> for Atom {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Atom {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Routing hint telling the host which worker pool should run a call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecClass {
    /// Latency-sensitive scheduler; the call must return (or yield) quickly.
    #[default]
    Normal,
    /// Pool for CPU-heavy work.
    CpuBound,
    /// Pool for calls that block on I/O.
    IoBound,
}

impl fmt::Display for ExecClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::CpuBound => write!(f, "cpu_bound"),
            Self::IoBound => write!(f, "io_bound"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_compares_against_str() {
        let a = Atom::new("ok");
        assert_eq!(a, "ok");
        assert_eq!(a.as_str(), atoms::OK);
        assert_ne!(Atom::from("error"), a);
    }

    #[test]
    fn term_raw_bits_roundtrip() {
        assert_eq!(Term::from_raw(17).as_raw(), 17);
        assert_eq!(ResourceTypeId::new(3).as_u32(), 3);
    }
}
