// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Borrowed binaries.

use core::ops::Deref;

use super::{Decode, Decoder, Encode, Encoder};
use crate::error::DecodeError;
use crate::term::Term;

/// Zero-copy view over a host binary.
///
/// Valid for the duration of the call it was decoded in. Encoding a view hands back the
/// original term without copying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinaryView<'a> {
    term: Term,
    bytes: &'a [u8],
}

impl<'a> BinaryView<'a> {
    /// Returns the viewed bytes.
    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the term this view was decoded from.
    #[must_use]
    #[inline]
    pub fn term(&self) -> Term {
        self.term
    }
}

impl Deref for BinaryView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl<'a> Decode<'a> for BinaryView<'a> {
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        Ok(Self {
            term,
            bytes: d.binary(term)?,
        })
    }
}

impl Encode for BinaryView<'_> {
    fn encode(self, _: &mut Encoder<'_>) -> Term {
        self.term
    }
}
