// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Optionals, tuples, arrays and results.

use super::{Decode, Decoder, Encode, Encoder, NilDistinct, Persistent};
use crate::error::DecodeError;
use crate::term::{Term, atoms};

impl<'a, T: Decode<'a>> Decode<'a> for Option<T> {
    const NIL_IS_VALUE: bool = true;

    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        let () = NilDistinct::<'a, T>::ASSERT;
        if d.is_atom(term, atoms::NIL) {
            return Ok(None);
        }
        T::decode(d, term).map(Some)
    }
}

impl<T: Persistent> Persistent for Option<T> {
    fn detach(&mut self) {
        if let Some(v) = self {
            v.detach();
        }
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        match self {
            Some(v) => v.encode(e),
            None => e.atom(atoms::NIL),
        }
    }
}

macro_rules! tuple_codec {
    ($arity:literal; $($name:ident $idx:tt),+) => {
        impl<'a, $($name: Decode<'a>),+> Decode<'a> for ($($name,)+) {
            fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
                let elems = d.tuple_of_arity(term, $arity)?;
                Ok(($($name::decode(d, elems[$idx])?,)+))
            }
        }

        impl<$($name: Persistent),+> Persistent for ($($name,)+) {
            fn detach(&mut self) {
                $(self.$idx.detach();)+
            }
        }

        impl<$($name: Encode),+> Encode for ($($name,)+) {
            fn encode(self, e: &mut Encoder<'_>) -> Term {
                let elems = [$(self.$idx.encode(e)),+];
                e.tuple(&elems)
            }
        }
    };
}

tuple_codec!(1; A 0);
tuple_codec!(2; A 0, B 1);
tuple_codec!(3; A 0, B 1, C 2);
tuple_codec!(4; A 0, B 1, C 2, D 3);
tuple_codec!(5; A 0, B 1, C 2, D 3, E 4);
tuple_codec!(6; A 0, B 1, C 2, D 3, E 4, F 5);
tuple_codec!(7; A 0, B 1, C 2, D 3, E 4, F 5, G 6);
tuple_codec!(8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

impl<'a, T: Decode<'a>, const N: usize> Decode<'a> for [T; N] {
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        let elems = d.tuple_of_arity(term, N)?;
        let items = elems
            .iter()
            .map(|&t| T::decode(d, t))
            .collect::<Result<Vec<T>, _>>()?;
        items.try_into().map_err(|_| DecodeError::ArityMismatch {
            expected: N,
            found: elems.len(),
        })
    }
}

impl<T: Persistent, const N: usize> Persistent for [T; N] {
    fn detach(&mut self) {
        self.iter_mut().for_each(Persistent::detach);
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        let elems: Vec<Term> = self.into_iter().map(|v| v.encode(e)).collect();
        e.tuple(&elems)
    }
}

impl<T: Encode, E: Encode> Encode for Result<T, E> {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        match self {
            Ok(v) => {
                let v = v.encode(e);
                e.tagged(atoms::OK, v)
            }
            Err(err) => {
                let err = err.encode(e);
                e.tagged(atoms::ERROR, err)
            }
        }
    }
}
