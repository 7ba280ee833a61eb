// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Untagged alternatives.
//!
//! Decoding tries each alternative in declaration order and keeps the first that succeeds. When
//! two alternatives accept the same term, the earlier one always wins: `Union2<i64, f64>` never
//! yields `B` for an integer, and `Union2<Vec<u8>, String>` never yields `B` at all.

use super::{Decode, Decoder, Encode, Encoder, Persistent};
use crate::error::DecodeError;
use crate::term::Term;

macro_rules! union_codec {
    ($(#[$meta:meta])* $name:ident { $($var:ident),+ }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name<$($var),+> {
            $(
                #[doc = concat!("The `", stringify!($var), "` alternative.")]
                $var($var),
            )+
        }

        impl<'a, $($var: Decode<'a>),+> Decode<'a> for $name<$($var),+> {
            const NIL_IS_VALUE: bool = false $(|| $var::NIL_IS_VALUE)+;

            fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
                $(
                    if let Ok(v) = $var::decode(d, term) {
                        return Ok(Self::$var(v));
                    }
                )+
                Err(DecodeError::mismatch(stringify!($name)))
            }
        }

        impl<$($var: Persistent),+> Persistent for $name<$($var),+> {
            fn detach(&mut self) {
                match self {
                    $(Self::$var(v) => v.detach(),)+
                }
            }
        }

        impl<$($var: Encode),+> Encode for $name<$($var),+> {
            fn encode(self, e: &mut Encoder<'_>) -> Term {
                match self {
                    $(Self::$var(v) => v.encode(e),)+
                }
            }
        }
    };
}

union_codec!(
    /// One of two types.
    Union2 { A, B }
);
union_codec!(
    /// One of three types.
    Union3 { A, B, C }
);
union_codec!(
    /// One of four types.
    Union4 { A, B, C, D }
);
