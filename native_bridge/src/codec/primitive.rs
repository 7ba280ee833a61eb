// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scalars, strings, atoms and raw terms.

use core::convert::Infallible;

use super::{Decode, Decoder, Encode, Encoder, Persistent};
use crate::error::DecodeError;
use crate::term::{Atom, Term, atoms};

macro_rules! int_codec {
    ($get:ident, $make:ident, $wide:ty, $($t:ty),* $(,)?) => {$(
        impl<'a> Decode<'a> for $t {
            fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
                let v = d
                    .env()
                    .$get(term)
                    .ok_or(DecodeError::mismatch(stringify!($t)))?;
                <$t>::try_from(v).map_err(|_| DecodeError::mismatch(stringify!($t)))
            }
        }

        impl Encode for $t {
            fn encode(self, e: &mut Encoder<'_>) -> Term {
                e.env().$make(<$wide>::from(self))
            }
        }
    )*};
}

macro_rules! size_codec {
    ($get:ident, $make:ident, $wide:ty, $t:ty) => {
        impl<'a> Decode<'a> for $t {
            fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
                let v = d
                    .env()
                    .$get(term)
                    .ok_or(DecodeError::mismatch(stringify!($t)))?;
                <$t>::try_from(v).map_err(|_| DecodeError::mismatch(stringify!($t)))
            }
        }

        impl Encode for $t {
            fn encode(self, e: &mut Encoder<'_>) -> Term {
                match <$wide>::try_from(self) {
                    Ok(v) => e.env().$make(v),
                    Err(_) => e.fail(format!("{self} does not fit a host integer")),
                }
            }
        }
    };
}

int_codec!(get_i64, make_i64, i64, i16, i32, i64);
int_codec!(get_u64, make_u64, u64, u16, u32, u64);
size_codec!(get_i64, make_i64, i64, isize);
size_codec!(get_u64, make_u64, u64, usize);

// `u8` and `i8` sequences travel as packed binaries.

impl<'a> Decode<'a> for u8 {
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        let v = d.env().get_u64(term).ok_or(DecodeError::mismatch("u8"))?;
        Self::try_from(v).map_err(|_| DecodeError::mismatch("u8"))
    }

    fn decode_seq(d: Decoder<'a>, term: Term) -> Result<Vec<Self>, DecodeError> {
        Ok(d.binary(term)?.to_vec())
    }
}

impl Encode for u8 {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.env().make_u64(u64::from(self))
    }

    fn encode_seq(items: Vec<Self>, e: &mut Encoder<'_>) -> Term {
        e.binary(&items)
    }
}

impl<'a> Decode<'a> for i8 {
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        let v = d.env().get_i64(term).ok_or(DecodeError::mismatch("i8"))?;
        Self::try_from(v).map_err(|_| DecodeError::mismatch("i8"))
    }

    fn decode_seq(d: Decoder<'a>, term: Term) -> Result<Vec<Self>, DecodeError> {
        Ok(d
            .binary(term)?
            .iter()
            .map(|&b| Self::from_ne_bytes([b]))
            .collect())
    }
}

impl Encode for i8 {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.env().make_i64(i64::from(self))
    }

    fn encode_seq(items: Vec<Self>, e: &mut Encoder<'_>) -> Term {
        let bytes: Vec<u8> = items.iter().map(|v| v.to_ne_bytes()[0]).collect();
        e.binary(&bytes)
    }
}

impl<'a> Decode<'a> for f64 {
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        d.env().get_f64(term).ok_or(DecodeError::mismatch("float"))
    }
}

impl Encode for f64 {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.env().make_f64(self)
    }
}

impl<'a> Decode<'a> for f32 {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "host floats are doubles; narrowing matches an `as` conversion"
    )]
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        let v = d.env().get_f64(term).ok_or(DecodeError::mismatch("float"))?;
        Ok(v as Self)
    }
}

impl Encode for f32 {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.env().make_f64(f64::from(self))
    }
}

impl<'a> Decode<'a> for bool {
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        match d.env().get_atom(term) {
            Some(atoms::TRUE) => Ok(true),
            Some(atoms::FALSE) => Ok(false),
            _ => Err(DecodeError::mismatch("bool")),
        }
    }
}

impl Encode for bool {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.atom(if self { atoms::TRUE } else { atoms::FALSE })
    }
}

impl<'a> Decode<'a> for &'a str {
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        core::str::from_utf8(d.binary(term)?).map_err(|_| DecodeError::mismatch("utf-8 string"))
    }
}

impl Encode for &str {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.binary(self.as_bytes())
    }
}

impl<'a> Decode<'a> for String {
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        <&str>::decode(d, term).map(str::to_owned)
    }
}

impl Encode for String {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.binary(self.as_bytes())
    }
}

impl<'a> Decode<'a> for Atom {
    const NIL_IS_VALUE: bool = true;

    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        d.atom(term).map(Self::new)
    }
}

impl Encode for Atom {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.atom(self.as_str())
    }
}

impl Encode for &Atom {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.atom(self.as_str())
    }
}

impl<'a> Decode<'a> for Term {
    const NIL_IS_VALUE: bool = true;

    fn decode(_: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        Ok(term)
    }
}

impl Encode for Term {
    fn encode(self, _: &mut Encoder<'_>) -> Term {
        self
    }
}

impl Encode for Infallible {
    fn encode(self, _: &mut Encoder<'_>) -> Term {
        match self {}
    }
}

impl Encode for () {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.atom(atoms::OK)
    }
}

// `Term` is deliberately absent: it only names a value inside the call that received it.
macro_rules! persistent {
    ($($t:ty),* $(,)?) => {$(
        impl Persistent for $t {}
    )*};
}

persistent!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, bool, String, Atom);

#[cfg(test)]
mod tests {
    use crate::codec::{Decoder, Encoder};
    use crate::env::Env;
    use crate::error::DecodeError;
    use crate::local::LocalEnv;
    use crate::registry::Registry;
    use crate::term::Atom;

    #[test]
    fn integers_are_range_checked() {
        let mut env = LocalEnv::new();
        let registry = Registry::default();
        let big = env.make_i64(300);
        let neg = env.make_i64(-1);
        let d = Decoder::new(&env, &registry);
        assert_eq!(d.decode::<i32>(big), Ok(300));
        assert_eq!(d.decode::<u8>(big), Err(DecodeError::mismatch("u8")));
        assert_eq!(d.decode::<i8>(big), Err(DecodeError::mismatch("i8")));
        assert_eq!(d.decode::<u32>(neg), Err(DecodeError::mismatch("u32")));
        assert_eq!(d.decode::<i16>(neg), Ok(-1));
    }

    #[test]
    fn u64_max_survives() {
        let mut env = LocalEnv::new();
        let registry = Registry::default();
        let t = Encoder::new(&mut env, &registry).encode(u64::MAX);
        let d = Decoder::new(&env, &registry);
        assert_eq!(d.decode::<u64>(t), Ok(u64::MAX));
        assert!(d.decode::<i64>(t).is_err());
    }

    #[test]
    fn integers_are_not_floats() {
        let mut env = LocalEnv::new();
        let registry = Registry::default();
        let i = env.make_i64(2);
        let f = env.make_f64(2.5);
        let d = Decoder::new(&env, &registry);
        assert_eq!(d.decode::<f64>(i), Err(DecodeError::mismatch("float")));
        assert_eq!(d.decode::<f64>(f), Ok(2.5));
        assert_eq!(d.decode::<f32>(f), Ok(2.5));
        assert!(d.decode::<i64>(f).is_err());
    }

    #[test]
    fn bool_only_accepts_the_two_atoms() {
        let mut env = LocalEnv::new();
        let registry = Registry::default();
        let t = env.make_atom("true");
        let yes = env.make_atom("yes");
        let d = Decoder::new(&env, &registry);
        assert_eq!(d.decode::<bool>(t), Ok(true));
        assert!(d.decode::<bool>(yes).is_err());
    }

    #[test]
    fn strings_must_be_utf8() {
        let mut env = LocalEnv::new();
        let registry = Registry::default();
        let good = env.make_binary("héllo".as_bytes());
        let bad = env.make_binary(&[0xff, 0xfe]);
        let d = Decoder::new(&env, &registry);
        assert_eq!(d.decode::<String>(good), Ok("héllo".to_owned()));
        assert_eq!(d.decode::<&str>(good), Ok("héllo"));
        assert_eq!(
            d.decode::<String>(bad),
            Err(DecodeError::mismatch("utf-8 string"))
        );
    }

    #[test]
    fn atoms_and_unit() {
        let mut env = LocalEnv::new();
        let registry = Registry::default();
        let mut e = Encoder::new(&mut env, &registry);
        let a = e.encode(Atom::new("hello"));
        let unit = e.encode(());
        let d = Decoder::new(&env, &registry);
        assert_eq!(d.decode::<Atom>(a), Ok(Atom::new("hello")));
        assert_eq!(env.describe(unit), "ok");
    }

    #[test]
    fn byte_vectors_are_binaries() {
        let mut env = LocalEnv::new();
        let registry = Registry::default();
        let mut e = Encoder::new(&mut env, &registry);
        let bytes = e.encode(vec![1_u8, 2, 255]);
        let signed = e.encode(vec![-1_i8, 5]);
        let words = e.encode(vec![1_u16, 2]);
        assert_eq!(env.inspect_binary(bytes), Some(&[1_u8, 2, 255][..]));
        assert_eq!(env.inspect_binary(signed), Some(&[0xff_u8, 5][..]));
        assert_eq!(env.describe(words), "[1,2]");
        let d = Decoder::new(&env, &registry);
        assert_eq!(d.decode::<Vec<i8>>(signed), Ok(vec![-1, 5]));
        assert!(d.decode::<Vec<u8>>(words).is_err());
    }
}
