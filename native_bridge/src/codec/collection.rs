// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sequences and maps.

use core::hash::{BuildHasher, Hash};
use std::collections::BTreeMap;

use super::{Decode, Decoder, Encode, Encoder, Persistent};
use crate::error::DecodeError;
use crate::term::Term;

impl<'a, T: Decode<'a>> Decode<'a> for Vec<T> {
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        T::decode_seq(d, term)
    }
}

impl<T: Persistent> Persistent for Vec<T> {
    fn detach(&mut self) {
        self.iter_mut().for_each(Persistent::detach);
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        T::encode_seq(self, e)
    }
}

fn decode_entries<'a, K, V>(
    d: Decoder<'a>,
    term: Term,
) -> Result<impl Iterator<Item = Result<(K, V), DecodeError>> + 'a, DecodeError>
where
    K: Decode<'a>,
    V: Decode<'a>,
{
    Ok(d.map(term)?
        .iter()
        .map(move |&(k, v)| Ok((K::decode(d, k)?, V::decode(d, v)?))))
}

fn encode_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>, e: &mut Encoder<'_>) -> Term
where
    K: Encode,
    V: Encode,
{
    let pairs: Vec<(Term, Term)> = entries
        .into_iter()
        .map(|(k, v)| {
            let k = k.encode(e);
            (k, v.encode(e))
        })
        .collect();
    e.map(&pairs)
}

impl<'a, K, V> Decode<'a> for BTreeMap<K, V>
where
    K: Decode<'a> + Ord,
    V: Decode<'a>,
{
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        decode_entries(d, term)?.collect()
    }
}

impl<K, V> Persistent for BTreeMap<K, V>
where
    K: Persistent + Ord,
    V: Persistent,
{
    fn detach(&mut self) {
        self.values_mut().for_each(Persistent::detach);
    }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        encode_entries(self, e)
    }
}

impl<'a, K, V, S> Decode<'a> for std::collections::HashMap<K, V, S>
where
    K: Decode<'a> + Eq + Hash,
    V: Decode<'a>,
    S: BuildHasher + Default,
{
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        decode_entries(d, term)?.collect()
    }
}

impl<K, V, S> Persistent for std::collections::HashMap<K, V, S>
where
    K: Persistent + Eq + Hash,
    V: Persistent,
    S: BuildHasher + Default + Send + 'static,
{
    fn detach(&mut self) {
        self.values_mut().for_each(Persistent::detach);
    }
}

impl<K: Encode, V: Encode, S> Encode for std::collections::HashMap<K, V, S> {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        encode_entries(self, e)
    }
}

impl<'a, K, V, S> Decode<'a> for hashbrown::HashMap<K, V, S>
where
    K: Decode<'a> + Eq + Hash,
    V: Decode<'a>,
    S: BuildHasher + Default,
{
    fn decode(d: Decoder<'a>, term: Term) -> Result<Self, DecodeError> {
        decode_entries(d, term)?.collect()
    }
}

impl<K, V, S> Persistent for hashbrown::HashMap<K, V, S>
where
    K: Persistent + Eq + Hash,
    V: Persistent,
    S: BuildHasher + Default + Send + 'static,
{
    fn detach(&mut self) {
        self.values_mut().for_each(Persistent::detach);
    }
}

impl<K: Encode, V: Encode, S> Encode for hashbrown::HashMap<K, V, S> {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        encode_entries(self, e)
    }
}
