// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversions between host terms and native argument and result types.

use std::collections::BTreeMap;

use native_bridge::codec::{Union2, Union3};
use native_bridge::env::Env;
use native_bridge::error::DecodeError;
use native_bridge::module::ModuleBuilder;
use native_bridge::runtime::LocalRuntime;
use native_bridge::term::{Atom, atoms};

fn runtime() -> LocalRuntime {
    LocalRuntime::new(ModuleBuilder::new("marshaling").build().unwrap()).unwrap()
}

#[test]
fn int32_scenario() {
    let mut rt = runtime();
    let t = rt.encode(42_i32).unwrap();
    assert_eq!(rt.decode::<i32>(t), Ok(42));
    assert_eq!(
        rt.decode::<String>(t),
        Err(DecodeError::mismatch("binary"))
    );

    let none = rt.encode(None::<i32>).unwrap();
    assert_eq!(rt.describe(none), atoms::NIL);
    assert_eq!(rt.decode::<Option<i32>>(none), Ok(None));
    assert_eq!(rt.decode::<Option<i32>>(t), Ok(Some(42)));
}

#[test]
fn closed_set_round_trips() {
    let mut rt = runtime();

    macro_rules! round_trip {
        ($($v:expr => $t:ty),* $(,)?) => {$(
            let term = rt.encode::<$t>($v).unwrap();
            assert_eq!(rt.decode::<$t>(term), Ok($v), "{}", stringify!($t));
        )*};
    }

    round_trip! {
        i8::MIN => i8,
        i16::MIN => i16,
        i32::MAX => i32,
        i64::MIN => i64,
        -7 => isize,
        u8::MAX => u8,
        u16::MAX => u16,
        u32::MAX => u32,
        u64::MAX => u64,
        usize::MAX >> 1 => usize,
        1.5 => f32,
        -0.25 => f64,
        true => bool,
        "héllo".to_owned() => String,
        vec![0_u8, 255, 7] => Vec<u8>,
        vec![-1_i8, 0, 1] => Vec<i8>,
        Atom::new("image") => Atom,
        Some(3_u16) => Option<u16>,
        (1_i64, "two".to_owned(), false) => (i64, String, bool),
        [1_u32, 2, 3, 4] => [u32; 4],
        vec![vec![1_i64], vec![], vec![2, 3]] => Vec<Vec<i64>>,
        Union2::<i64, String>::B("x".to_owned()) => Union2<i64, String>,
    }

    let map: BTreeMap<String, Vec<u32>> =
        [("a".to_owned(), vec![1]), ("b".to_owned(), vec![2, 3])].into();
    let term = rt.encode(map.clone()).unwrap();
    assert_eq!(rt.decode::<BTreeMap<String, Vec<u32>>>(term), Ok(map));
}

#[test]
fn integers_are_range_checked() {
    let mut rt = runtime();
    let big = rt.encode(i64::from(i32::MAX) + 1).unwrap();
    assert_eq!(rt.decode::<i32>(big), Err(DecodeError::mismatch("i32")));
    assert_eq!(rt.decode::<u32>(big), Ok(2_147_483_648));
    let neg = rt.encode(-1_i64).unwrap();
    assert_eq!(rt.decode::<u64>(neg), Err(DecodeError::mismatch("u64")));
    assert_eq!(rt.decode::<usize>(neg), Err(DecodeError::mismatch("usize")));
}

#[test]
fn integers_are_not_floats() {
    let mut rt = runtime();
    let one = rt.encode(1_i64).unwrap();
    assert_eq!(rt.decode::<f64>(one), Err(DecodeError::mismatch("float")));
}

#[test]
fn tuple_arity_is_checked() {
    let mut rt = runtime();
    let pair = rt.encode((1_i64, 2_i64)).unwrap();
    assert_eq!(
        rt.decode::<(i64, i64, i64)>(pair),
        Err(DecodeError::ArityMismatch {
            expected: 3,
            found: 2
        })
    );
    assert_eq!(
        rt.decode::<[i64; 1]>(pair),
        Err(DecodeError::ArityMismatch {
            expected: 1,
            found: 2
        })
    );
}

// Overlapping alternatives resolve to the first one listed. Reordering the type parameters
// changes the decoded variant.
#[test]
fn union_first_listed_alternative_wins() {
    let mut rt = runtime();
    let n = rt.encode(5_u8).unwrap();
    assert_eq!(
        rt.decode::<Union2<u8, i64>>(n),
        Ok(Union2::A(5)),
        "u8 listed first"
    );
    assert_eq!(
        rt.decode::<Union2<i64, u8>>(n),
        Ok(Union2::A(5)),
        "i64 listed first"
    );
    assert_eq!(
        rt.decode::<Union3<String, Vec<u8>, i64>>(n),
        Ok(Union3::C(5))
    );

    let text = rt.encode("abc").unwrap();
    assert_eq!(
        rt.decode::<Union2<Vec<u8>, String>>(text),
        Ok(Union2::A(b"abc".to_vec()))
    );
    assert_eq!(
        rt.decode::<Union2<String, Vec<u8>>>(text),
        Ok(Union2::A("abc".to_owned()))
    );

    let atom = rt.encode(Atom::new("x")).unwrap();
    assert_eq!(
        rt.decode::<Union2<i64, String>>(atom),
        Err(DecodeError::mismatch("Union2"))
    );
}

#[test]
fn results_encode_as_tagged_tuples() {
    let mut rt = runtime();
    let ok = rt.encode(Ok::<u32, String>(3)).unwrap();
    assert_eq!(rt.describe(ok), "{ok,3}");
    let err = rt.encode(Err::<u32, String>("nope".to_owned())).unwrap();
    assert_eq!(rt.describe(err), r#"{error,<<"nope">>}"#);
}

#[test]
fn repeated_map_keys_keep_the_last_value() {
    let mut rt = runtime();
    let k = rt.encode(1_i64).unwrap();
    let first = rt.encode(10_i64).unwrap();
    let second = rt.encode(20_i64).unwrap();
    let map = rt.env_mut().make_map(&[(k, first), (k, second)]);
    assert_eq!(
        rt.decode::<BTreeMap<i64, i64>>(map),
        Ok([(1, 20)].into())
    );

    let mut sizes = hashbrown::HashMap::new();
    sizes.insert("w".to_owned(), 640_u32);
    let term = rt.encode(sizes.clone()).unwrap();
    assert_eq!(rt.describe(term), r#"#{<<"w">> => 640}"#);
    assert_eq!(
        rt.decode::<hashbrown::HashMap<String, u32>>(term),
        Ok(sizes)
    );
}
