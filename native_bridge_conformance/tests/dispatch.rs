// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Outcome mapping of bound functions: values, domain errors, bad arguments and raises.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use native_bridge::binding::Args;
use native_bridge::codec::{BinaryView, Decode, Decoder, Encode, Encoder};
use native_bridge::env::{CallCx, Env};
use native_bridge::error::{DecodeError, Failure, NativeResult};
use native_bridge::local::{LocalEnv, Raised};
use native_bridge::module::ModuleBuilder;
use native_bridge::runtime::{CallOutcome, LocalRuntime, RuntimeError};
use native_bridge::term::{ExecClass, Term};
use native_bridge_conformance::{call_describe, expect_value, raised_reason};

#[derive(Debug)]
enum ThumbError {
    Empty,
}

impl Encode for ThumbError {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        match self {
            Self::Empty => e.atom("empty"),
        }
    }
}

fn thumbnail(width: u32, height: u32, max: u32) -> NativeResult<(u32, u32), ThumbError> {
    if width == 0 || height == 0 {
        return Err(Failure::Domain(ThumbError::Empty));
    }
    if max == 0 {
        return Err(Failure::bad_arg("max must be positive"));
    }
    let long = width.max(height);
    if long <= max {
        return Ok((width, height));
    }
    let fit = |v: u32| {
        u32::try_from(u64::from(v) * u64::from(max) / u64::from(long))
            .unwrap_or(max)
            .max(1)
    };
    Ok((fit(width), fit(height)))
}

fn explode(reason: String) -> NativeResult<u32> {
    if reason == "fault" {
        return Err(Failure::fault("decoder state corrupted"));
    }
    panic!("{reason}");
}

/// Converters that panic instead of returning.
struct Brittle;

impl Encode for Brittle {
    fn encode(self, _: &mut Encoder<'_>) -> Term {
        panic!("encode exploded")
    }
}

impl<'a> Decode<'a> for Brittle {
    fn decode(_: Decoder<'a>, _: Term) -> Result<Self, DecodeError> {
        panic!("decode exploded")
    }
}

fn reject() -> NativeResult<u32, Brittle> {
    Err(Failure::Domain(Brittle))
}

fn produce() -> NativeResult<Brittle> {
    Ok(Brittle)
}

fn consume(_: Brittle) -> NativeResult<u32> {
    Ok(0)
}

fn runtime() -> LocalRuntime {
    let module = ModuleBuilder::new("thumbs")
        .function("thumbnail", ExecClass::CpuBound, thumbnail)
        .function("explode", ExecClass::Normal, explode)
        .function("reject", ExecClass::Normal, reject)
        .function("produce", ExecClass::Normal, produce)
        .function("consume", ExecClass::Normal, consume)
        .raw("byte_len", 1, ExecClass::Normal, |args: Args<'_>| -> NativeResult<usize> {
            let bytes: BinaryView<'_> = args.get(0)?;
            Ok(bytes.len())
        })
        .raw("char_count", 1, ExecClass::Normal, |args: Args<'_>| -> NativeResult<usize> {
            let text: &str = args.get(0)?;
            Ok(text.chars().count())
        })
        .build()
        .unwrap();
    LocalRuntime::new(module).unwrap()
}

#[test]
fn values_and_domain_errors_are_returned() {
    let mut rt = runtime();
    let argv = [
        rt.encode(4000_u32).unwrap(),
        rt.encode(3000_u32).unwrap(),
        rt.encode(400_u32).unwrap(),
    ];
    assert_eq!(call_describe(&mut rt, "thumbnail", &argv), "{400,300}");

    let argv = [argv[0], rt.encode(0_u32).unwrap(), argv[2]];
    assert_eq!(call_describe(&mut rt, "thumbnail", &argv), "{error,empty}");
}

#[test]
fn bad_arguments_share_one_outcome() {
    let mut rt = runtime();
    let w = rt.encode(10_u32).unwrap();
    let zero = rt.encode(0_u32).unwrap();
    let text = rt.encode("ten").unwrap();
    let negative = rt.encode(-1_i64).unwrap();

    for argv in [[w, w, zero], [w, text, w], [negative, w, w]] {
        let report = rt.call("thumbnail", &argv).unwrap();
        assert_eq!(report.outcome, CallOutcome::BadArg);
    }
}

#[test]
fn faults_and_panics_are_raised() {
    let mut rt = runtime();
    let fault = rt.encode("fault").unwrap();
    let report = rt.call("explode", &[fault]).unwrap();
    assert_eq!(
        raised_reason(&rt, report),
        r#"<<"decoder state corrupted">>"#
    );

    let boom = rt.encode("boom").unwrap();
    let report = rt.call("explode", &[boom]).unwrap();
    assert_eq!(raised_reason(&rt, report), r#"<<"boom">>"#);

    // The runtime stays usable after a panic.
    let report = rt.call("explode", &[fault]).unwrap();
    assert!(matches!(report.outcome, CallOutcome::Raised(_)));
}

#[test]
fn panicking_converters_are_raised() {
    let mut rt = runtime();
    let report = rt.call("reject", &[]).unwrap();
    assert_eq!(raised_reason(&rt, report), r#"<<"encode exploded">>"#);

    let report = rt.call("produce", &[]).unwrap();
    assert_eq!(raised_reason(&rt, report), r#"<<"encode exploded">>"#);

    let one = rt.encode(1_u32).unwrap();
    let report = rt.call("consume", &[one]).unwrap();
    assert_eq!(raised_reason(&rt, report), r#"<<"decode exploded">>"#);

    // The runtime stays usable.
    let report = rt.call("thumbnail", &[one, one, one]).unwrap();
    assert!(matches!(report.outcome, CallOutcome::Value(_)));
}

#[test]
fn unknown_arity_is_undefined() {
    let mut rt = runtime();
    let w = rt.encode(1_u32).unwrap();
    assert_eq!(
        rt.call("thumbnail", &[w]).unwrap_err(),
        RuntimeError::UndefinedFunction {
            name: "thumbnail".into(),
            arity: 1
        }
    );
}

#[test]
fn arity_is_checked_before_the_body_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let mut module = ModuleBuilder::new("counting")
        .function("pair", ExecClass::Normal, move |a: i64, b: i64| -> NativeResult<i64> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(a + b)
        })
        .build()
        .unwrap();
    let mut env = LocalEnv::new();
    module.load(&mut env).unwrap();
    let one = env.make_i64(1);
    let entry = module.function("pair", 2).unwrap();

    for argv in [&[][..], &[one][..], &[one, one, one][..]] {
        let mut cx = CallCx::new(module.registry(), None);
        let _ = entry.call(&mut cx, &mut env, argv);
        assert_eq!(env.take_exception(), Some(Raised::BadArg));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let mut cx = CallCx::new(module.registry(), None);
    let sum = entry.call(&mut cx, &mut env, &[one, one]);
    assert_eq!(env.take_exception(), None);
    assert_eq!(env.describe(sum), "2");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn raw_bindings_borrow_host_memory() {
    let mut rt = runtime();
    let bytes = rt.encode(vec![1_u8, 2, 3, 4]).unwrap();
    let report = rt.call("byte_len", &[bytes]).unwrap();
    assert_eq!(rt.decode::<usize>(expect_value(report)), Ok(4));

    let text = rt.encode("héllo").unwrap();
    assert_eq!(call_describe(&mut rt, "char_count", &[text]), "5");

    // Not UTF-8.
    let raw = rt.encode(vec![0xff_u8, 0xfe]).unwrap();
    let report = rt.call("char_count", &[raw]).unwrap();
    assert_eq!(report.outcome, CallOutcome::BadArg);
}
