// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Turning native functions into host-callable dispatchers.
//!
//! A dispatcher validates arity, decodes every argument before the body runs, invokes the body
//! with panics caught, and maps the outcome onto the host:
//!
//! | body result | host sees |
//! |---|---|
//! | `Ok(v)` | `v`, encoded |
//! | [`Failure::BadArg`] | bad arguments, same as an arity or decode failure |
//! | [`Failure::Domain`]`(e)` | `{error, e}` |
//! | [`Failure::Fault`] or a panic | a raised exception whose reason is the message as a binary |
//!
//! Typed bindings decode into owned values only. Functions that want borrowed views such as
//! `&str` or [`BinaryView`](crate::codec::BinaryView) use a raw binding, which is never
//! resumable. A resumable function therefore cannot hold on to host memory across a
//! suspension:
//!
//! ```compile_fail
//! use native_bridge::error::NativeResult;
//! use native_bridge::module::ModuleBuilder;
//! use native_bridge::stepper::{Budget, Progress, Resumable};
//! use native_bridge::term::ExecClass;
//! use native_bridge::error::Failure;
//!
//! struct Echo<'a>(&'a str);
//!
//! impl Resumable for Echo<'static> {
//!     type Output = String;
//!     type Error = ();
//!     fn step(&mut self, _: &mut Budget) -> Result<Progress<String>, Failure<()>> {
//!         Ok(Progress::Done(self.0.to_owned()))
//!     }
//! }
//!
//! fn echo(text: &'static str) -> NativeResult<Echo<'static>, ()> {
//!     Ok(Echo(text))
//! }
//!
//! let _ = ModuleBuilder::new("demo").resumable("echo", ExecClass::Normal, echo);
//! ```
//!
//! Nor can it keep a raw [`Term`] from the call that created it, since the host may reuse that
//! term once the call returns. Resumable arguments must be [`Persistent`]:
//!
//! ```compile_fail
//! use native_bridge::error::{Failure, NativeResult};
//! use native_bridge::module::ModuleBuilder;
//! use native_bridge::stepper::{Budget, Progress, Resumable};
//! use native_bridge::term::{ExecClass, Term};
//!
//! struct Hold(Term);
//!
//! impl Resumable for Hold {
//!     type Output = Term;
//!     type Error = ();
//!     fn step(&mut self, _: &mut Budget) -> Result<Progress<Term>, Failure<()>> {
//!         Ok(Progress::Done(self.0))
//!     }
//! }
//!
//! fn hold(term: Term) -> NativeResult<Hold, ()> {
//!     Ok(Hold(term))
//! }
//!
//! let _ = ModuleBuilder::new("demo").resumable("hold", ExecClass::Normal, hold);
//! ```
//!
//! A panic anywhere in user code, converters included, surfaces as a raised exception.

use core::any::Any;
use core::fmt;
use core::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::codec::{Decode, DecodeOwned, Decoder, Encode, Encoder, Persistent};
use crate::env::{CallCx, Env};
use crate::error::{DecodeError, Failure, NativeResult};
use crate::registry::Registry;
use crate::stepper::{self, Resumable};
use crate::term::{Term, atoms};
use crate::trace::TraceEvent;

/// A fixed-arity tuple of owned, decodable argument types.
pub trait ArgList: Sized + Send + 'static {
    /// Number of arguments.
    const ARITY: usize;

    /// Decodes `argv` in order, stopping at the first failure.
    fn decode_args(d: Decoder<'_>, argv: &[Term]) -> Result<Self, DecodeError>;
}

/// An [`ArgList`] whose values may outlive the call that decoded them.
pub trait PersistentArgs: ArgList {
    /// Detaches every argument from the originating call.
    fn detach(&mut self);
}

/// A native function callable with `Args`.
///
/// Implemented for every `Fn(A, B, ...) -> R` closure and function of up to eight parameters.
pub trait NativeFn<Args>: Send + Sync + 'static {
    /// Return type.
    type Output;

    /// Calls the function.
    fn invoke(&self, args: Args) -> Self::Output;
}

macro_rules! arity_impls {
    ($arity:literal; $($name:ident $arg:ident $idx:tt),*) => {
        impl<$($name),*> ArgList for ($($name,)*)
        where
            $($name: DecodeOwned + Send + 'static,)*
        {
            const ARITY: usize = $arity;

            #[allow(unused_variables, reason = "the nullary list ignores its inputs")]
            fn decode_args(d: Decoder<'_>, argv: &[Term]) -> Result<Self, DecodeError> {
                if argv.len() != $arity {
                    return Err(DecodeError::ArityMismatch {
                        expected: $arity,
                        found: argv.len(),
                    });
                }
                Ok(($(<$name as Decode<'_>>::decode(d, argv[$idx])?,)*))
            }
        }

        impl<$($name),*> PersistentArgs for ($($name,)*)
        where
            $($name: Persistent,)*
        {
            fn detach(&mut self) {
                let ($($arg,)*) = self;
                $(Persistent::detach($arg);)*
            }
        }

        impl<Func, Ret, $($name),*> NativeFn<($($name,)*)> for Func
        where
            Func: Fn($($name),*) -> Ret + Send + Sync + 'static,
        {
            type Output = Ret;

            fn invoke(&self, ($($arg,)*): ($($name,)*)) -> Ret {
                self($($arg),*)
            }
        }
    };
}

arity_impls!(0;);
arity_impls!(1; A a 0);
arity_impls!(2; A a 0, B b 1);
arity_impls!(3; A a 0, B b 1, C c 2);
arity_impls!(4; A a 0, B b 1, C c 2, D d 3);
arity_impls!(5; A a 0, B b 1, C c 2, D d 3, E e 4);
arity_impls!(6; A a 0, B b 1, C c 2, D d 3, E e 4, F f 5);
arity_impls!(7; A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6);
arity_impls!(8; A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6, H h 7);

/// Lazily decoded arguments of a raw binding.
#[derive(Clone, Copy, Debug)]
pub struct Args<'a> {
    d: Decoder<'a>,
    argv: &'a [Term],
}

impl<'a> Args<'a> {
    /// Number of arguments.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.argv.len()
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    /// Returns the raw term at `index`.
    #[must_use]
    pub fn term(&self, index: usize) -> Option<Term> {
        self.argv.get(index).copied()
    }

    /// Decodes the argument at `index`. The result may borrow host memory.
    pub fn get<T: Decode<'a>>(&self, index: usize) -> Result<T, DecodeError> {
        let term = self.argv.get(index).ok_or(DecodeError::ArityMismatch {
            expected: index + 1,
            found: self.argv.len(),
        })?;
        T::decode(self.d, *term)
    }

    /// Returns the underlying decoder.
    #[must_use]
    #[inline]
    pub fn decoder(&self) -> Decoder<'a> {
        self.d
    }
}

/// A host-callable dispatcher for one bound function.
pub(crate) trait Dispatch: Send + Sync {
    /// Handles a call whose arity was already checked.
    fn dispatch(&self, cx: &mut CallCx<'_>, env: &mut dyn Env, name: &str, argv: &[Term])
    -> Term;
}

/// How a call ends, before it is handed to the host.
pub(crate) enum Reply {
    Value(Term),
    BadArg(DecodeError),
    Raise(String),
}

impl Reply {
    pub(crate) fn from_result<T: Encode, E: Encode>(
        result: NativeResult<T, E>,
        env: &mut dyn Env,
        registry: &Registry,
    ) -> Self {
        match result {
            Ok(value) => Self::encode(env, registry, |e| value.encode(e)),
            Err(failure) => Self::from_failure(failure, env, registry),
        }
    }

    pub(crate) fn from_failure<E: Encode>(
        failure: Failure<E>,
        env: &mut dyn Env,
        registry: &Registry,
    ) -> Self {
        match failure {
            Failure::BadArg(reason) => Self::BadArg(reason),
            Failure::Fault(message) => Self::Raise(message),
            Failure::Domain(err) => Self::encode(env, registry, |e| {
                let err = err.encode(e);
                e.tagged(atoms::ERROR, err)
            }),
        }
    }

    /// Runs a user encoder. A fault or a panic discards whatever it materialized.
    fn encode(
        env: &mut dyn Env,
        registry: &Registry,
        f: impl FnOnce(&mut Encoder<'_>) -> Term,
    ) -> Self {
        let mut e = Encoder::new(env, registry);
        match catch_panic(|| f(&mut e)) {
            Ok(term) => match e.finish(term) {
                Ok(term) => Self::Value(term),
                Err(message) => Self::Raise(message),
            },
            Err(message) => {
                e.abandon();
                Self::Raise(message)
            }
        }
    }

    /// Hands the reply to the host, reporting failures to the trace sink.
    pub(crate) fn into_term(self, cx: &mut CallCx<'_>, name: &str, env: &mut dyn Env) -> Term {
        match self {
            Self::Value(term) => term,
            Self::BadArg(reason) => {
                cx.event(TraceEvent::BadArg {
                    name,
                    reason: &reason,
                });
                env.make_badarg()
            }
            Self::Raise(message) => {
                cx.event(TraceEvent::Fault {
                    name,
                    message: &message,
                });
                let reason = env.make_binary(message.as_bytes());
                env.raise_exception(reason)
            }
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(term) => f.debug_tuple("Value").field(term).finish(),
            Self::BadArg(reason) => f.debug_tuple("BadArg").field(reason).finish(),
            Self::Raise(message) => f.debug_tuple("Raise").field(message).finish(),
        }
    }
}

/// Runs `f`, returning the panic message if it unwinds.
pub(crate) fn catch_panic<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(&*payload))
}

/// Runs `body`, turning a panic into [`Failure::Fault`].
pub(crate) fn guard<T, E>(body: impl FnOnce() -> NativeResult<T, E>) -> NativeResult<T, E> {
    catch_panic(body).unwrap_or_else(|message| Err(Failure::Fault(message)))
}

/// Decodes the arguments of a typed binding.
fn decode_args<A: ArgList>(d: Decoder<'_>, argv: &[Term]) -> Result<A, Reply> {
    match catch_panic(|| A::decode_args(d, argv)) {
        Ok(Ok(args)) => Ok(args),
        Ok(Err(reason)) => Err(Reply::BadArg(reason)),
        Err(message) => Err(Reply::Raise(message)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "native function panicked".to_owned()
    }
}

/// Binding for an ordinary function.
pub(crate) struct Plain<F, Args> {
    f: F,
    _args: PhantomData<fn(Args)>,
}

impl<F, Args> Plain<F, Args> {
    pub(crate) fn new(f: F) -> Self {
        Self {
            f,
            _args: PhantomData,
        }
    }
}

impl<F, A, T, E> Dispatch for Plain<F, A>
where
    A: ArgList,
    F: NativeFn<A, Output = NativeResult<T, E>>,
    T: Encode,
    E: Encode,
{
    fn dispatch(
        &self,
        cx: &mut CallCx<'_>,
        env: &mut dyn Env,
        name: &str,
        argv: &[Term],
    ) -> Term {
        let registry = cx.registry();
        let args = match decode_args::<A>(Decoder::new(&*env, registry), argv) {
            Ok(args) => args,
            Err(reply) => return reply.into_term(cx, name, env),
        };
        let result = guard(|| self.f.invoke(args));
        Reply::from_result(result, env, registry).into_term(cx, name, env)
    }
}

/// Binding for a function returning a [`Resumable`] machine.
pub(crate) struct Stepped<F, Args> {
    f: F,
    _args: PhantomData<fn(Args)>,
}

impl<F, Args> Stepped<F, Args> {
    pub(crate) fn new(f: F) -> Self {
        Self {
            f,
            _args: PhantomData,
        }
    }
}

impl<F, A, M> Dispatch for Stepped<F, A>
where
    A: PersistentArgs,
    F: NativeFn<A, Output = NativeResult<M, M::Error>>,
    M: Resumable,
{
    fn dispatch(
        &self,
        cx: &mut CallCx<'_>,
        env: &mut dyn Env,
        name: &str,
        argv: &[Term],
    ) -> Term {
        let registry = cx.registry();
        let mut args = match decode_args::<A>(Decoder::new(&*env, registry), argv) {
            Ok(args) => args,
            Err(reply) => return reply.into_term(cx, name, env),
        };
        args.detach();
        match guard(|| self.f.invoke(args)) {
            Ok(machine) => stepper::start(cx, env, name, machine),
            Err(failure) => Reply::from_failure(failure, env, registry).into_term(cx, name, env),
        }
    }
}

/// Binding for a function that decodes its own arguments.
pub(crate) struct Raw<F> {
    f: F,
}

impl<F> Raw<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, T, E> Dispatch for Raw<F>
where
    F: for<'a> Fn(Args<'a>) -> NativeResult<T, E> + Send + Sync,
    T: Encode,
    E: Encode,
{
    fn dispatch(
        &self,
        cx: &mut CallCx<'_>,
        env: &mut dyn Env,
        name: &str,
        argv: &[Term],
    ) -> Term {
        let registry = cx.registry();
        let args = Args {
            d: Decoder::new(&*env, registry),
            argv,
        };
        let result = guard(|| (self.f)(args));
        Reply::from_result(result, env, registry).into_term(cx, name, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{LocalEnv, Raised};

    fn run(dispatch: &dyn Dispatch, env: &mut LocalEnv, argv: &[Term]) -> Term {
        let registry = Registry::default();
        let mut cx = CallCx::new(&registry, None);
        dispatch.dispatch(&mut cx, env, "f", argv)
    }

    fn add(a: i32, b: i32) -> NativeResult<i32> {
        Ok(a + b)
    }

    #[test]
    fn arity_is_derived_from_the_parameter_list() {
        assert_eq!(<() as ArgList>::ARITY, 0);
        assert_eq!(<(i32, String, bool) as ArgList>::ARITY, 3);
    }

    #[test]
    fn ordinary_function_encodes_its_value() {
        let mut env = LocalEnv::new();
        let a = env.make_i64(2);
        let b = env.make_i64(40);
        let term = run(&Plain::<_, (i32, i32)>::new(add), &mut env, &[a, b]);
        assert_eq!(env.describe(term), "42");
        assert!(env.take_exception().is_none());
    }

    #[test]
    fn decode_failure_is_bad_argument() {
        let mut env = LocalEnv::new();
        let a = env.make_i64(2);
        let b = env.make_atom("two");
        let _ = run(&Plain::<_, (i32, i32)>::new(add), &mut env, &[a, b]);
        assert_eq!(env.take_exception(), Some(Raised::BadArg));
    }

    #[test]
    fn domain_error_is_data() {
        let mut env = LocalEnv::new();
        let f = |n: u32| -> NativeResult<u32, String> {
            if n == 0 {
                return Err(Failure::Domain("zero".to_owned()));
            }
            Ok(n)
        };
        let zero = env.make_u64(0);
        let term = run(&Plain::<_, (u32,)>::new(f), &mut env, &[zero]);
        assert_eq!(env.describe(term), "{error,<<\"zero\">>}");
        assert!(env.take_exception().is_none());
    }

    #[test]
    fn panics_are_raised_with_their_message() {
        let mut env = LocalEnv::new();
        let f = || -> NativeResult<()> { panic!("index out of bounds") };
        let _ = run(&Plain::<_, ()>::new(f), &mut env, &[]);
        let Some(Raised::Exception(reason)) = env.take_exception() else {
            panic!("expected a raised exception");
        };
        assert_eq!(env.inspect_binary(reason), Some(&b"index out of bounds"[..]));
    }

    #[test]
    fn panicking_converters_are_raised() {
        struct Fragile;

        impl<'a> Decode<'a> for Fragile {
            fn decode(_: Decoder<'a>, _: Term) -> Result<Self, DecodeError> {
                panic!("bad decoder")
            }
        }

        impl Encode for Fragile {
            fn encode(self, _: &mut Encoder<'_>) -> Term {
                panic!("bad encoder")
            }
        }

        let mut env = LocalEnv::new();
        let one = env.make_i64(1);
        let take = |_: Fragile| -> NativeResult<()> { Ok(()) };
        let _ = run(&Plain::<_, (Fragile,)>::new(take), &mut env, &[one]);
        let Some(Raised::Exception(reason)) = env.take_exception() else {
            panic!("expected a raised exception");
        };
        assert_eq!(env.inspect_binary(reason), Some(&b"bad decoder"[..]));

        let give = || -> NativeResult<u8, Fragile> { Err(Failure::Domain(Fragile)) };
        let _ = run(&Plain::<_, ()>::new(give), &mut env, &[]);
        let Some(Raised::Exception(reason)) = env.take_exception() else {
            panic!("expected a raised exception");
        };
        assert_eq!(env.inspect_binary(reason), Some(&b"bad encoder"[..]));
    }

    #[test]
    fn raw_binding_borrows_arguments() {
        let mut env = LocalEnv::new();
        let f = |args: Args<'_>| -> NativeResult<usize> {
            let text: &str = args.get(0)?;
            Ok(text.chars().count())
        };
        let s = env.make_binary("añb".as_bytes());
        let term = run(&Raw::new(f), &mut env, &[s]);
        assert_eq!(env.describe(term), "3");

        let _ = run(&Raw::new(f), &mut env, &[]);
        assert_eq!(env.take_exception(), Some(Raised::BadArg));
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&5_u8), "native function panicked");
    }
}
