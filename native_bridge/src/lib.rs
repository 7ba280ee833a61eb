// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native Bridge: exposes statically typed Rust functions to a dynamically typed host runtime.
//!
//! A host runtime calls into native code with a slice of opaque [`Term`](term::Term)s and
//! expects one term back. This crate does the work in between:
//!
//! - [`codec`]: converts terms to and from native types (integers, floats, strings, atoms,
//!   optionals, tuples, unions, sequences, maps, results, resources).
//! - [`binding`] and [`module`]: turn ordinary functions into dispatchers that check arity,
//!   decode arguments before the body runs, and map the body's outcome onto the host's three
//!   channels (value, bad arguments, raised exception).
//! - [`stepper`]: lets CPU-heavy work yield to the host scheduler at checkpoints and resume
//!   later without blocking a worker thread.
//! - [`resource`]: hands native objects to the host as reference-counted handles and recovers
//!   them, type-checked, on later calls.
//!
//! The host itself sits behind the [`Env`](env::Env) trait. [`local`] and [`runtime`] provide an
//! in-process host for tests, benchmarks and demos.
//!
//! ## Example
//!
//! ```
//! use native_bridge::error::{Failure, NativeResult};
//! use native_bridge::module::ModuleBuilder;
//! use native_bridge::runtime::{CallOutcome, LocalRuntime};
//! use native_bridge::term::ExecClass;
//!
//! fn checked_area(w: u32, h: u32) -> NativeResult<u64, String> {
//!     if w == 0 || h == 0 {
//!         return Err(Failure::Domain("empty image".to_owned()));
//!     }
//!     Ok(u64::from(w) * u64::from(h))
//! }
//!
//! let module = ModuleBuilder::new("images")
//!     .function("area", ExecClass::Normal, checked_area)
//!     .build()?;
//! let mut rt = LocalRuntime::new(module)?;
//!
//! let w = rt.encode(640_u32)?;
//! let h = rt.encode(480_u32)?;
//! let report = rt.call("area", &[w, h])?;
//! let CallOutcome::Value(area) = report.outcome else { unreachable!() };
//! assert_eq!(rt.decode::<u64>(area)?, 307_200);
//!
//! let zero = rt.encode(0_u32)?;
//! let report = rt.call("area", &[zero, h])?;
//! let CallOutcome::Value(err) = report.outcome else { unreachable!() };
//! assert_eq!(rt.describe(err), r#"{error,<<"empty image">>}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binding;
pub mod codec;
pub mod env;
pub mod error;
pub mod local;
pub mod module;
pub mod registry;
pub mod resource;
pub mod runtime;
pub mod stepper;
pub mod term;
pub mod trace;
