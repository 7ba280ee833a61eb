// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Profiling adapters for `native_bridge` (currently Tracy, plus a `tracing` log sink).
//!
//! This crate keeps `native_bridge` itself free of profiling and logging dependencies.
//! Both sinks listen for scope enter/exit callbacks and point events and forward them to
//! their backend.
//!
//! ## Backends
//! - [`ProfilingTraceSink`] emits Tracy zones via `tracy-client`, one per bound-function call
//!   and one per continuation step. Faults and bad arguments become Tracy messages.
//! - [`LogTraceSink`] emits `tracing` spans and events, so whatever subscriber the host
//!   installed (for example `tracing-subscriber` with an `EnvFilter`) decides what is kept.
//!
//! ## Example
//! ```ignore
//! use native_bridge::runtime::LocalRuntime;
//! use native_bridge_profiling::{LogTraceSink, ProfilingTraceSink};
//!
//! let mut rt = LocalRuntime::new(module)?.with_trace_sink(Box::new(ProfilingTraceSink::new()));
//! let report = rt.call("invert", &[input])?;
//! # Ok::<(), native_bridge::runtime::RuntimeError>(())
//! ```

mod log;
mod resolver;
mod sink;

pub use log::LogTraceSink;
pub use resolver::{DefaultLabelResolver, LabelResolver, QualifiedLabelResolver};
pub use sink::ProfilingTraceSink;
