// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Demo: a small image/document module driven through the in-process host.
//!
//! Run with `RUST_LOG=native_bridge_profiling=trace,native_bridge_examples=info` to see every
//! call, step and suspension.

mod codecs;

use std::process::ExitCode;

use native_bridge::module::{Module, ModuleBuilder};
use native_bridge::runtime::{CallOutcome, CallReport, LocalRuntime, RuntimeError};
use native_bridge::stepper::{Quantum, SchedulerConfig};
use native_bridge::term::{ExecClass, Term};
use native_bridge_profiling::LogTraceSink;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::codecs::{
    Document, invert, open_document, page_count, render_page, rle_decode, rle_encode,
};

fn build_module() -> Result<Module, native_bridge::error::ModuleError> {
    ModuleBuilder::new("imagex_demo")
        .resource::<Document>("document")
        .scheduler(SchedulerConfig {
            // Small enough that the demo inputs suspend a few times.
            quantum: Quantum::Checkpoints(16),
            reentry_class: ExecClass::CpuBound,
        })
        .resumable("invert", ExecClass::CpuBound, invert)
        .resumable("rle_encode", ExecClass::CpuBound, rle_encode)
        .resumable("rle_decode", ExecClass::CpuBound, rle_decode)
        .function("open_document", ExecClass::IoBound, open_document)
        .function("page_count", ExecClass::Normal, page_count)
        .function("render_page", ExecClass::Normal, render_page)
        .build()
}

fn log_report(rt: &LocalRuntime, name: &str, report: CallReport) -> Option<Term> {
    match report.outcome {
        CallOutcome::Value(term) => {
            let shown = rt.describe(term);
            let shown = if shown.len() > 72 {
                let head: String = shown.chars().take(72).collect();
                format!("{head}... ({} chars)", shown.len())
            } else {
                shown
            };
            info!(function = name, steps = report.steps, value = %shown, "returned");
            Some(term)
        }
        CallOutcome::BadArg => {
            info!(function = name, "bad argument");
            None
        }
        CallOutcome::Raised(reason) => {
            info!(function = name, reason = %rt.describe(reason), "raised");
            None
        }
    }
}

fn run() -> Result<(), Box<dyn core::error::Error>> {
    let module = build_module()?;
    let mut rt = LocalRuntime::new(module)?.with_trace_sink(Box::new(LogTraceSink::new()));

    // A 64x32 grayscale gradient.
    let (width, height) = (64_u32, 32_u32);
    let pixels: Vec<u8> = (0..width * height)
        .map(|i| u8::try_from(i % width * 4).unwrap_or(u8::MAX))
        .collect();
    let argv = [
        rt.encode(pixels.clone())?,
        rt.encode(width)?,
        rt.encode(height)?,
        rt.encode(1_u32)?,
    ];
    let report = rt.call("invert", &argv)?;
    if let Some(term) = log_report(&rt, "invert", report) {
        let inverted: Vec<u8> = rt.decode(term)?;
        let matches = pixels.iter().zip(&inverted).all(|(a, b)| *a == !*b);
        info!(matches, "inverted pixels");
    }

    // Wrong geometry is a domain error; five channels is a bad argument.
    let short = [argv[0], argv[1], argv[1], argv[3]];
    let report = rt.call("invert", &short)?;
    log_report(&rt, "invert", report);
    let five = rt.encode(5_u32)?;
    let report = rt.call("invert", &[argv[0], argv[1], argv[2], five])?;
    log_report(&rt, "invert", report);

    // Run-length round trip.
    let report = rt.call("rle_encode", &[argv[0]])?;
    if let Some(packed) = log_report(&rt, "rle_encode", report) {
        let report = rt.call("rle_decode", &[packed])?;
        if let Some(unpacked) = log_report(&rt, "rle_decode", report) {
            let unpacked: Vec<u8> = rt.decode(unpacked)?;
            info!(matches = unpacked == pixels, "rle round trip");
        }
    }
    let truncated = rt.encode(vec![3_u8, 9, 4])?;
    let report = rt.call("rle_decode", &[truncated])?;
    log_report(&rt, "rle_decode", report);

    // Documents stay on the native side; the host only holds a handle.
    let pages = rt.encode(vec!["Cover".to_owned(), "Contents".to_owned()])?;
    let report = rt.call("open_document", &[pages])?;
    if let Some(doc) = log_report(&rt, "open_document", report) {
        let report = rt.call("page_count", &[doc])?;
        log_report(&rt, "page_count", report);
        for index in [1_usize, 7] {
            let index = rt.encode(index)?;
            let report = rt.call("render_page", &[doc, index])?;
            log_report(&rt, "render_page", report);
        }
        rt.env_mut().release_resource(doc);
    }

    let stats = rt.env().stats();
    info!(
        allocated = stats.allocated,
        destroyed = stats.destroyed,
        "resources"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "native_bridge_examples=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(RuntimeError::UndefinedFunction { name, arity }) = err.downcast_ref() {
                error!(%name, arity, "demo called an unknown function");
            } else {
                error!(%err, "demo failed");
            }
            ExitCode::FAILURE
        }
    }
}
