// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trace sink callbacks and mask filtering.

use native_bridge::error::{Failure, NativeResult};
use native_bridge::module::ModuleBuilder;
use native_bridge::runtime::LocalRuntime;
use native_bridge::stepper::{Budget, Progress, Quantum, Resumable, SchedulerConfig, from_fn};
use native_bridge::term::ExecClass;
use native_bridge::trace::TraceMask;
use native_bridge_conformance::RecordingSink;

fn countdown(n: u32) -> NativeResult<impl Resumable<Output = u32, Error = ()>, ()> {
    let mut left = n;
    Ok(from_fn(move |budget: &mut Budget| -> Result<Progress<u32>, Failure<()>> {
        while left > 0 {
            left -= 1;
            if left > 0 && budget.checkpoint() {
                return Ok(Progress::Yield);
            }
        }
        Ok(Progress::Done(n))
    }))
}

fn half(n: u32) -> NativeResult<u32> {
    if n % 2 == 1 {
        return Err(Failure::bad_arg("odd"));
    }
    Ok(n / 2)
}

fn traced(mask: TraceMask) -> (LocalRuntime, RecordingSink) {
    let module = ModuleBuilder::new("traced")
        .scheduler(SchedulerConfig {
            quantum: Quantum::Checkpoints(2),
            ..SchedulerConfig::default()
        })
        .resumable("countdown", ExecClass::CpuBound, countdown)
        .function("half", ExecClass::Normal, half)
        .build()
        .unwrap();
    let sink = RecordingSink::new(mask);
    let rt = LocalRuntime::new(module)
        .unwrap()
        .with_trace_sink(Box::new(sink.clone()));
    (rt, sink)
}

#[test]
fn steps_are_scoped_and_reported() {
    let (mut rt, sink) = traced(TraceMask::ALL);
    let n = rt.encode(4_u32).unwrap();
    let report = rt.call("countdown", &[n]).unwrap();
    assert_eq!(report.steps, 2);
    assert_eq!(
        sink.lines(),
        [
            "enter call countdown/1",
            "suspended countdown after 1",
            "exit call countdown/1",
            "enter step countdown#2",
            "exit step countdown#2",
            "finished countdown in 2",
        ]
    );
}

#[test]
fn failures_are_reported_with_their_reason() {
    let (mut rt, sink) = traced(TraceMask::FAILURE);
    let odd = rt.encode(3_u32).unwrap();
    let _ = rt.call("half", &[odd]).unwrap();
    let text = rt.encode("x").unwrap();
    let _ = rt.call("half", &[text]).unwrap();
    let even = rt.encode(4_u32).unwrap();
    let _ = rt.call("half", &[even]).unwrap();
    assert_eq!(
        sink.lines(),
        [
            "badarg half: invalid argument: odd",
            "badarg half: type mismatch: expected u32",
        ]
    );
}

#[test]
fn masked_out_callbacks_are_skipped() {
    let (mut rt, sink) = traced(TraceMask::CALL);
    let n = rt.encode(4_u32).unwrap();
    let _ = rt.call("countdown", &[n]).unwrap();
    assert_eq!(
        sink.lines(),
        ["enter call countdown/1", "exit call countdown/1"]
    );

    assert!(rt.take_trace_sink().is_some());
    let _ = rt.call("countdown", &[n]).unwrap();
    assert_eq!(sink.lines().len(), 2);
}
