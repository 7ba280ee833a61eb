// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use native_bridge::term::ExecClass;
use std::collections::HashMap;
use std::string::String;

/// Optional label resolver for profiling scopes.
///
/// Return `None` to fall back to the default name-based labels.
pub trait LabelResolver {
    /// Resolve a label for a bound-function call scope.
    fn call_label(&mut self, _name: &str, _arity: usize, _class: ExecClass) -> Option<String> {
        None
    }

    /// Resolve a label for a continuation step scope.
    fn step_label(&mut self, _name: &str, _step: u32) -> Option<String> {
        None
    }
}

/// Default resolver that keeps the plain `name/arity` labels.
#[derive(Default, Debug)]
pub struct DefaultLabelResolver;

impl LabelResolver for DefaultLabelResolver {}

/// Resolver that prefixes labels with the module name and tags calls with their pool.
///
/// Useful when several modules report into the same profiler.
#[derive(Debug)]
pub struct QualifiedLabelResolver {
    module: String,
    call_cache: HashMap<(String, usize), String>,
    step_cache: HashMap<String, String>,
}

impl QualifiedLabelResolver {
    /// Create a resolver for the module named `module`.
    #[must_use]
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_owned(),
            call_cache: HashMap::new(),
            step_cache: HashMap::new(),
        }
    }
}

impl LabelResolver for QualifiedLabelResolver {
    fn call_label(&mut self, name: &str, arity: usize, class: ExecClass) -> Option<String> {
        let key = (name.to_owned(), arity);
        if let Some(label) = self.call_cache.get(&key) {
            return Some(label.clone());
        }
        let label = format!("{}:{name}/{arity} [{class}]", self.module);
        self.call_cache.insert(key, label.clone());
        Some(label)
    }

    // Steps share one label per function so Tracy groups them into one zone statistic.
    fn step_label(&mut self, name: &str, _step: u32) -> Option<String> {
        if let Some(label) = self.step_cache.get(name) {
            return Some(label.clone());
        }
        let label = format!("{}:{name} step", self.module);
        self.step_cache.insert(name.to_owned(), label.clone());
        Some(label)
    }
}

pub(crate) fn default_call_label(name: &str, arity: usize) -> String {
    format!("call:{name}/{arity}")
}

pub(crate) fn default_step_label(name: &str) -> String {
    format!("step:{name}")
}
