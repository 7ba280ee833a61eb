// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The registration table handed to the host.
//!
//! ```
//! use native_bridge::error::{Failure, NativeResult};
//! use native_bridge::module::ModuleBuilder;
//! use native_bridge::term::ExecClass;
//!
//! fn scale(width: u32, factor: u32) -> NativeResult<u32, String> {
//!     width
//!         .checked_mul(factor)
//!         .ok_or_else(|| Failure::Domain("overflow".to_owned()))
//! }
//!
//! let module = ModuleBuilder::new("thumbnails")
//!     .function("scale", ExecClass::Normal, scale)
//!     .build()
//!     .unwrap();
//! assert_eq!(module.function("scale", 2).map(|f| f.arity()), Some(2));
//! ```

use core::fmt;

use hashbrown::HashMap;

use crate::binding::{
    ArgList, Args, Dispatch, NativeFn, PersistentArgs, Plain, Raw, Reply, Stepped,
};
use crate::codec::Encode;
use crate::env::{CallCx, Env};
use crate::error::{DecodeError, LoadError, ModuleError, NativeResult};
use crate::registry::Registry;
use crate::stepper::{CONTINUATION_RESOURCE, Continuation, Resumable, SchedulerConfig};
use crate::term::{ExecClass, Term};
use crate::trace::ScopeKind;

/// One bound function.
pub struct FunctionEntry {
    name: Box<str>,
    arity: usize,
    class: ExecClass,
    dispatch: Box<dyn Dispatch>,
}

impl FunctionEntry {
    /// Host-visible name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments.
    #[must_use]
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Pool the host should run this function on.
    #[must_use]
    #[inline]
    pub fn class(&self) -> ExecClass {
        self.class
    }

    /// Handles one host call.
    ///
    /// Panics in the bound function or in its converters never unwind out of here. Failures are
    /// reported through `env` (bad arguments, raised exceptions) and the returned term is
    /// whatever the host should see as the call's result.
    pub fn call(&self, cx: &mut CallCx<'_>, env: &mut dyn Env, argv: &[Term]) -> Term {
        let kind = ScopeKind::Call {
            name: &self.name,
            arity: self.arity,
            class: self.class,
        };
        cx.scope_enter(kind);
        let term = if !cx.registry().is_loaded() {
            Reply::Raise("module is not loaded".to_owned()).into_term(cx, &self.name, env)
        } else if argv.len() != self.arity {
            let reason = DecodeError::ArityMismatch {
                expected: self.arity,
                found: argv.len(),
            };
            Reply::BadArg(reason).into_term(cx, &self.name, env)
        } else {
            self.dispatch.dispatch(cx, env, &self.name, argv)
        };
        cx.scope_exit(kind);
        term
    }
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

/// Collects resource types, functions and configuration for a [`Module`].
///
/// Registration errors are kept until [`ModuleBuilder::build`], so the builder chains without
/// intermediate `Result`s.
pub struct ModuleBuilder {
    name: Box<str>,
    registry: Registry,
    functions: Vec<FunctionEntry>,
    error: Option<ModuleError>,
}

impl ModuleBuilder {
    /// Starts a module named `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut registry = Registry::default();
        let error = registry
            .register::<Continuation>(CONTINUATION_RESOURCE)
            .err();
        Self {
            name: name.into(),
            registry,
            functions: Vec::new(),
            error,
        }
    }

    /// Registers `T` as a resource type named `name`.
    #[must_use]
    pub fn resource<T>(mut self, name: &str) -> Self
    where
        T: Send + Sync + 'static,
    {
        if let Err(err) = self.registry.register::<T>(name) {
            self.error.get_or_insert(err);
        }
        self
    }

    /// Sets the scheduler configuration used by resumable functions.
    #[must_use]
    pub fn scheduler(mut self, config: SchedulerConfig) -> Self {
        self.registry.set_config(config);
        self
    }

    /// Binds an ordinary function. Its arity is the length of its parameter list.
    #[must_use]
    pub fn function<F, A, T, E>(self, name: &str, class: ExecClass, f: F) -> Self
    where
        A: ArgList,
        F: NativeFn<A, Output = NativeResult<T, E>>,
        T: Encode + 'static,
        E: Encode + 'static,
    {
        self.push(name, A::ARITY, class, Box::new(Plain::<F, A>::new(f)))
    }

    /// Binds a function returning a [`Resumable`] machine, driven by the cooperative stepper.
    ///
    /// Arguments are detached from the call before the machine is built, so resource handles it
    /// returns later are materialized afresh.
    #[must_use]
    pub fn resumable<F, A, M>(self, name: &str, class: ExecClass, f: F) -> Self
    where
        A: PersistentArgs,
        F: NativeFn<A, Output = NativeResult<M, M::Error>>,
        M: Resumable,
    {
        self.push(name, A::ARITY, class, Box::new(Stepped::<F, A>::new(f)))
    }

    /// Binds a function that decodes its own `arity` arguments and may borrow from them.
    #[must_use]
    pub fn raw<F, T, E>(self, name: &str, arity: usize, class: ExecClass, f: F) -> Self
    where
        F: for<'a> Fn(Args<'a>) -> NativeResult<T, E> + Send + Sync + 'static,
        T: Encode + 'static,
        E: Encode + 'static,
    {
        self.push(name, arity, class, Box::new(Raw::new(f)))
    }

    fn push(
        mut self,
        name: &str,
        arity: usize,
        class: ExecClass,
        dispatch: Box<dyn Dispatch>,
    ) -> Self {
        self.functions.push(FunctionEntry {
            name: name.into(),
            arity,
            class,
            dispatch,
        });
        self
    }

    /// Validates the table and produces the module.
    pub fn build(self) -> Result<Module, ModuleError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut index: HashMap<Box<str>, Vec<usize>> = HashMap::new();
        for (i, entry) in self.functions.iter().enumerate() {
            let slots = index.entry(entry.name.clone()).or_default();
            if slots.iter().any(|&j| self.functions[j].arity == entry.arity) {
                return Err(ModuleError::DuplicateFunction {
                    name: entry.name.clone(),
                    arity: entry.arity,
                });
            }
            slots.push(i);
        }
        Ok(Module {
            name: self.name,
            registry: self.registry,
            functions: self.functions,
            index,
        })
    }
}

impl fmt::Debug for ModuleBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleBuilder")
            .field("name", &self.name)
            .field("functions", &self.functions.len())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// A validated registration table.
pub struct Module {
    name: Box<str>,
    registry: Registry,
    functions: Vec<FunctionEntry>,
    index: HashMap<Box<str>, Vec<usize>>,
}

impl Module {
    /// Module name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module's registry.
    #[must_use]
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Every bound function, in registration order.
    #[must_use]
    #[inline]
    pub fn functions(&self) -> &[FunctionEntry] {
        &self.functions
    }

    /// Looks up a function by name and arity.
    #[must_use]
    pub fn function(&self, name: &str, arity: usize) -> Option<&FunctionEntry> {
        self.index
            .get(name)?
            .iter()
            .map(|&i| &self.functions[i])
            .find(|entry| entry.arity == arity)
    }

    /// Opens every resource type with the host. Must run once, before any call.
    pub fn load(&mut self, env: &mut dyn Env) -> Result<(), LoadError> {
        self.registry.load(env)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("registry", &self.registry)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}
