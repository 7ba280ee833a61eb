// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Module-wide registration state.
//!
//! The registry is filled while a [`ModuleBuilder`](crate::module::ModuleBuilder) collects
//! resource types, bound to host type ids once by [`Module::load`](crate::module::Module::load),
//! and read-only afterwards. Every call reads it through [`CallCx`](crate::env::CallCx).

use core::any::TypeId;
use core::fmt;

use hashbrown::HashMap;

use crate::env::{Destructor, Env};
use crate::error::{LoadError, ModuleError};
use crate::resource::release_object;
use crate::stepper::SchedulerConfig;
use crate::term::ResourceTypeId;

struct ResourceType {
    name: Box<str>,
    destructor: Destructor,
    host_id: Option<ResourceTypeId>,
}

/// Resource types and scheduler configuration of one module.
#[derive(Default)]
pub struct Registry {
    types: Vec<ResourceType>,
    by_type: HashMap<TypeId, usize>,
    config: SchedulerConfig,
    loaded: bool,
}

impl Registry {
    /// Returns the host id of `T`'s resource type, once loaded.
    #[must_use]
    pub fn resource_type_id<T: 'static>(&self) -> Option<ResourceTypeId> {
        let idx = *self.by_type.get(&TypeId::of::<T>())?;
        self.types[idx].host_id
    }

    /// Returns `true` once [`Module::load`](crate::module::Module::load) succeeded.
    #[must_use]
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Returns the scheduler configuration.
    #[must_use]
    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Iterates over registered resource type names, in registration order.
    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| &*t.name)
    }

    pub(crate) fn register<T>(&mut self, name: &str) -> Result<(), ModuleError>
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        if let Some(&idx) = self.by_type.get(&type_id) {
            return Err(ModuleError::DuplicateResourceType(self.types[idx].name.clone()));
        }
        if self.types.iter().any(|t| &*t.name == name) {
            return Err(ModuleError::DuplicateResourceName(name.into()));
        }
        self.by_type.insert(type_id, self.types.len());
        self.types.push(ResourceType {
            name: name.into(),
            destructor: release_object::<T>,
            host_id: None,
        });
        Ok(())
    }

    pub(crate) fn set_config(&mut self, config: SchedulerConfig) {
        self.config = config;
    }

    pub(crate) fn load(&mut self, env: &mut dyn Env) -> Result<(), LoadError> {
        if self.loaded {
            return Err(LoadError::AlreadyLoaded);
        }
        // Ids are bound only once every type has opened; a rejected load leaves nothing behind.
        let ids = self
            .types
            .iter()
            .map(|ty| {
                env.open_resource_type(&ty.name, ty.destructor)
                    .ok_or_else(|| LoadError::ResourceTypeRejected {
                        name: ty.name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (ty, id) in self.types.iter_mut().zip(ids) {
            ty.host_id = Some(id);
        }
        self.loaded = true;
        Ok(())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("resources", &self.resource_names().collect::<Vec<_>>())
            .field("config", &self.config)
            .field("loaded", &self.loaded)
            .finish()
    }
}
