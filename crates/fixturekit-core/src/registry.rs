//! Name-indexed registry of builders.
//!
//! Each name maps to at most one entry: either a content kind driven by
//! [`ObjectBuilder`](crate::builder::ObjectBuilder), or a factory for any
//! other [`Builder`] type. Re-registering a name requires an explicit
//! `force`, and [`BuilderRegistry::scoped`] swaps entries for the duration of
//! a block (for example switching every content builder to an alternate
//! implementation) and restores the previous mapping afterwards.

use std::any::Any;
use std::ops::Deref;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fixturekit_types::error::BuilderError;

use crate::builder::Builder;
use crate::builder::kind::BuilderKind;
use crate::context::FixtureContext;

/// Produces a fresh builder of type `B` for a context.
pub type BuilderFactory<B> = Arc<dyn Fn(&FixtureContext) -> Result<B, BuilderError> + Send + Sync>;

#[derive(Clone)]
enum RegisteredBuilder {
    Kind(Arc<dyn BuilderKind>),
    /// A type-erased `BuilderFactory<B>`.
    Factory(Arc<dyn Any + Send + Sync>),
}

/// A registered entry together with its type identity.
#[derive(Clone)]
pub struct Registration {
    builder: RegisteredBuilder,
    type_name: String,
}

impl Registration {
    /// The content kind, if this entry is one.
    pub fn kind(&self) -> Option<Arc<dyn BuilderKind>> {
        match &self.builder {
            RegisteredBuilder::Kind(kind) => Some(Arc::clone(kind)),
            RegisteredBuilder::Factory(_) => None,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Registry of builders, indexed by human-readable name.
pub struct BuilderRegistry {
    builders: DashMap<String, Registration>,
}

impl BuilderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            builders: DashMap::new(),
        }
    }

    /// Register a kind under the given name.
    ///
    /// Fails with [`BuilderError::DuplicateRegistration`] if the name is
    /// already taken and `force` is false; with `force` the new kind wins.
    pub fn register(
        &self,
        name: impl Into<String>,
        kind: impl BuilderKind + 'static,
        force: bool,
    ) -> Result<(), BuilderError> {
        self.register_arc(name, Arc::new(kind), force)
    }

    /// Register an already shared kind.
    pub fn register_arc(
        &self,
        name: impl Into<String>,
        kind: Arc<dyn BuilderKind>,
        force: bool,
    ) -> Result<(), BuilderError> {
        let registration = Registration {
            type_name: kind.type_name(),
            builder: RegisteredBuilder::Kind(kind),
        };
        self.insert(name.into(), registration, force)
    }

    /// Register a factory for builders of type `B` under the given name.
    ///
    /// Same collision rules as [`register`](Self::register); kinds and
    /// factories share one namespace.
    pub fn register_factory<B, F>(&self, name: impl Into<String>, factory: F, force: bool) -> Result<(), BuilderError>
    where
        B: Builder + 'static,
        F: Fn(&FixtureContext) -> Result<B, BuilderError> + Send + Sync + 'static,
    {
        let factory: BuilderFactory<B> = Arc::new(factory);
        let registration = Registration {
            type_name: std::any::type_name::<B>().to_string(),
            builder: RegisteredBuilder::Factory(Arc::new(factory)),
        };
        self.insert(name.into(), registration, force)
    }

    fn insert(&self, name: String, registration: Registration, force: bool) -> Result<(), BuilderError> {
        match self.builders.entry(name.clone()) {
            Entry::Occupied(mut occupied) => {
                if !force {
                    return Err(BuilderError::DuplicateRegistration {
                        name,
                        existing: occupied.get().type_name.clone(),
                    });
                }
                tracing::debug!(
                    name = %name,
                    previous = %occupied.get().type_name,
                    replacement = %registration.type_name,
                    "overriding builder registration"
                );
                occupied.insert(registration);
            }
            Entry::Vacant(vacant) => {
                tracing::debug!(name = %name, kind = %registration.type_name, "registering builder");
                vacant.insert(registration);
            }
        }
        Ok(())
    }

    fn registration(&self, name: &str) -> Result<Registration, BuilderError> {
        self.builders
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BuilderError::NotFound(name.to_string()))
    }

    /// Look up a content kind by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn BuilderKind>, BuilderError> {
        let registration = self.registration(name)?;
        registration.kind().ok_or_else(|| {
            BuilderError::InvalidDeclaration(format!(
                "builder \"{name}\" is a {}, not a content kind",
                registration.type_name
            ))
        })
    }

    /// Look up the factory registered as `name`; it must produce `B`.
    pub fn factory<B: 'static>(&self, name: &str) -> Result<BuilderFactory<B>, BuilderError> {
        let registration = self.registration(name)?;
        let mismatch = || {
            BuilderError::InvalidDeclaration(format!(
                "builder \"{name}\" is a {}, not a {}",
                registration.type_name,
                std::any::type_name::<B>()
            ))
        };
        match &registration.builder {
            RegisteredBuilder::Factory(factory) => factory
                .downcast_ref::<BuilderFactory<B>>()
                .cloned()
                .ok_or_else(mismatch),
            RegisteredBuilder::Kind(_) => Err(mismatch()),
        }
    }

    /// The type identity registered under `name`, if any.
    pub fn type_name_of(&self, name: &str) -> Option<String> {
        self.builders.get(name).map(|entry| entry.value().type_name.clone())
    }

    /// List all registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builders.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Copy the current mapping.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            entries: self
                .builders
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        }
    }

    /// Replace the current mapping with a snapshot.
    pub fn restore(&self, snapshot: RegistrySnapshot) {
        self.builders.clear();
        for (name, registration) in snapshot.entries {
            self.builders.insert(name, registration);
        }
    }

    /// Snapshot the mapping now and restore it when the guard is dropped.
    ///
    /// The guard derefs to the registry, so registrations made through it
    /// (typically with `force`) are visible until the guard goes away.
    pub fn scoped(&self) -> ScopedRegistry<'_> {
        ScopedRegistry {
            registry: self,
            snapshot: Some(self.snapshot()),
        }
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A copy of the registry mapping.
#[derive(Clone)]
pub struct RegistrySnapshot {
    entries: Vec<(String, Registration)>,
}

/// Guard returned by [`BuilderRegistry::scoped`].
pub struct ScopedRegistry<'a> {
    registry: &'a BuilderRegistry,
    snapshot: Option<RegistrySnapshot>,
}

impl Deref for ScopedRegistry<'_> {
    type Target = BuilderRegistry;

    fn deref(&self) -> &Self::Target {
        self.registry
    }
}

impl Drop for ScopedRegistry<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.registry.restore(snapshot);
        }
    }
}
