//! The fixture context: registry, session slot, creator chain and platform.
//!
//! Each test owns one `FixtureContext` instead of sharing process-wide state.
//! The test layers in [`crate::testing`] reset it between tests.

use std::sync::Arc;

use fixturekit_types::error::BuilderError;

use crate::builder::{Builder, ObjectBuilder, run_lifecycle};
use crate::creator::{Creator, CreatorChain};
use crate::platform::Platform;
use crate::platform::memory::MemoryPlatform;
use crate::registry::BuilderRegistry;
use crate::session::{BuilderSession, SessionSlot};

/// Everything builders share while a test runs.
pub struct FixtureContext {
    registry: BuilderRegistry,
    sessions: SessionSlot,
    creators: CreatorChain,
    platform: Arc<dyn Platform>,
}

impl FixtureContext {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            registry: BuilderRegistry::new(),
            sessions: SessionSlot::new(),
            creators: CreatorChain::new(),
            platform,
        }
    }

    /// A context backed by a fresh [`MemoryPlatform`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPlatform::new()))
    }

    pub fn registry(&self) -> &BuilderRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionSlot {
        &self.sessions
    }

    pub fn creators(&self) -> &CreatorChain {
        &self.creators
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    /// The current session; [`BuilderError::NoSession`] outside a test.
    pub fn session(&self) -> Result<Arc<BuilderSession>, BuilderError> {
        self.sessions.current()
    }

    /// A fresh builder for the kind registered as `name`, bound to the
    /// current session.
    pub fn builder(&self, name: &str) -> Result<ObjectBuilder, BuilderError> {
        let session = self.session()?;
        let kind = self.registry.get(name)?;
        Ok(ObjectBuilder::new(session, kind))
    }

    /// A fresh builder from the factory registered as `name`.
    pub fn build<B: 'static>(&self, name: &str) -> Result<B, BuilderError> {
        self.session()?;
        let factory = self.registry.factory::<B>(name)?;
        factory(self)
    }

    /// Create through the creator chain.
    pub fn create<B: Builder>(&self, builder: B) -> Result<B::Output, BuilderError> {
        self.create_via(None, builder)
    }

    /// Create with `creator` as a one-off entry point in front of the chain.
    pub fn create_with<B: Builder>(
        &self,
        creator: &dyn Creator,
        builder: B,
    ) -> Result<B::Output, BuilderError> {
        self.create_via(Some(creator), builder)
    }

    fn create_via<B: Builder>(
        &self,
        creator: Option<&dyn Creator>,
        mut builder: B,
    ) -> Result<B::Output, BuilderError> {
        let type_name = builder.type_name();
        tracing::debug!(builder = %type_name, "creating");

        let mut output = None;
        let mut terminal = || -> Result<(), BuilderError> {
            output = Some(run_lifecycle(&mut builder, self)?);
            Ok(())
        };

        match creator {
            Some(creator) => self.creators.run_with(creator, &type_name, &mut terminal)?,
            None => self.creators.dispatch(&type_name, &mut terminal)?,
        }

        output.ok_or(BuilderError::CreationSkipped(type_name))
    }
}
