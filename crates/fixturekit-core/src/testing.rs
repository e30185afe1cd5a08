//! Test-lifecycle layers.
//!
//! Layers reset the shared state of a [`FixtureContext`] between tests:
//! [`BuilderLayer`] snapshots the registry and opens a session at test set-up,
//! then restores the registry and closes the session at tear-down.
//! [`SessionFactoryLayer`] swaps the session factory for a whole suite and
//! [`TempDirectoryLayer`] adds a scratch directory per test. [`FixtureTest`]
//! wraps a layer in an RAII guard for plain `#[test]` functions.

use std::path::Path;
use std::sync::Arc;

use fixturekit_types::error::BuilderError;
use tempfile::TempDir;

use crate::context::FixtureContext;
use crate::registry::RegistrySnapshot;
use crate::session::{BuilderSession, SessionFactory};

/// Hooks run around a suite and around each test of it.
pub trait Layer {
    fn set_up(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
        Ok(())
    }

    fn tear_down(&mut self, _ctx: &FixtureContext) {}

    fn test_set_up(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
        Ok(())
    }

    fn test_tear_down(&mut self, _ctx: &FixtureContext) {}
}

/// Opens a session per test and isolates registry changes.
#[derive(Default)]
pub struct BuilderLayer {
    snapshot: Option<RegistrySnapshot>,
}

impl BuilderLayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Layer for BuilderLayer {
    fn test_set_up(&mut self, ctx: &FixtureContext) -> Result<(), BuilderError> {
        self.snapshot = Some(ctx.registry().snapshot());
        ctx.sessions().begin();
        Ok(())
    }

    fn test_tear_down(&mut self, ctx: &FixtureContext) {
        ctx.sessions().end();
        if let Some(snapshot) = self.snapshot.take() {
            ctx.registry().restore(snapshot);
        }
    }
}

/// Installs a session factory for the duration of a suite.
pub struct SessionFactoryLayer {
    factory: SessionFactory,
    previous: Option<SessionFactory>,
}

impl SessionFactoryLayer {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            previous: None,
        }
    }
}

impl Layer for SessionFactoryLayer {
    fn set_up(&mut self, ctx: &FixtureContext) -> Result<(), BuilderError> {
        self.previous = Some(ctx.sessions().set_factory(Arc::clone(&self.factory)));
        Ok(())
    }

    fn tear_down(&mut self, ctx: &FixtureContext) {
        if let Some(previous) = self.previous.take() {
            ctx.sessions().set_factory(previous);
        }
    }
}

/// [`BuilderLayer`] plus a fresh temporary directory per test.
#[derive(Default)]
pub struct TempDirectoryLayer {
    builder: BuilderLayer,
    temp_directory: Option<TempDir>,
}

impl TempDirectoryLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The directory of the running test.
    pub fn temp_directory(&self) -> Option<&Path> {
        self.temp_directory.as_ref().map(TempDir::path)
    }
}

impl Layer for TempDirectoryLayer {
    fn test_set_up(&mut self, ctx: &FixtureContext) -> Result<(), BuilderError> {
        self.builder.test_set_up(ctx)?;
        let dir = tempfile::Builder::new()
            .suffix("fixturekit")
            .tempdir()
            .map_err(BuilderError::io_at(std::env::temp_dir()))?;
        tracing::debug!(path = %dir.path().display(), "temp directory created");
        self.temp_directory = Some(dir);
        Ok(())
    }

    fn test_tear_down(&mut self, ctx: &FixtureContext) {
        // Dropping the TempDir removes it.
        self.temp_directory = None;
        self.builder.test_tear_down(ctx);
    }
}

/// A running test: set up on creation, torn down on drop.
pub struct FixtureTest<'a, L: Layer = BuilderLayer> {
    ctx: &'a FixtureContext,
    layer: L,
}

impl<'a> FixtureTest<'a, BuilderLayer> {
    /// Start a test with a plain [`BuilderLayer`].
    pub fn start(ctx: &'a FixtureContext) -> Result<Self, BuilderError> {
        Self::with_layer(ctx, BuilderLayer::new())
    }
}

impl<'a> FixtureTest<'a, TempDirectoryLayer> {
    /// Start a test with a scratch directory.
    pub fn with_temp_directory(ctx: &'a FixtureContext) -> Result<Self, BuilderError> {
        Self::with_layer(ctx, TempDirectoryLayer::new())
    }

    pub fn temp_directory(&self) -> &Path {
        self.layer
            .temp_directory()
            .expect("temp directory exists while the test runs")
    }
}

impl<'a, L: Layer> FixtureTest<'a, L> {
    pub fn with_layer(ctx: &'a FixtureContext, mut layer: L) -> Result<Self, BuilderError> {
        layer.test_set_up(ctx)?;
        Ok(Self { ctx, layer })
    }

    pub fn context(&self) -> &'a FixtureContext {
        self.ctx
    }

    /// The session opened for this test.
    pub fn session(&self) -> Result<Arc<BuilderSession>, BuilderError> {
        self.ctx.session()
    }
}

impl<L: Layer> Drop for FixtureTest<'_, L> {
    fn drop(&mut self) {
        self.layer.test_tear_down(self.ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::kind::ContentKind;
    use crate::session::functional_session_factory;

    #[test]
    fn test_builder_layer_opens_and_closes_session() {
        let ctx = FixtureContext::in_memory();
        {
            let test = FixtureTest::start(&ctx).unwrap();
            assert!(test.session().is_ok());
        }
        assert!(matches!(ctx.session(), Err(BuilderError::NoSession)));
    }

    #[test]
    fn test_registry_changes_do_not_leak() {
        let ctx = FixtureContext::in_memory();
        ctx.registry().register("folder", ContentKind::new("Folder"), false).unwrap();
        {
            let _test = FixtureTest::start(&ctx).unwrap();
            ctx.registry().register("page", ContentKind::new("Document"), false).unwrap();
            ctx.registry().register("folder", ContentKind::new("Dossier"), true).unwrap();
        }
        assert_eq!(ctx.registry().names(), vec!["folder"]);
        assert_eq!(ctx.registry().get("folder").unwrap().portal_type(), "Folder");
    }

    #[test]
    fn test_session_flags_do_not_leak() {
        let ctx = FixtureContext::in_memory();
        {
            let test = FixtureTest::start(&ctx).unwrap();
            test.session().unwrap().set_auto_commit(true);
        }
        let test = FixtureTest::start(&ctx).unwrap();
        assert!(!test.session().unwrap().auto_commit());
    }

    #[test]
    fn test_session_factory_layer() {
        let ctx = FixtureContext::in_memory();
        let mut suite = SessionFactoryLayer::new(functional_session_factory());
        suite.set_up(&ctx).unwrap();
        {
            let test = FixtureTest::start(&ctx).unwrap();
            assert!(test.session().unwrap().auto_commit());
        }
        suite.tear_down(&ctx);

        let test = FixtureTest::start(&ctx).unwrap();
        assert!(!test.session().unwrap().auto_commit());
    }

    #[test]
    fn test_temp_directory_is_removed() {
        let ctx = FixtureContext::in_memory();
        let path = {
            let test = FixtureTest::with_temp_directory(&ctx).unwrap();
            assert!(test.temp_directory().is_dir());
            test.temp_directory().to_path_buf()
        };
        assert!(!path.exists());
    }
}
