//! Builder sessions and the current-session slot.
//!
//! A [`BuilderSession`] carries the settings shared by every builder created
//! during one test. The [`SessionSlot`] holds the session of the running test;
//! it is filled at test set-up and cleared at tear-down by the test layers in
//! [`crate::testing`], and builders cannot be obtained while it is empty.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use fixturekit_types::config::BuilderConfig;
use fixturekit_types::error::BuilderError;

/// Cross-builder settings for one test.
#[derive(Debug)]
pub struct BuilderSession {
    auto_commit: AtomicBool,
    defaults: BuilderConfig,
}

impl BuilderSession {
    /// A session with conservative defaults (`auto_commit` off).
    pub fn new() -> Self {
        Self::from_config(BuilderConfig::default())
    }

    /// A session seeded from a loaded configuration.
    pub fn from_config(config: BuilderConfig) -> Self {
        Self {
            auto_commit: AtomicBool::new(config.auto_commit),
            defaults: config,
        }
    }

    /// The process-wide session, built on first use.
    ///
    /// For embedding without the test layers; every call returns the same
    /// instance.
    pub fn instance() -> Arc<BuilderSession> {
        static INSTANCE: OnceLock<Arc<BuilderSession>> = OnceLock::new();
        Arc::clone(INSTANCE.get_or_init(|| Arc::new(BuilderSession::new())))
    }

    pub fn auto_commit(&self) -> bool {
        self.auto_commit.load(Ordering::SeqCst)
    }

    pub fn set_auto_commit(&self, enabled: bool) {
        self.auto_commit.store(enabled, Ordering::SeqCst);
    }

    /// Version used for generated packages unless a builder overrides it.
    pub fn package_version(&self) -> &str {
        &self.defaults.package_version
    }

    /// External command producing distribution metadata, if configured.
    pub fn metadata_command(&self) -> Option<&[String]> {
        self.defaults.metadata_command.as_deref()
    }

    /// Restore every flag to the value the session was created with.
    pub fn reset(&self) {
        self.set_auto_commit(self.defaults.auto_commit);
    }
}

impl Default for BuilderSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces a fresh session for each test.
pub type SessionFactory = Arc<dyn Fn() -> BuilderSession + Send + Sync>;

/// The default factory: plain [`BuilderSession::new`].
pub fn default_session_factory() -> SessionFactory {
    Arc::new(BuilderSession::new)
}

/// Factory for functional tests, where every creation is committed.
pub fn functional_session_factory() -> SessionFactory {
    Arc::new(|| {
        let session = BuilderSession::new();
        session.set_auto_commit(true);
        session
    })
}

/// Holds the current session and the factory used to open new ones.
pub struct SessionSlot {
    current: Mutex<Option<Arc<BuilderSession>>>,
    factory: Mutex<SessionFactory>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            factory: Mutex::new(default_session_factory()),
        }
    }

    /// Open a fresh session from the current factory and make it current.
    pub fn begin(&self) -> Arc<BuilderSession> {
        let factory = Arc::clone(&self.factory.lock().expect("session factory lock poisoned"));
        let session = Arc::new(factory());
        *self.current.lock().expect("session slot lock poisoned") = Some(Arc::clone(&session));
        tracing::debug!(auto_commit = session.auto_commit(), "builder session started");
        session
    }

    /// Reset and clear the current session, if any.
    pub fn end(&self) {
        let previous = self.current.lock().expect("session slot lock poisoned").take();
        if let Some(session) = previous {
            session.reset();
            tracing::debug!("builder session ended");
        }
    }

    /// The current session.
    ///
    /// Fails with [`BuilderError::NoSession`] outside a test session.
    pub fn current(&self) -> Result<Arc<BuilderSession>, BuilderError> {
        self.current
            .lock()
            .expect("session slot lock poisoned")
            .clone()
            .ok_or(BuilderError::NoSession)
    }

    pub fn is_active(&self) -> bool {
        self.current.lock().expect("session slot lock poisoned").is_some()
    }

    /// Install a new factory, returning the previous one so it can be put back.
    pub fn set_factory(&self, factory: SessionFactory) -> SessionFactory {
        std::mem::replace(
            &mut *self.factory.lock().expect("session factory lock poisoned"),
            factory,
        )
    }
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self::new()
    }
}
