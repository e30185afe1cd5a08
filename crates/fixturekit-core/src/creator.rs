//! The creator chain: middleware around the terminal create call.
//!
//! Creators are kept in an ordered list whose index 0 is the entry point of
//! every [`FixtureContext::create`](crate::context::FixtureContext::create).
//! A creator receives an [`Invocation`] and calls [`Invocation::proceed`] to
//! hand over to the next creator. "Next" is resolved from the creator's
//! position at call time, never captured at installation, so wrappers may be
//! installed or removed while a creation is running. The last entry is always
//! the direct creator, which runs the builder lifecycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use fixturekit_types::error::BuilderError;

use crate::clock::VirtualClock;

/// Identity of an installed creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatorId(u64);

const DIRECT_ID: CreatorId = CreatorId(0);

/// A link of the chain.
pub trait Creator: Send + Sync {
    /// Handle one creation. Call `invocation.proceed()` to delegate.
    fn create(&self, invocation: &mut Invocation<'_>) -> Result<(), BuilderError>;
}

impl<F> Creator for F
where
    F: Fn(&mut Invocation<'_>) -> Result<(), BuilderError> + Send + Sync,
{
    fn create(&self, invocation: &mut Invocation<'_>) -> Result<(), BuilderError> {
        self(invocation)
    }
}

/// Terminal creator: runs the builder lifecycle.
struct DirectCreator;

impl Creator for DirectCreator {
    fn create(&self, invocation: &mut Invocation<'_>) -> Result<(), BuilderError> {
        (invocation.terminal)()
    }
}

/// One pass through the chain.
pub struct Invocation<'a> {
    chain: &'a CreatorChain,
    current: Option<CreatorId>,
    builder_type: &'a str,
    terminal: &'a mut dyn FnMut() -> Result<(), BuilderError>,
}

impl Invocation<'_> {
    /// Short type name of the builder being created.
    pub fn builder_type(&self) -> &str {
        self.builder_type
    }

    /// Delegate to the creator after the current one.
    ///
    /// A one-off creator, or one removed from the chain meanwhile, delegates
    /// to the entry point.
    pub fn proceed(&mut self) -> Result<(), BuilderError> {
        let index = match self.current {
            Some(id) => self.chain.position(id).map_or(0, |i| i + 1),
            None => 0,
        };
        let chain = self.chain;
        chain.dispatch_at(index, self)
    }
}

/// Ordered list of creators, entry point first.
pub struct CreatorChain {
    entries: Mutex<Vec<(CreatorId, Arc<dyn Creator>)>>,
    next_id: AtomicU64,
}

impl CreatorChain {
    /// A chain holding only the direct creator.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(vec![(DIRECT_ID, Arc::new(DirectCreator) as Arc<dyn Creator>)]),
            next_id: AtomicU64::new(1),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Vec<(CreatorId, Arc<dyn Creator>)>> {
        self.entries.lock().expect("creator chain lock poisoned")
    }

    /// Install `creator` as the new entry point.
    pub fn push(&self, creator: impl Creator + 'static) -> CreatorId {
        let id = CreatorId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.entries().insert(0, (id, Arc::new(creator)));
        tracing::debug!(creator = id.0, "creator installed");
        id
    }

    /// Remove an installed creator. The direct creator cannot be removed.
    pub fn remove(&self, id: CreatorId) -> bool {
        if id == DIRECT_ID {
            return false;
        }
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        let removed = entries.len() != before;
        if removed {
            tracing::debug!(creator = id.0, "creator removed");
        }
        removed
    }

    /// Install `creator` until the returned guard is dropped.
    #[must_use = "the creator is removed when the guard is dropped"]
    pub fn install(&self, creator: impl Creator + 'static) -> CreatorGuard<'_> {
        CreatorGuard {
            chain: self,
            id: self.push(creator),
        }
    }

    /// Current order, entry point first.
    pub fn ids(&self) -> Vec<CreatorId> {
        self.entries().iter().map(|(id, _)| *id).collect()
    }

    /// Number of creators, including the direct one.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Run `terminal` through the whole chain.
    pub fn dispatch(
        &self,
        builder_type: &str,
        terminal: &mut dyn FnMut() -> Result<(), BuilderError>,
    ) -> Result<(), BuilderError> {
        let mut invocation = Invocation {
            chain: self,
            current: None,
            builder_type,
            terminal,
        };
        self.dispatch_at(0, &mut invocation)
    }

    /// Run `terminal` with `creator` as a one-off entry point in front of the
    /// installed chain.
    pub fn run_with(
        &self,
        creator: &dyn Creator,
        builder_type: &str,
        terminal: &mut dyn FnMut() -> Result<(), BuilderError>,
    ) -> Result<(), BuilderError> {
        let mut invocation = Invocation {
            chain: self,
            current: None,
            builder_type,
            terminal,
        };
        creator.create(&mut invocation)
    }

    fn position(&self, id: CreatorId) -> Option<usize> {
        self.entries().iter().position(|(entry, _)| *entry == id)
    }

    fn dispatch_at(&self, index: usize, invocation: &mut Invocation<'_>) -> Result<(), BuilderError> {
        // Clone out of the lock so the creator may touch the chain.
        let (id, creator) = {
            let entries = self.entries();
            let (id, creator) = entries
                .get(index)
                .or_else(|| entries.last())
                .expect("creator chain always holds the direct creator");
            (*id, Arc::clone(creator))
        };

        let previous = invocation.current.replace(id);
        let result = creator.create(invocation);
        invocation.current = previous;
        result
    }
}

impl Default for CreatorChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its creator on drop, wherever it sits in the chain by then.
pub struct CreatorGuard<'a> {
    chain: &'a CreatorChain,
    id: CreatorId,
}

impl CreatorGuard<'_> {
    pub fn id(&self) -> CreatorId {
        self.id
    }
}

impl Drop for CreatorGuard<'_> {
    fn drop(&mut self) {
        self.chain.remove(self.id);
    }
}

/// A creator advancing `clock` by `increment` after each successful creation.
///
/// Gives consecutively created objects distinct, ordered creation dates.
pub fn ticking_creator(clock: VirtualClock, increment: Duration) -> impl Creator {
    move |invocation: &mut Invocation<'_>| -> Result<(), BuilderError> {
        invocation.proceed()?;
        clock.advance(increment);
        Ok(())
    }
}
