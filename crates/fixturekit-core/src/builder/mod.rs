//! The builder lifecycle protocol.
//!
//! Every builder accumulates configuration through chained setters that never
//! fail, then produces its object in three phases:
//!
//! 1. `before_create` -- validation and derived defaults
//! 2. `create_object` -- the actual creation
//! 3. `after_create` -- configuration that can only be applied to the created object
//!
//! A failing phase aborts the remaining ones and its error is returned as is.
//! Builders are not created directly; they are handed to
//! [`FixtureContext::create`](crate::context::FixtureContext::create), which
//! routes the call through the creator chain.

pub mod kind;
pub mod object;

use fixturekit_types::error::BuilderError;

use crate::context::FixtureContext;

pub use kind::{BuilderKind, ContentKind};
pub use object::{ObjectBuilder, ObjectSettings};

/// Shared contract of all builders.
pub trait Builder {
    /// What `create()` produces.
    type Output;

    /// Validate configuration and derive defaults.
    fn before_create(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
        Ok(())
    }

    /// Produce the object.
    fn create_object(&mut self, ctx: &FixtureContext) -> Result<Self::Output, BuilderError>;

    /// Apply configuration that needs the created object.
    fn after_create(
        &mut self,
        _ctx: &FixtureContext,
        _output: &Self::Output,
    ) -> Result<(), BuilderError> {
        Ok(())
    }

    /// Name reported to creators and in logs.
    fn type_name(&self) -> String {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base).to_string()
    }
}

/// Run the three lifecycle phases of `builder`.
pub fn run_lifecycle<B: Builder + ?Sized>(
    builder: &mut B,
    ctx: &FixtureContext,
) -> Result<B::Output, BuilderError> {
    builder.before_create(ctx)?;
    let output = builder.create_object(ctx)?;
    builder.after_create(ctx, &output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recording<'a> {
        log: &'a RefCell<Vec<&'static str>>,
        fail_in: Option<&'static str>,
    }

    impl Recording<'_> {
        fn step(&self, name: &'static str) -> Result<(), BuilderError> {
            self.log.borrow_mut().push(name);
            if self.fail_in == Some(name) {
                return Err(BuilderError::MissingConfiguration(name.to_string()));
            }
            Ok(())
        }
    }

    impl Builder for Recording<'_> {
        type Output = u32;

        fn before_create(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
            self.step("before")
        }

        fn create_object(&mut self, _ctx: &FixtureContext) -> Result<u32, BuilderError> {
            self.step("create")?;
            Ok(42)
        }

        fn after_create(&mut self, _ctx: &FixtureContext, output: &u32) -> Result<(), BuilderError> {
            assert_eq!(*output, 42);
            self.step("after")
        }
    }

    #[test]
    fn test_phases_run_in_order() {
        let ctx = FixtureContext::in_memory();
        let log = RefCell::new(Vec::new());
        let mut builder = Recording { log: &log, fail_in: None };

        assert_eq!(run_lifecycle(&mut builder, &ctx).unwrap(), 42);
        assert_eq!(*log.borrow(), vec!["before", "create", "after"]);
    }

    #[test]
    fn test_failure_aborts_remaining_phases() {
        let ctx = FixtureContext::in_memory();
        let log = RefCell::new(Vec::new());
        let mut builder = Recording { log: &log, fail_in: Some("before") };

        let err = run_lifecycle(&mut builder, &ctx).unwrap_err();
        assert!(matches!(err, BuilderError::MissingConfiguration(ref phase) if phase == "before"));
        assert_eq!(*log.borrow(), vec!["before"]);
    }

    #[test]
    fn test_default_type_name_is_short() {
        let log = RefCell::new(Vec::new());
        let builder = Recording { log: &log, fail_in: None };
        assert!(builder.type_name().starts_with("Recording"));
    }
}
