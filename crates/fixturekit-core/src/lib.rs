//! Builder registry, sessions and the builder lifecycle protocol.
//!
//! This crate defines the "ports" the fixture builders talk to (the
//! [`platform::Platform`] trait) and everything that is independent of the
//! filesystem: registration of named builder kinds, per-test sessions, the
//! `before_create` / `create_object` / `after_create` protocol, and the
//! creator chain every `create()` is routed through. Of the workspace crates
//! it depends only on `fixturekit-types`.

pub mod builder;
pub mod clock;
pub mod context;
pub mod creator;
pub mod platform;
pub mod registry;
pub mod session;
pub mod testing;

pub use builder::Builder;
pub use context::FixtureContext;
