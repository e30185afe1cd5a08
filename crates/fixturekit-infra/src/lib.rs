//! Filesystem builders for fixturekit.
//!
//! Everything that writes to disk lives here: Python distribution packages
//! with their namespace chain and subpackages, GenericSetup profiles and
//! upgrade steps, and the ZCML configuration files tying them together. The
//! builders implement [`fixturekit_core::Builder`] and are created through a
//! [`fixturekit_core::FixtureContext`] like any content builder; the
//! [`builders::PackageBuilders`] extension trait hands them out bound to the
//! current session. Also home of the `fixturekit.toml` loader.

pub mod builders;
pub mod config;
pub mod environment;
pub mod filesystem;
pub mod genericsetup;
pub mod metadata;
pub mod package;
pub mod xml;
pub mod zcml;
