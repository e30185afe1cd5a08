//! Shared domain types for fixturekit.
//!
//! This crate contains the types used across the fixture builders: the error
//! taxonomy, content references and argument bags, session configuration, and
//! the naming/version helpers shared by the package builders.
//!
//! No infrastructure dependencies: only serde, serde_json, chrono and thiserror.

pub mod config;
pub mod content;
pub mod error;
pub mod naming;
