//! Logging setup for fixturekit.
//!
//! The library crates only emit `tracing` events; this crate installs the
//! subscriber that prints them.

pub mod tracing_setup;
