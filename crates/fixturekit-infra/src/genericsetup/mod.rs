//! GenericSetup profiles and upgrade steps.

pub mod callable;
pub mod profile;
pub mod upgrade;

pub use callable::{CallableKind, CallableSource, serialize_callable};
pub use profile::{ProfileBuilder, VersionPolicy};
pub use upgrade::{RegisteredUpgrade, UpgradeStepBuilder};
