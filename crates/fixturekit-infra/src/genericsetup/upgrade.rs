//! Builder for GenericSetup upgrade steps.
//!
//! An upgrade step does not write anything itself. It queues its handler
//! module and the `genericsetup:upgradeStep` registration on the `upgrades`
//! subpackage of the profile's package, which is written when the package
//! is created.

use std::path::PathBuf;

use fixturekit_core::{Builder, FixtureContext};
use fixturekit_types::error::BuilderError;

use super::callable::{CallableSource, serialize_callable};
use super::profile::ProfileBuilder;
use crate::package::subpackage::SubpackageBuilder;

/// Where an upgrade step registers itself.
#[derive(Clone)]
pub struct UpgradeTarget {
    pub package: SubpackageBuilder,
    pub profile_name: String,
    /// `<package>:<profile>`.
    pub profile_id: String,
}

/// An upgrade step as registered in ZCML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUpgrade {
    pub profile_id: String,
    pub source: String,
    pub destination: String,
    /// Handler relative to the upgrades package, e.g. `.to1001.noop_upgrade`.
    pub handler: String,
    /// Module path relative to the package directory.
    pub module_path: PathBuf,
}

#[derive(Clone)]
pub struct UpgradeStepBuilder {
    source_version: Option<String>,
    destination_version: Option<String>,
    title: Option<String>,
    description: Option<String>,
    code: String,
    handler_name: String,
    target: Option<UpgradeTarget>,
}

impl UpgradeStepBuilder {
    /// A step running the no-op upgrade handler.
    pub fn new() -> Self {
        let noop = CallableSource::noop_upgrade();
        Self {
            source_version: None,
            destination_version: None,
            title: None,
            description: None,
            code: serialize_callable(&noop, &[]),
            handler_name: noop.name().to_string(),
            target: None,
        }
    }

    pub fn upgrading(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.source_version = Some(from.into());
        self.destination_version = Some(to.into());
        self
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Use `code` as the module source; `handler_name` is the callable in it
    /// registered as handler.
    pub fn with_code(mut self, code: impl Into<String>, handler_name: impl Into<String>) -> Self {
        self.code = code.into();
        self.handler_name = handler_name.into();
        self
    }

    /// Run `callable`. Base classes are imported automatically; other
    /// globals must be listed in `to_import` as dotted names.
    pub fn calling(self, callable: &CallableSource, to_import: &[&str]) -> Self {
        let code = serialize_callable(callable, to_import);
        self.with_code(code, callable.name())
    }

    /// Register for `profile`, which must know its package by now.
    pub fn for_profile(mut self, profile: &ProfileBuilder) -> Self {
        self.target = profile.upgrade_target();
        self
    }

    pub fn source_version(&self) -> Option<&str> {
        self.source_version.as_deref()
    }

    pub fn destination_version(&self) -> Option<&str> {
        self.destination_version.as_deref()
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl Default for UpgradeStepBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for UpgradeStepBuilder {
    type Output = RegisteredUpgrade;

    fn before_create(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
        let is_unset = |version: &Option<String>| version.as_deref().is_none_or(str::is_empty);
        if is_unset(&self.source_version) || is_unset(&self.destination_version) {
            return Err(BuilderError::MissingConfiguration(
                "source and destination versions are required; use upgrading(from, to)".to_string(),
            ));
        }
        if self.target.is_none() {
            return Err(BuilderError::MissingConfiguration(
                "unknown profile for the upgrade step; use ProfileBuilder::with_upgrade()".to_string(),
            ));
        }
        Ok(())
    }

    fn create_object(&mut self, ctx: &FixtureContext) -> Result<RegisteredUpgrade, BuilderError> {
        let (Some(source), Some(destination), Some(target)) = (
            self.source_version.clone(),
            self.destination_version.clone(),
            self.target.clone(),
        ) else {
            return Err(BuilderError::MissingConfiguration(
                "upgrade step is not fully configured".to_string(),
            ));
        };

        let basename = format!("to{}", destination.replace('.', "_"));
        let mut module_path = PathBuf::from("upgrades");
        let mut package = target.package.get_subpackage(ctx, "upgrades")?;
        if target.profile_name != "default" {
            package = package.get_subpackage(ctx, &target.profile_name)?;
            module_path.push(&target.profile_name);
        }
        module_path.push(format!("{basename}.py"));

        let handler = format!(".{basename}.{}", self.handler_name);
        package.add_file(format!("{basename}.py"), self.code.clone(), false);
        package.get_configure_zcml().create_node(
            "genericsetup:upgradeStep",
            None,
            &[
                ("title", self.title.as_deref().unwrap_or_default()),
                ("description", self.description.as_deref().unwrap_or_default()),
                ("source", source.as_str()),
                ("destination", destination.as_str()),
                ("handler", handler.as_str()),
                ("profile", target.profile_id.as_str()),
            ],
        );

        tracing::debug!(profile = %target.profile_id, %source, %destination, "upgrade step registered");
        Ok(RegisteredUpgrade {
            profile_id: target.profile_id,
            source,
            destination,
            handler,
            module_path,
        })
    }
}
