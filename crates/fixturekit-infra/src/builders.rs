//! Filesystem builders handed out by a [`FixtureContext`].
//!
//! Each filesystem builder has a registry name. A factory registered under
//! that name (see [`register_filesystem_builders`]) decides what a fresh
//! builder looks like; without a registration the plain constructor is used.
//! Overriding a name with `force`, or inside [`BuilderRegistry::scoped`],
//! therefore changes every builder handed out here, including the
//! subpackages packages create for themselves.
//!
//! [`BuilderRegistry::scoped`]: fixturekit_core::registry::BuilderRegistry::scoped

use fixturekit_core::FixtureContext;
use fixturekit_core::registry::BuilderRegistry;
use fixturekit_types::error::BuilderError;

use crate::genericsetup::{ProfileBuilder, UpgradeStepBuilder};
use crate::package::PackageBuilder;
use crate::package::namespace::NamespacePackageBuilder;
use crate::package::subpackage::SubpackageBuilder;
use crate::zcml::ZcmlBuilder;

pub const PYTHON_PACKAGE: &str = "python package";
pub const NAMESPACE_PACKAGE: &str = "namespace package";
pub const SUBPACKAGE: &str = "subpackage";
pub const ZCML: &str = "zcml";
pub const GENERICSETUP_PROFILE: &str = "genericsetup profile";
pub const UPGRADE_STEP: &str = "plone upgrade step";

/// Register the default factories of all filesystem builders.
pub fn register_filesystem_builders(registry: &BuilderRegistry, force: bool) -> Result<(), BuilderError> {
    registry.register_factory(PYTHON_PACKAGE, PackageBuilder::for_context, force)?;
    registry.register_factory(NAMESPACE_PACKAGE, |_: &FixtureContext| Ok(NamespacePackageBuilder::new()), force)?;
    registry.register_factory(SUBPACKAGE, |_: &FixtureContext| Ok(SubpackageBuilder::new()), force)?;
    registry.register_factory(ZCML, |_: &FixtureContext| Ok(ZcmlBuilder::new()), force)?;
    registry.register_factory(GENERICSETUP_PROFILE, |_: &FixtureContext| Ok(ProfileBuilder::new()), force)?;
    registry.register_factory(UPGRADE_STEP, |_: &FixtureContext| Ok(UpgradeStepBuilder::new()), force)?;
    Ok(())
}

/// The builder registered as `name`, or `default()` when nothing is.
///
/// Does not require a session; package builders resolve their parts while
/// being created.
pub(crate) fn resolve<B: 'static>(
    ctx: &FixtureContext,
    name: &str,
    default: impl FnOnce() -> Result<B, BuilderError>,
) -> Result<B, BuilderError> {
    match ctx.registry().factory::<B>(name) {
        Ok(factory) => factory(ctx),
        Err(BuilderError::NotFound(_)) => default(),
        Err(err) => Err(err),
    }
}

pub trait PackageBuilders {
    fn python_package(&self) -> Result<PackageBuilder, BuilderError>;
    fn namespace_package(&self) -> Result<NamespacePackageBuilder, BuilderError>;
    fn subpackage(&self) -> Result<SubpackageBuilder, BuilderError>;
    fn zcml(&self) -> Result<ZcmlBuilder, BuilderError>;
    fn genericsetup_profile(&self) -> Result<ProfileBuilder, BuilderError>;
    fn upgrade_step(&self) -> Result<UpgradeStepBuilder, BuilderError>;
}

impl PackageBuilders for FixtureContext {
    fn python_package(&self) -> Result<PackageBuilder, BuilderError> {
        self.session()?;
        resolve(self, PYTHON_PACKAGE, || PackageBuilder::for_context(self))
    }

    fn namespace_package(&self) -> Result<NamespacePackageBuilder, BuilderError> {
        self.session()?;
        resolve(self, NAMESPACE_PACKAGE, || Ok(NamespacePackageBuilder::new()))
    }

    fn subpackage(&self) -> Result<SubpackageBuilder, BuilderError> {
        self.session()?;
        resolve(self, SUBPACKAGE, || Ok(SubpackageBuilder::new()))
    }

    fn zcml(&self) -> Result<ZcmlBuilder, BuilderError> {
        self.session()?;
        resolve(self, ZCML, || Ok(ZcmlBuilder::new()))
    }

    fn genericsetup_profile(&self) -> Result<ProfileBuilder, BuilderError> {
        self.session()?;
        resolve(self, GENERICSETUP_PROFILE, || Ok(ProfileBuilder::new()))
    }

    fn upgrade_step(&self) -> Result<UpgradeStepBuilder, BuilderError> {
        self.session()?;
        resolve(self, UPGRADE_STEP, || Ok(UpgradeStepBuilder::new()))
    }
}
