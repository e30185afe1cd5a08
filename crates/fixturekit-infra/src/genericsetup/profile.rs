//! Builder for GenericSetup profiles inside a package.

use std::path::PathBuf;

use fixturekit_core::{Builder, FixtureContext};
use fixturekit_types::error::BuilderError;
use fixturekit_types::naming::compare_versions;

use super::upgrade::{UpgradeStepBuilder, UpgradeTarget};
use crate::filesystem::{self, FileTree};
use crate::package::subpackage::SubpackageBuilder;
use crate::xml::Element;

/// How the `<version>` of `metadata.xml` is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionPolicy {
    /// The highest destination version of the profile's upgrade steps.
    #[default]
    Auto,
    Explicit(String),
    /// No version element at all.
    Disabled,
}

/// Creates `profiles/<name>` in a package and registers it in ZCML.
#[derive(Clone)]
pub struct ProfileBuilder {
    name: String,
    title: Option<String>,
    version: VersionPolicy,
    dependencies: Vec<String>,
    package: Option<SubpackageBuilder>,
    package_name: Option<String>,
    files: FileTree,
    upgrades: Vec<UpgradeStepBuilder>,
}

impl ProfileBuilder {
    /// A profile named `default`.
    pub fn new() -> Self {
        Self {
            name: "default".to_string(),
            title: None,
            version: VersionPolicy::Auto,
            dependencies: Vec::new(),
            package: None,
            package_name: None,
            files: FileTree::default(),
            upgrades: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Title of the registration; the package name when unset.
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_fs_version(mut self, version: impl Into<String>) -> Self {
        self.version = VersionPolicy::Explicit(version.into());
        self
    }

    /// Write `metadata.xml` without a version, even with upgrade steps.
    pub fn without_fs_version(mut self) -> Self {
        self.version = VersionPolicy::Disabled;
        self
    }

    /// Add dependencies. Ids are prefixed with `profile-` when needed and
    /// kept once, in order of first appearance.
    pub fn with_dependencies<S: AsRef<str>>(mut self, profile_ids: impl IntoIterator<Item = S>) -> Self {
        for profile_id in profile_ids {
            let profile_id = profile_id.as_ref();
            let profile_id = if profile_id.starts_with("profile-") {
                profile_id.to_string()
            } else {
                format!("profile-{profile_id}")
            };
            if !self.dependencies.contains(&profile_id) {
                self.dependencies.push(profile_id);
            }
        }
        self
    }

    pub fn with_directory(mut self, relative_path: impl Into<PathBuf>) -> Self {
        self.files.add_directory(relative_path);
        self
    }

    pub fn with_file(mut self, relative_path: impl Into<PathBuf>, contents: impl Into<String>, makedirs: bool) -> Self {
        self.files.add_file(relative_path, contents, makedirs);
        self
    }

    pub fn with_upgrade(mut self, upgrade: UpgradeStepBuilder) -> Self {
        self.upgrades.push(upgrade);
        self
    }

    /// The package (subpackage builder) the profile lives in.
    pub fn within(mut self, package: &SubpackageBuilder) -> Self {
        self.package = Some(package.clone());
        self
    }

    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// `<package>:<name>`, once the package name is known.
    pub fn profile_id(&self) -> Option<String> {
        self.package_name
            .as_ref()
            .map(|package_name| format!("{package_name}:{}", self.name))
    }

    pub(crate) fn upgrade_target(&self) -> Option<UpgradeTarget> {
        Some(UpgradeTarget {
            package: self.package.clone()?,
            profile_name: self.name.clone(),
            profile_id: self.profile_id()?,
        })
    }

    /// The version written to `metadata.xml`, if any.
    pub fn fs_version(&self) -> Option<String> {
        match &self.version {
            VersionPolicy::Explicit(version) => Some(version.clone()),
            VersionPolicy::Disabled => None,
            VersionPolicy::Auto => self
                .upgrades
                .iter()
                .filter_map(UpgradeStepBuilder::destination_version)
                .max_by(|left, right| compare_versions(left, right))
                .map(str::to_string),
        }
    }

    pub fn metadata_xml(&self) -> String {
        let mut root = Element::new("metadata");
        if let Some(version) = self.fs_version() {
            root.push(Element::new("version").with_text(version));
        }
        if !self.dependencies.is_empty() {
            let mut dependencies = Element::new("dependencies");
            for profile_id in &self.dependencies {
                dependencies.push(Element::new("dependency").with_text(profile_id.clone()));
            }
            root.push(dependencies);
        }
        root.render_document()
    }
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for ProfileBuilder {
    type Output = PathBuf;

    fn before_create(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
        if self.package.is_none() {
            return Err(BuilderError::MissingConfiguration(
                "profile requires a package; register it with PackageBuilder::with_profile() or use within()"
                    .to_string(),
            ));
        }
        if self.package_name.is_none() {
            return Err(BuilderError::MissingConfiguration(
                "profile requires a package name; use with_package_name()".to_string(),
            ));
        }
        Ok(())
    }

    fn create_object(&mut self, ctx: &FixtureContext) -> Result<PathBuf, BuilderError> {
        let (Some(package), Some(package_name)) = (self.package.clone(), self.package_name.clone()) else {
            return Err(BuilderError::MissingConfiguration("profile is not bound to a package".to_string()));
        };
        let package_path = package.path().ok_or_else(|| {
            BuilderError::MissingConfiguration(format!("package of profile \"{}\" has no path yet", self.name))
        })?;

        let relative = PathBuf::from("profiles").join(&self.name);
        let path = package_path.join(&relative);
        filesystem::create_dir_all(&path)?;
        filesystem::write_file(&path.join("metadata.xml"), self.metadata_xml())?;

        let zcml = package.get_configure_zcml();
        zcml.add_include("Products.GenericSetup", None);
        let directory = relative.to_string_lossy().replace('\\', "/");
        zcml.create_node(
            "genericsetup:registerProfile",
            None,
            &[
                ("name", self.name.as_str()),
                ("title", self.title.as_deref().unwrap_or(&package_name)),
                ("directory", directory.as_str()),
                ("provides", "Products.GenericSetup.interfaces.EXTENSION"),
            ],
        );

        for upgrade in self.upgrades.clone() {
            ctx.create(upgrade.for_profile(self))?;
        }

        self.files.materialize(&path)?;
        tracing::debug!(profile = %format!("{package_name}:{}", self.name), path = %path.display(), "profile created");
        Ok(path)
    }
}
