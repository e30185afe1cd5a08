//! Python distribution packages.
//!
//! [`PackageBuilder`] writes a complete distribution: `setup.py`, one
//! namespace package per parent of the dotted name, the main package with its
//! subpackages, profiles and `configure.zcml`, and finally the distribution
//! metadata. The result is a [`Package`] that can be activated in an
//! [`ImportEnvironment`] for as long as a guard lives.

pub mod namespace;
pub mod subpackage;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fixturekit_core::session::BuilderSession;
use fixturekit_core::{Builder, FixtureContext};
use fixturekit_types::error::BuilderError;
use fixturekit_types::naming::parent_namespaces;

use self::namespace::NamespacePackageBuilder;
use self::subpackage::SubpackageBuilder;
use crate::builders;
use crate::environment::{ImportEnvironment, SearchPathEnvironment};
use crate::filesystem::{self, FileTree};
use crate::genericsetup::ProfileBuilder;
use crate::metadata::{CommandStep, DistributionInfo, EggInfoWriter, MetadataStep};
use crate::zcml::{Include, ZcmlBuilder};

const SETUP_PY_TEMPLATE: &str = "
from setuptools import setup, find_packages

setup(name='{name}',
      version='{version}',
      packages=find_packages(exclude=['ez_setup']),
      namespace_packages={namespaces},
      include_package_data=True,
      zip_safe=False,

      install_requires=[
        'setuptools',
      ])
";

fn render_setup_py(name: &str, version: &str, namespaces: &[String]) -> String {
    let namespaces = namespaces
        .iter()
        .map(|namespace| format!("'{namespace}'"))
        .collect::<Vec<_>>()
        .join(", ");
    SETUP_PY_TEMPLATE
        .replace("{name}", name)
        .replace("{version}", version)
        .replace("{namespaces}", &format!("[{namespaces}]"))
}

/// Builds a complete Python distribution below a root directory.
pub struct PackageBuilder {
    session: Arc<BuilderSession>,
    path: Option<PathBuf>,
    name: Option<String>,
    version: String,
    package: SubpackageBuilder,
    root_files: FileTree,
    profiles: Vec<ProfileBuilder>,
    environment: Arc<dyn ImportEnvironment>,
    metadata_step: Option<Arc<dyn MetadataStep>>,
}

impl PackageBuilder {
    pub fn new(session: Arc<BuilderSession>) -> Self {
        let version = session.package_version().to_string();
        Self {
            session,
            path: None,
            name: None,
            version,
            package: SubpackageBuilder::new(),
            root_files: FileTree::default(),
            profiles: Vec::new(),
            environment: SearchPathEnvironment::global(),
            metadata_step: None,
        }
    }

    /// A builder whose main package comes from the `subpackage`
    /// registration of `ctx`.
    pub fn for_context(ctx: &FixtureContext) -> Result<Self, BuilderError> {
        let mut builder = Self::new(ctx.session()?);
        builder.package = builders::resolve(ctx, builders::SUBPACKAGE, || Ok(SubpackageBuilder::new()))?;
        Ok(builder)
    }

    /// Root directory of the distribution; `setup.py` is written directly
    /// into it.
    pub fn at_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Dotted name of the package. Also the i18n domain of its ZCML.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.package = self.package.with_i18n_domain(name.clone());
        self.name = Some(name);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Nest a named subpackage in the main package.
    pub fn with_subpackage(self, subpackage: SubpackageBuilder) -> Self {
        self.package.add_subpackage(subpackage);
        self
    }

    /// Create `profile` together with the package.
    pub fn with_profile(mut self, profile: ProfileBuilder) -> Self {
        self.profiles.push(profile);
        self
    }

    /// A directory relative to the root directory.
    pub fn with_root_directory(mut self, relative_path: impl Into<PathBuf>) -> Self {
        self.root_files.add_directory(relative_path);
        self
    }

    /// A file relative to the root directory.
    pub fn with_root_file(mut self, relative_path: impl Into<PathBuf>, contents: impl Into<String>, makedirs: bool) -> Self {
        self.root_files.add_file(relative_path, contents, makedirs);
        self
    }

    /// A directory relative to the main package directory.
    pub fn with_directory(mut self, relative_path: impl Into<PathBuf>) -> Self {
        self.package = self.package.with_directory(relative_path);
        self
    }

    /// A file relative to the main package directory.
    pub fn with_file(mut self, relative_path: impl Into<PathBuf>, contents: impl Into<String>, makedirs: bool) -> Self {
        self.package = self.package.with_file(relative_path, contents, makedirs);
        self
    }

    pub fn with_zcml_file(mut self) -> Self {
        self.package = self.package.with_zcml_file();
        self
    }

    pub fn with_zcml_include(mut self, include: impl Into<Include>) -> Self {
        self.package = self.package.with_zcml_include(include);
        self
    }

    pub fn with_zcml_node(mut self, tag: &str, attributes: &[(&str, &str)]) -> Self {
        self.package = self.package.with_zcml_node(tag, attributes);
        self
    }

    /// The `configure.zcml` builder of the main package.
    pub fn get_configure_zcml(&self) -> ZcmlBuilder {
        self.package.get_configure_zcml()
    }

    /// Check names and activate in `environment` instead of the global one.
    pub fn with_environment(mut self, environment: Arc<dyn ImportEnvironment>) -> Self {
        self.environment = environment;
        self
    }

    /// Produce distribution metadata with `step`. Without one, the session's
    /// metadata command runs if configured, else egg-info is written natively.
    pub fn with_metadata_step(mut self, step: Arc<dyn MetadataStep>) -> Self {
        self.metadata_step = Some(step);
        self
    }

    /// The main package.
    pub fn package(&self) -> &SubpackageBuilder {
        &self.package
    }

    fn metadata_step(&self) -> Arc<dyn MetadataStep> {
        if let Some(step) = &self.metadata_step {
            return Arc::clone(step);
        }
        match self.session.metadata_command() {
            Some(argv) => Arc::new(CommandStep::new(argv.iter().cloned())),
            None => Arc::new(EggInfoWriter),
        }
    }
}

impl Builder for PackageBuilder {
    type Output = Package;

    fn before_create(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
        if self.path.is_none() {
            return Err(BuilderError::MissingConfiguration(
                "use at_path(path) to set a path to create the package in".to_string(),
            ));
        }
        let Some(name) = &self.name else {
            return Err(BuilderError::MissingConfiguration(
                "use named(name) to set the dotted name of the package".to_string(),
            ));
        };
        if self.environment.find_module(name) {
            return Err(BuilderError::NameCollision(name.clone()));
        }
        let mut profile_names = BTreeSet::new();
        for profile in &self.profiles {
            if !profile_names.insert(profile.name()) {
                return Err(BuilderError::NameCollision(format!("{name}:{}", profile.name())));
            }
        }
        Ok(())
    }

    fn create_object(&mut self, ctx: &FixtureContext) -> Result<Package, BuilderError> {
        let (Some(root), Some(name)) = (self.path.clone(), self.name.clone()) else {
            return Err(BuilderError::MissingConfiguration("package path and name are required".to_string()));
        };
        filesystem::create_dir_all(&root)?;

        let mut package_path = root.clone();
        package_path.extend(name.split('.'));
        self.package.set_path(&package_path);

        let namespaces = parent_namespaces(&name);
        for dottedname in &namespaces {
            let mut path = root.clone();
            path.extend(dottedname.split('.'));
            let namespace = builders::resolve(ctx, builders::NAMESPACE_PACKAGE, || Ok(NamespacePackageBuilder::new()))?;
            ctx.create(namespace.at_path(path))?;
        }
        filesystem::write_file(
            &root.join("setup.py"),
            render_setup_py(&name, &self.version, &namespaces),
        )?;

        let mut profiles = BTreeMap::new();
        for profile in &self.profiles {
            let profile = profile.clone().with_package_name(name.clone()).within(&self.package);
            let profile_name = profile.name().to_string();
            profiles.insert(profile_name, ctx.create(profile)?);
        }

        let package_path = ctx.create(self.package.clone())?;
        self.root_files.materialize(&root)?;

        self.metadata_step().build(&DistributionInfo {
            name: name.clone(),
            version: self.version.clone(),
            root_path: root.clone(),
            namespaces,
        })?;

        tracing::info!(package = %name, path = %root.display(), "python package created");
        Ok(Package {
            name,
            root_path: root,
            package_path,
            profiles,
            environment: Arc::clone(&self.environment),
        })
    }
}

/// A package written by [`PackageBuilder`].
pub struct Package {
    pub name: String,
    pub root_path: PathBuf,
    pub package_path: PathBuf,
    /// Profile name to profile directory.
    pub profiles: BTreeMap<String, PathBuf>,
    environment: Arc<dyn ImportEnvironment>,
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.name)
            .field("root_path", &self.root_path)
            .field("package_path", &self.package_path)
            .field("profiles", &self.profiles)
            .finish_non_exhaustive()
    }
}

impl Package {
    /// Make the package resolvable until the returned guard is dropped.
    pub fn activate(&self) -> ActivePackage<'_> {
        let saved_working_set = self.environment.working_set();
        self.environment.insert_root(&self.root_path);
        self.environment.refresh_working_set();
        tracing::debug!(package = %self.name, "package activated");
        ActivePackage {
            package: self,
            saved_working_set: Some(saved_working_set),
        }
    }

    /// Path of the main package's `configure.zcml`.
    pub fn configure_zcml(&self) -> PathBuf {
        self.package_path.join("configure.zcml")
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

/// Keeps a [`Package`] on the search path.
///
/// On drop the working set saved at activation is restored, the root is
/// removed again and every cached module of the package or of its parent
/// namespaces is purged.
#[must_use = "the package is deactivated when the guard is dropped"]
pub struct ActivePackage<'a> {
    package: &'a Package,
    saved_working_set: Option<Vec<String>>,
}

impl ActivePackage<'_> {
    pub fn is_importable(&self) -> bool {
        self.package.environment.find_module(&self.package.name)
    }
}

impl Drop for ActivePackage<'_> {
    fn drop(&mut self) {
        let package = self.package;
        if let Some(saved) = self.saved_working_set.take() {
            package.environment.restore_working_set(saved);
        }
        package.environment.remove_root(&package.root_path);

        let prefix = format!("{}.", package.name);
        let namespaces = parent_namespaces(&package.name);
        let purged = package.environment.purge_modules(&|module: &str| {
            module == package.name || module.starts_with(&prefix) || namespaces.iter().any(|ns| ns == module)
        });
        tracing::debug!(package = %package.name, purged = purged.len(), "package deactivated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genericsetup::UpgradeStepBuilder;
    use fixturekit_core::testing::{FixtureTest, TempDirectoryLayer};

    fn isolated_environment() -> Arc<SearchPathEnvironment> {
        Arc::new(SearchPathEnvironment::new())
    }

    fn package_builder(test: &FixtureTest<'_, TempDirectoryLayer>) -> PackageBuilder {
        PackageBuilder::new(test.session().unwrap())
            .at_path(test.temp_directory())
            .with_environment(isolated_environment())
    }

    #[test]
    fn test_package_structure() {
        let ctx = FixtureContext::in_memory();
        let test = FixtureTest::with_temp_directory(&ctx).unwrap();
        let root = test.temp_directory().to_path_buf();

        let package = ctx
            .create(package_builder(&test).named("the.package").with_file("resources/style.css", "", true))
            .unwrap();

        assert_eq!(package.name, "the.package");
        assert_eq!(package.root_path, root);
        assert_eq!(package.package_path, root.join("the/package"));
        assert!(root.join("the/__init__.py").is_file());
        assert!(root.join("the/package/__init__.py").is_file());
        assert!(root.join("the/package/resources/style.css").is_file());
        assert!(root.join("the.package.egg-info/PKG-INFO").is_file());
        assert!(
            std::fs::read_to_string(root.join("the/__init__.py"))
                .unwrap()
                .contains("declare_namespace(__name__)")
        );
    }

    #[test]
    fn test_setup_py() {
        let ctx = FixtureContext::in_memory();
        let test = FixtureTest::with_temp_directory(&ctx).unwrap();

        let package = ctx
            .create(package_builder(&test).named("the.package").with_version("2.5"))
            .unwrap();

        let setup_py = std::fs::read_to_string(package.root_path.join("setup.py")).unwrap();
        assert!(setup_py.contains("setup(name='the.package',"));
        assert!(setup_py.contains("version='2.5',"));
        assert!(setup_py.contains("namespace_packages=['the'],"));
        assert_eq!(
            render_setup_py("single", "1.0", &[]).lines().find(|l| l.contains("namespace_packages")),
            Some("      namespace_packages=[],")
        );
    }

    #[test]
    fn test_missing_configuration() {
        let ctx = FixtureContext::in_memory();
        let test = FixtureTest::with_temp_directory(&ctx).unwrap();

        let err = ctx.create(package_builder(&test)).unwrap_err();
        assert!(matches!(err, BuilderError::MissingConfiguration(ref m) if m.contains("named")));

        let err = ctx
            .create(PackageBuilder::new(test.session().unwrap()).named("the.package"))
            .unwrap_err();
        assert!(matches!(err, BuilderError::MissingConfiguration(ref m) if m.contains("at_path")));
    }

    #[test]
    fn test_name_collision() {
        let ctx = FixtureContext::in_memory();
        let test = FixtureTest::with_temp_directory(&ctx).unwrap();
        let environment = isolated_environment();
        environment.mark_loaded("the.package");

        let err = ctx
            .create(package_builder(&test).named("the.package").with_environment(environment))
            .unwrap_err();
        assert!(matches!(err, BuilderError::NameCollision(ref name) if name == "the.package"));
        assert!(!test.temp_directory().join("setup.py").exists());
    }

    #[test]
    fn test_activate_and_deactivate() {
        let ctx = FixtureContext::in_memory();
        let test = FixtureTest::with_temp_directory(&ctx).unwrap();
        let environment = isolated_environment();

        let package = ctx
            .create(
                package_builder(&test)
                    .named("the.package")
                    .with_environment(environment.clone()),
            )
            .unwrap();

        {
            let active = package.activate();
            assert!(active.is_importable());
            assert_eq!(environment.roots(), vec![package.root_path.clone()]);
            for module in ["the", "the.package", "the.package.sub", "theother"] {
                environment.mark_loaded(module);
            }
        }

        assert!(environment.roots().is_empty());
        assert_eq!(environment.loaded_modules(), vec!["theother"]);
        assert_eq!(environment.refreshes(), 1);
    }

    #[test]
    fn test_deactivation_restores_working_set() {
        let ctx = FixtureContext::in_memory();
        let test = FixtureTest::with_temp_directory(&ctx).unwrap();
        let environment = isolated_environment();

        let package = ctx
            .create(
                package_builder(&test)
                    .named("the.package")
                    .with_environment(environment.clone()),
            )
            .unwrap();
        assert!(environment.working_set().is_empty());

        {
            let _active = package.activate();
            assert_eq!(environment.working_set(), vec!["the.package"]);
        }

        assert!(!environment.working_set().contains(&"the.package".to_string()));
        assert!(environment.working_set().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_metadata_command() {
        let ctx = FixtureContext::in_memory();
        let test = FixtureTest::with_temp_directory(&ctx).unwrap();

        let err = ctx
            .create(
                package_builder(&test)
                    .named("the.package")
                    .with_metadata_step(Arc::new(CommandStep::new(["sh", "-c", "echo broken setup >&2; exit 3"]))),
            )
            .unwrap_err();
        match err {
            BuilderError::BuildFailure { stderr, .. } => assert!(stderr.contains("broken setup")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_profile_with_upgrades() {
        let ctx = FixtureContext::in_memory();
        let test = FixtureTest::with_temp_directory(&ctx).unwrap();

        let package = ctx
            .create(
                package_builder(&test)
                    .named("acme.widgets")
                    .with_profile(
                        ProfileBuilder::new()
                            .with_upgrade(UpgradeStepBuilder::new().upgrading("1000", "1001"))
                            .with_upgrade(UpgradeStepBuilder::new().upgrading("1001", "1002"))
                            .with_upgrade(UpgradeStepBuilder::new().upgrading("1002", "1003")),
                    )
                    .with_profile(
                        ProfileBuilder::new()
                            .named("foo")
                            .with_upgrade(UpgradeStepBuilder::new().upgrading("2002", "3000")),
                    ),
            )
            .unwrap();

        let default_profile = &package.profiles["default"];
        assert_eq!(default_profile, &package.package_path.join("profiles/default"));
        assert!(
            std::fs::read_to_string(default_profile.join("metadata.xml"))
                .unwrap()
                .contains("<version>1003</version>")
        );

        let upgrades = package.package_path.join("upgrades");
        for version in ["1001", "1002", "1003"] {
            assert!(upgrades.join(format!("to{version}.py")).is_file());
        }
        assert!(upgrades.join("__init__.py").is_file());
        assert!(upgrades.join("foo/to3000.py").is_file());

        let configure = std::fs::read_to_string(package.configure_zcml()).unwrap();
        assert!(configure.contains("i18n_domain=\"acme.widgets\""));
        assert!(configure.contains("<include package=\"Products.GenericSetup\"/>"));
        assert!(configure.contains("<include package=\".upgrades\"/>"));

        let upgrades_zcml = std::fs::read_to_string(upgrades.join("configure.zcml")).unwrap();
        assert!(upgrades_zcml.contains("handler=\".to1003.noop_upgrade\""));
        assert!(upgrades_zcml.contains("profile=\"acme.widgets:default\""));
        assert!(upgrades_zcml.contains("<include package=\".foo\"/>"));
    }

    #[test]
    fn test_default_profile_gets_exactly_its_upgrade_files() {
        let ctx = FixtureContext::in_memory();
        let test = FixtureTest::with_temp_directory(&ctx).unwrap();

        let package = ctx
            .create(
                package_builder(&test).named("acme.widgets").with_profile(
                    ProfileBuilder::new()
                        .with_upgrade(UpgradeStepBuilder::new().upgrading("1000", "1001"))
                        .with_upgrade(UpgradeStepBuilder::new().upgrading("1001", "1002"))
                        .with_upgrade(UpgradeStepBuilder::new().upgrading("1002", "1003")),
                ),
            )
            .unwrap();

        let mut upgrade_files: Vec<String> = std::fs::read_dir(package.package_path.join("upgrades"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("to") && name.ends_with(".py"))
            .collect();
        upgrade_files.sort();
        assert_eq!(upgrade_files, vec!["to1001.py", "to1002.py", "to1003.py"]);
        assert_eq!(upgrade_files.len(), 3);
    }

    #[test]
    fn test_duplicate_profile_names_collide() {
        let ctx = FixtureContext::in_memory();
        let test = FixtureTest::with_temp_directory(&ctx).unwrap();

        let err = ctx
            .create(
                package_builder(&test)
                    .named("the.package")
                    .with_profile(ProfileBuilder::new().titled("first"))
                    .with_profile(ProfileBuilder::new().titled("second")),
            )
            .unwrap_err();
        assert!(matches!(err, BuilderError::NameCollision(ref id) if id == "the.package:default"));
        assert!(!test.temp_directory().join("setup.py").exists());
    }
}
