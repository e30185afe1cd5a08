//! Builder for one package directory and its nested subpackages.
//!
//! A [`SubpackageBuilder`] is a shared handle. Profiles and upgrade steps add
//! files and ZCML nodes to the package tree before it is created, so the
//! tree must be reachable from several builders at once. Children hold a weak
//! link to their parent, which owns them.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use fixturekit_core::builder::run_lifecycle;
use fixturekit_core::{Builder, FixtureContext};
use fixturekit_types::error::BuilderError;

use crate::builders;
use crate::filesystem::{self, FileTree};
use crate::zcml::{Include, ZcmlBuilder};

struct SubpackageState {
    name: Option<String>,
    parent: Option<Weak<Mutex<SubpackageState>>>,
    path: Option<PathBuf>,
    explicit_path: bool,
    configure_zcml: Option<ZcmlBuilder>,
    i18n_domain: Option<String>,
    subpackages: Vec<SubpackageBuilder>,
    files: FileTree,
}

/// Builds a package directory with `__init__.py`, optional `configure.zcml`
/// and nested subpackages.
///
/// The location is either an explicit path ([`at_path`](Self::at_path)) or a
/// name below a parent package ([`named`](Self::named) +
/// [`within`](Self::within)), never both.
#[derive(Clone)]
pub struct SubpackageBuilder {
    inner: Arc<Mutex<SubpackageState>>,
}

impl SubpackageBuilder {
    pub fn new() -> Self {
        let mut files = FileTree::default();
        files.add_file("__init__.py", "", false);
        Self {
            inner: Arc::new(Mutex::new(SubpackageState {
                name: None,
                parent: None,
                path: None,
                explicit_path: false,
                configure_zcml: None,
                i18n_domain: None,
                subpackages: Vec::new(),
                files,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SubpackageState> {
        self.inner.lock().expect("subpackage lock poisoned")
    }

    /// Whether both handles refer to the same subpackage.
    pub fn is_same(&self, other: &SubpackageBuilder) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Last segment of the dotted name, e.g. `browser`.
    pub fn named(self, name: impl Into<String>) -> Self {
        self.state().name = Some(name.into());
        self
    }

    /// Place this subpackage below `parent`.
    pub fn within(self, parent: &SubpackageBuilder) -> Self {
        self.state().parent = Some(Arc::downgrade(&parent.inner));
        self
    }

    /// Place this subpackage at an absolute path.
    pub fn at_path(self, path: impl Into<PathBuf>) -> Self {
        self.set_path(path);
        self
    }

    pub(crate) fn set_path(&self, path: impl Into<PathBuf>) {
        let mut state = self.state();
        state.path = Some(path.into());
        state.explicit_path = true;
    }

    pub fn name(&self) -> Option<String> {
        self.state().name.clone()
    }

    /// The directory, once known.
    pub fn path(&self) -> Option<PathBuf> {
        self.state().path.clone()
    }

    fn parent(&self) -> Option<SubpackageBuilder> {
        self.state()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| SubpackageBuilder { inner })
    }

    /// Nest `child` in this subpackage. It is created together with this one.
    pub fn with_subpackage(self, child: SubpackageBuilder) -> Self {
        self.add_subpackage(child);
        self
    }

    pub(crate) fn add_subpackage(&self, child: SubpackageBuilder) {
        child.state().parent = Some(Arc::downgrade(&self.inner));
        self.state().subpackages.push(child);
    }

    /// The nested subpackage called `name`, created on first request from
    /// the `subpackage` registration of `ctx`.
    pub fn get_subpackage(&self, ctx: &FixtureContext, name: &str) -> Result<SubpackageBuilder, BuilderError> {
        let existing = self
            .state()
            .subpackages
            .iter()
            .find(|child| child.name().as_deref() == Some(name))
            .cloned();
        if let Some(child) = existing {
            return Ok(child);
        }
        let child = builders::resolve(ctx, builders::SUBPACKAGE, || Ok(SubpackageBuilder::new()))?.named(name);
        self.add_subpackage(child.clone());
        Ok(child)
    }

    /// Set the i18n domain of `configure.zcml`. Does not create the file.
    pub fn with_i18n_domain(self, domain: impl Into<String>) -> Self {
        self.state().i18n_domain = Some(domain.into());
        self
    }

    /// Make sure a `configure.zcml` is written.
    pub fn with_zcml_file(self) -> Self {
        self.get_configure_zcml();
        self
    }

    pub fn with_directory(self, relative_path: impl Into<PathBuf>) -> Self {
        self.state().files.add_directory(relative_path);
        self
    }

    pub fn with_file(self, relative_path: impl Into<PathBuf>, contents: impl Into<String>, makedirs: bool) -> Self {
        self.add_file(relative_path, contents, makedirs);
        self
    }

    pub(crate) fn add_file(&self, relative_path: impl Into<PathBuf>, contents: impl Into<String>, makedirs: bool) {
        self.state().files.add_file(relative_path, contents, makedirs);
    }

    pub fn with_zcml_include(self, include: impl Into<Include>) -> Self {
        self.get_configure_zcml().add_include(include, None);
        self
    }

    pub fn with_zcml_node(self, tag: &str, attributes: &[(&str, &str)]) -> Self {
        self.get_configure_zcml().create_node(tag, None, attributes);
        self
    }

    /// The `configure.zcml` builder, created on first request.
    pub fn get_configure_zcml(&self) -> ZcmlBuilder {
        self.state()
            .configure_zcml
            .get_or_insert_with(ZcmlBuilder::new)
            .clone()
    }

    fn resolve_path(&self) -> Result<PathBuf, BuilderError> {
        let (name, explicit_path, path, has_parent) = {
            let state = self.state();
            (
                state.name.clone(),
                state.explicit_path,
                state.path.clone(),
                state.parent.is_some(),
            )
        };

        if explicit_path {
            return path.ok_or_else(|| BuilderError::MissingConfiguration("subpackage path is unset".to_string()));
        }

        let (Some(name), true) = (name, has_parent) else {
            return Err(BuilderError::MissingConfiguration(
                "unknown target: use either at_path() or named() and within()".to_string(),
            ));
        };
        let parent = self.parent().ok_or_else(|| {
            BuilderError::MissingConfiguration(format!("parent of subpackage \"{name}\" no longer exists"))
        })?;
        let parent_path = parent.path().ok_or_else(|| {
            BuilderError::MissingConfiguration(format!("parent of subpackage \"{name}\" has no path yet"))
        })?;
        Ok(parent_path.join(name))
    }
}

impl Default for SubpackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for SubpackageBuilder {
    type Output = PathBuf;

    fn before_create(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
        let state = self.state();
        if state.explicit_path && (state.name.is_some() || state.parent.is_some()) {
            return Err(BuilderError::ConflictingLocation(
                "using at_path() and named() / within() for the same subpackage is not allowed".to_string(),
            ));
        }
        Ok(())
    }

    fn create_object(&mut self, ctx: &FixtureContext) -> Result<PathBuf, BuilderError> {
        let path = self.resolve_path()?;
        filesystem::create_dir_all(&path)?;

        let children = {
            let mut state = self.state();
            state.path = Some(path.clone());
            state.subpackages.clone()
        };
        for child in children {
            ctx.create(child)?;
        }

        let (files, zcml, i18n_domain) = {
            let state = self.state();
            (
                state.files.clone(),
                state.configure_zcml.clone(),
                state.i18n_domain.clone(),
            )
        };
        files.materialize(&path)?;

        if let Some(mut zcml) = zcml {
            if let Some(domain) = i18n_domain {
                zcml.set_i18n_domain(domain);
            }
            zcml.set_path(path.join("configure.zcml"));
            run_lifecycle(&mut zcml, ctx)?;

            if let Some(parent) = self.parent() {
                parent.get_configure_zcml().add_include(&zcml, None);
            }
        }

        tracing::debug!(path = %path.display(), "subpackage created");
        Ok(path)
    }
}
