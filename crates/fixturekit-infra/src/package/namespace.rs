//! Builder for a single namespace-package level.

use std::path::PathBuf;

use fixturekit_core::{Builder, FixtureContext};
use fixturekit_types::error::BuilderError;

use crate::filesystem;

/// `__init__.py` of a namespace package.
pub const NAMESPACE_INIT_TEMPLATE: &str = "
# See http://peak.telecommunity.com/DevCenter/setuptools#namespace-packages
try:
    __import__('pkg_resources').declare_namespace(__name__)
except ImportError:
    from pkgutil import extend_path
    __path__ = extend_path(__path__, __name__)
";

/// Creates a directory holding a namespace-declaring `__init__.py`.
#[derive(Debug, Clone, Default)]
pub struct NamespacePackageBuilder {
    path: Option<PathBuf>,
}

impl NamespacePackageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl Builder for NamespacePackageBuilder {
    type Output = PathBuf;

    fn before_create(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
        if self.path.is_none() {
            return Err(BuilderError::MissingConfiguration(
                "namespace package requires a path; use at_path()".to_string(),
            ));
        }
        Ok(())
    }

    fn create_object(&mut self, _ctx: &FixtureContext) -> Result<PathBuf, BuilderError> {
        let path = self.path.clone().ok_or_else(|| {
            BuilderError::MissingConfiguration("namespace package requires a path".to_string())
        })?;
        filesystem::create_dir_all(&path)?;
        filesystem::write_file(&path.join("__init__.py"), NAMESPACE_INIT_TEMPLATE)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_namespace_init() {
        let tmp = TempDir::new().unwrap();
        let ctx = FixtureContext::in_memory();
        let path = ctx
            .create(NamespacePackageBuilder::new().at_path(tmp.path().join("the")))
            .unwrap();

        let init = std::fs::read_to_string(path.join("__init__.py")).unwrap();
        assert!(init.contains("declare_namespace(__name__)"));
    }

    #[test]
    fn test_requires_path() {
        let ctx = FixtureContext::in_memory();
        assert!(matches!(
            ctx.create(NamespacePackageBuilder::new()),
            Err(BuilderError::MissingConfiguration(_))
        ));
    }
}
