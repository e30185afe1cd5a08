//! The distribution-metadata step run at the end of package creation.
//!
//! Either [`EggInfoWriter`] writes the `<name>.egg-info` directory natively,
//! or [`CommandStep`] runs an external command in the package root. A
//! nonzero exit becomes [`BuilderError::BuildFailure`] carrying stderr.

use std::path::{Path, PathBuf};
use std::process::Command;

use fixturekit_types::error::BuilderError;

use crate::filesystem;

/// What the metadata step knows about the package being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionInfo {
    pub name: String,
    pub version: String,
    pub root_path: PathBuf,
    /// Parent namespaces, outermost first.
    pub namespaces: Vec<String>,
}

/// Produces distribution metadata for a freshly written package.
pub trait MetadataStep: Send + Sync {
    fn build(&self, distribution: &DistributionInfo) -> Result<(), BuilderError>;
}

/// Writes `PKG-INFO`, `top_level.txt` and `namespace_packages.txt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EggInfoWriter;

impl EggInfoWriter {
    pub fn egg_info_dir(distribution: &DistributionInfo) -> PathBuf {
        distribution
            .root_path
            .join(format!("{}.egg-info", distribution.name))
    }
}

impl MetadataStep for EggInfoWriter {
    fn build(&self, distribution: &DistributionInfo) -> Result<(), BuilderError> {
        let dir = Self::egg_info_dir(distribution);
        filesystem::create_dir_all(&dir)?;

        let pkg_info = format!(
            "Metadata-Version: 1.0\nName: {}\nVersion: {}\nSummary: UNKNOWN\nPlatform: UNKNOWN\n",
            distribution.name, distribution.version
        );
        filesystem::write_file(&dir.join("PKG-INFO"), pkg_info)?;

        let top_level = distribution
            .name
            .split('.')
            .next()
            .unwrap_or(&distribution.name);
        filesystem::write_file(&dir.join("top_level.txt"), format!("{top_level}\n"))?;

        let mut namespaces = distribution.namespaces.join("\n");
        if !namespaces.is_empty() {
            namespaces.push('\n');
        }
        filesystem::write_file(&dir.join("namespace_packages.txt"), namespaces)?;
        filesystem::write_file(&dir.join("not-zip-safe"), "\n")?;

        tracing::debug!(path = %dir.display(), "egg-info written");
        Ok(())
    }
}

/// Runs an external command (argv) in the package root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    argv: Vec<String>,
}

impl CommandStep {
    pub fn new(argv: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    fn run_in(&self, dir: &Path) -> Result<(), BuilderError> {
        let command_line = self.argv.join(" ");
        let (program, args) = self.argv.split_first().ok_or_else(|| {
            BuilderError::MissingConfiguration("metadata command is empty".to_string())
        })?;

        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|err| BuilderError::BuildFailure {
                command: command_line.clone(),
                stderr: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(BuilderError::BuildFailure {
                command: command_line,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        tracing::debug!(command = %command_line, "metadata command finished");
        Ok(())
    }
}

impl MetadataStep for CommandStep {
    fn build(&self, distribution: &DistributionInfo) -> Result<(), BuilderError> {
        self.run_in(&distribution.root_path)
    }
}
