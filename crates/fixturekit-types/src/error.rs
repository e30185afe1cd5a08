use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while registering, configuring or creating fixtures.
///
/// Configuration methods never fail; every variant here surfaces from a
/// registry operation or from `create()`.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("builder \"{name}\" is already registered ({existing})")]
    DuplicateRegistration { name: String, existing: String },

    #[error("unknown builder \"{0}\"")]
    NotFound(String),

    #[error("no builder session is active; builders can only be used within a test session")]
    NoSession,

    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("conflicting location: {0}")]
    ConflictingLocation(String),

    #[error("invalid package name \"{0}\": there is already a package or module with the same name")]
    NameCollision(String),

    #[error("cannot change state of \"{type_name}\" object - seems to have no or too many workflows: {chain:?}")]
    WorkflowConfiguration {
        type_name: String,
        chain: Vec<String>,
    },

    #[error("failed to run \"{command}\":\n{stderr}")]
    BuildFailure { command: String, stderr: String },

    #[error("cannot serialize callable: {0}")]
    Serialization(String),

    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("creator chain never delegated to the builder for \"{0}\"")]
    CreationSkipped(String),

    #[error("filesystem error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl BuilderError {
    /// Build a closure that wraps an I/O error with the path it happened at.
    ///
    /// Meant for `map_err`: `fs::write(&path, data).map_err(BuilderError::io_at(&path))?`.
    pub fn io_at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> BuilderError {
        let path = path.into();
        move |source| BuilderError::Io { path, source }
    }
}

/// Errors reported by the host platform collaborator.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("unknown content type: {0}")]
    UnknownType(String),

    #[error("content type \"{portal_type}\" is not allowed in {container}")]
    ConstraintViolation {
        portal_type: String,
        container: String,
    },

    #[error("unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("commit failed: {0}")]
    Commit(String),
}
