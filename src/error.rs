//! Error types shared by the model builder and the target emitters.
//!
//! Node parsing distinguishes two severities: a [`NodeError::Warning`] drops
//! the offending node and parsing carries on, while a [`NodeError::Fatal`]
//! aborts the whole run.

use std::path::PathBuf;

/// A path that could not be resolved to an existing file or directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not resolve path: {}", path.display())]
pub struct PathResolutionError {
    pub path: PathBuf,
}

/// Fatal error classes. Any of these ends the run with a non-zero status.
#[derive(Debug, thiserror::Error)]
pub enum ProjgenError {
    #[error("malformed XML in {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("included file does not exist: {}", .0.display())]
    MissingInclude(PathBuf),

    #[error("include cycle detected at {}", .0.display())]
    IncludeCycle(PathBuf),

    #[error("unknown target: '{0}'")]
    UnknownTarget(String),

    #[error("unknown language '{language}' in project '{project}'")]
    UnknownLanguage { project: String, language: String },

    #[error(transparent)]
    Path(#[from] PathResolutionError),

    #[error("{0}")]
    Fatal(String),
}

impl ProjgenError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Outcome of parsing a single node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The node is unusable but the run can continue without it.
    #[error("{0}")]
    Warning(String),
    #[error(transparent)]
    Fatal(#[from] ProjgenError),
}

impl NodeError {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(ProjgenError::Fatal(message.into()))
    }
}

impl From<PathResolutionError> for NodeError {
    fn from(error: PathResolutionError) -> Self {
        Self::Fatal(error.into())
    }
}

pub type NodeResult<T> = Result<T, NodeError>;

pub type Result<T, E = ProjgenError> = std::result::Result<T, E>;

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
