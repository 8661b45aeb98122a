use std::path::PathBuf;

use thiserror::Error;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Error)]
pub enum GameError {
    /// Malformed maze description. Fatal at load time; the session never
    /// starts.
    #[error("invalid maze description: {reason}")]
    InvalidMaze { reason: String },

    /// An external decision source failed to produce a direction. Fatal for
    /// automated sessions; interactive input adapters cannot fail.
    #[error("decision source failed: {reason}")]
    DecisionSource { reason: String },

    /// A saved artifact (policy file, session summary) is absent or corrupt.
    /// Recoverable; callers report it and carry on.
    #[error("resource missing or unreadable at {path}: {reason}")]
    ResourceMissing { path: PathBuf, reason: String },
}

impl GameError {
    pub fn invalid_maze(reason: impl Into<String>) -> Self {
        Self::InvalidMaze {
            reason: reason.into(),
        }
    }

    pub fn decision_source(reason: impl Into<String>) -> Self {
        Self::DecisionSource {
            reason: reason.into(),
        }
    }

    pub fn resource_missing(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ResourceMissing {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ResourceMissing { .. })
    }
}
