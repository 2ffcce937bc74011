use std::path::PathBuf;

use thiserror::Error;

/// The document set could not produce a compendium at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no bestiary document found in {}", dir.display())]
    NoBestiary { dir: PathBuf },
    #[error("failed to read document {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document {} is not valid UTF-8", path.display())]
    InvalidEncoding { path: PathBuf },
    #[error("no monster heading found in section '{section}'")]
    NoMonsterHeadings { section: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} not found", path.display())]
    NotFound { path: PathBuf },
    #[error("{} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("refusing to overwrite corrupt file {} (use force to move it aside)", path.display())]
    WouldOverwriteCorrupt { path: PathBuf },
    #[error("no entry named '{0}'")]
    MissingKey(String),
    #[error("invalid value '{value}' for setting '{key}'")]
    InvalidSetting { key: String, value: String },
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Corrupt files are handled like missing ones by every caller.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. } | StoreError::Corrupt { .. } | StoreError::MissingKey(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown monster definition '{name}'")]
pub struct UnknownDefinition {
    pub name: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    UnknownDefinition(#[from] UnknownDefinition),
    #[error("no participant named '{0}'")]
    UnknownEntity(String),
    #[error("a participant named '{0}' already exists")]
    DuplicateEntity(String),
    #[error("'{0}' has no phase named '{1}'")]
    UnknownPhase(String, String),
    #[error("'{0}' cannot attack itself")]
    SameParticipant(String),
}
