//! Identities for DAGFLOW entities.
//!
//! Stages are identified by a discriminated [`StageId`] so that the two
//! terminal stages can never be confused with a caller-chosen label.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage identifier - one of the two terminals or a caller label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Entry stage, receives the external argument
    Entry,
    /// Exit stage, aggregates the final result
    Exit,
    /// Ordinary stage declared by the caller
    Named(String),
}

impl StageId {
    /// Create an ordinary stage identifier
    #[must_use]
    pub fn named(label: impl Into<String>) -> Self {
        Self::Named(label.into())
    }

    /// Whether this is the entry or the exit stage
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Entry | Self::Exit)
    }

    /// Label of an ordinary stage
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Named(label) => Some(label),
            Self::Entry | Self::Exit => None,
        }
    }

    /// Whether this is the ordinary stage with the given label
    #[must_use]
    pub fn is_named(&self, label: &str) -> bool {
        self.label() == Some(label)
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "<input>"),
            Self::Exit => write!(f, "<final>"),
            Self::Named(label) => write!(f, "{}", label),
        }
    }
}

impl From<&str> for StageId {
    fn from(label: &str) -> Self {
        Self::Named(label.to_string())
    }
}

impl From<String> for StageId {
    fn from(label: String) -> Self {
        Self::Named(label)
    }
}

impl From<&StageId> for StageId {
    fn from(id: &StageId) -> Self {
        id.clone()
    }
}

/// Network identifier - identifies one live flow network instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkId(Uuid);

impl NetworkId {
    /// Create a new random NetworkId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NetworkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "net_{}", self.0)
    }
}
