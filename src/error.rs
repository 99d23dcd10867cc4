use crate::model::{EntityKind, Id};
use thiserror::Error;

/// Errors surfaced by catalog mutations.
///
/// Unresolvable references are deliberately absent: the resolver leaves
/// placeholders in place and dereferencing a dangler reports "missing"
/// instead of failing.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Required field missing, uniqueness violated, or pairing broken.
    /// The graph is left unchanged.
    #[error("validation failed for {kind} `{name}`: {reason}")]
    Validation {
        kind: EntityKind,
        name: String,
        reason: String,
    },

    #[error("{kind} `{id}` not found")]
    NotFound { kind: EntityKind, id: Id },

    /// A registered listener refused an event. For pre-commit modify events
    /// this aborts the save; after commit the mutation stands regardless.
    #[error("listener rejected {event} event")]
    Listener {
        event: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl CatalogError {
    pub fn validation(kind: EntityKind, name: impl Into<String>, reason: impl Into<String>) -> Self {
        CatalogError::Validation {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<Id>) -> Self {
        CatalogError::NotFound {
            kind,
            id: id.into(),
        }
    }
}
