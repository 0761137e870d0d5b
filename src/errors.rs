//! Typed error hierarchy for the taskboard engine.
//!
//! Two top-level enums cover the two fallible layers:
//! - `StoreError`: persistence gateway and lifecycle operations
//! - `DragError`: drag-end events that cannot be resolved against the board

use thiserror::Error;

use crate::board::gateway::RecordKind;

/// Errors from the persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: String },

    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: RecordKind, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Store is closed")]
    Closed,

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised while turning a drag-end event into an update plan.
///
/// All of these are detected before any write is issued.
#[derive(Debug, Error)]
pub enum DragError {
    #[error("A drag is already in progress ({phase})")]
    Busy { phase: &'static str },

    #[error("No drag in progress")]
    NotDragging,

    #[error("Dragged item {id} is not on this board")]
    UnknownItem { id: String },

    #[error("Drop container {id} is not on this board")]
    UnknownContainer { id: String },

    #[error("Index {index} is out of range for a container of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid drop target: {0}")]
    InvalidTarget(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_not_found_is_matchable() {
        let err = StoreError::not_found(RecordKind::Card, "c-1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "card c-1 not found");
    }

    #[test]
    fn store_error_validation_carries_message() {
        let err = StoreError::validation("title must not be empty");
        match &err {
            StoreError::Validation(msg) => assert_eq!(msg, "title must not be empty"),
            _ => panic!("Expected Validation"),
        }
        assert!(!err.is_not_found());
    }

    #[test]
    fn drag_error_converts_from_store_error() {
        let err: DragError = StoreError::Closed.into();
        match &err {
            DragError::Store(StoreError::Closed) => {}
            _ => panic!("Expected DragError::Store(Closed)"),
        }
        assert_eq!(err.to_string(), "Store is closed");
    }

    #[test]
    fn drag_error_index_out_of_range_display() {
        let err = DragError::IndexOutOfRange { index: 7, len: 3 };
        assert!(err.to_string().contains("7"));
        assert!(err.to_string().contains("3"));
    }
}
