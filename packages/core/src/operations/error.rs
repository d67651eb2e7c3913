//! Error types for the tree operations
//!
//! Every operation is all-or-nothing: whichever of these errors is returned,
//! the enclosing transaction has already been rolled back and storage is left
//! exactly as it was before the call.

use crate::db::DatabaseError;
use crate::models::MappingError;
use libsql::Value;
use thiserror::Error;

/// Errors that can occur during create, delete, move or rebuild
///
/// # Examples
///
/// ```rust
/// use nestedset_core::operations::NestedSetError;
///
/// let err = NestedSetError::invalid_move("target lies inside the source subtree");
/// assert!(err.to_string().contains("inside the source subtree"));
/// ```
#[derive(Error, Debug)]
pub enum NestedSetError {
    /// The record type's role declaration or field values are unusable
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// The requested move is structurally impossible
    ///
    /// Raised when the target is the source itself, lies in the source's
    /// subtree, belongs to another scope, or either row does not exist.
    #[error("Invalid move: {reason}")]
    InvalidMove { reason: String },

    /// A node and its intended parent belong to different scopes
    #[error("Scope mismatch: node scope {node_scope} differs from parent scope {parent_scope}")]
    ScopeMismatch {
        node_scope: String,
        parent_scope: String,
    },

    /// The parent passed to create does not exist in storage
    #[error("Parent node {parent_id} does not exist")]
    ParentNotFound { parent_id: String },

    /// The underlying store failed a read or write
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl NestedSetError {
    /// Create an invalid move error
    pub fn invalid_move(reason: impl Into<String>) -> Self {
        Self::InvalidMove {
            reason: reason.into(),
        }
    }

    pub fn is_invalid_move(&self) -> bool {
        matches!(self, NestedSetError::InvalidMove { .. })
    }
}

impl From<libsql::Error> for NestedSetError {
    fn from(e: libsql::Error) -> Self {
        NestedSetError::Storage(DatabaseError::LibsqlError(e))
    }
}

/// Render scope pairs for error messages, e.g. `user_id=999, user_type='User'`
pub(crate) fn describe_scope(scope: &[(String, Value)]) -> String {
    if scope.is_empty() {
        return "<global>".to_string();
    }
    scope
        .iter()
        .map(|(column, value)| format!("{}={}", column, describe_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(s) => format!("'{}'", s),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

pub type Result<T> = std::result::Result<T, NestedSetError>;
