//! Error types for forceql-orm.

use crate::entity::FieldMap;

/// Result type alias for forceql-orm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for forceql-orm operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The query representation could not be translated. Always a
    /// programming error; never retried.
    #[error(transparent)]
    Translate(#[from] TranslateError),

    /// A result row could not be mapped into the entity type.
    #[error("failed to map a row into {object}: {source}")]
    Mapping {
        object: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Transport-level failure; retryable by the caller.
    #[error(transparent)]
    Transport(#[from] forceql_client::Error),

    /// Authentication failure.
    #[error(transparent)]
    Auth(#[from] forceql_auth::Error),

    /// One or more pending operations failed to commit.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// The operation is not valid for the entity or context state.
    #[error("{0}")]
    InvalidOperation(String),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidOperation(message.into())
    }

    /// Returns true if this wraps a transport authorization failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Transport(err) if err.is_unauthorized())
    }
}

/// Translation failures, surfaced synchronously at enumeration time.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// A predicate, projection or ordering referenced a field that is not
    /// declared in the entity metadata.
    #[error("unknown field `{field}` on {object}")]
    UnknownField {
        object: &'static str,
        field: String,
    },

    /// `skip` was requested but the target deployment does not support the
    /// OFFSET clause (see [`crate::Capabilities`]).
    #[error("OFFSET is not supported by the target API version (skip of {skip} rejected)")]
    OffsetNotSupported { skip: u32 },

    /// An IN/INCLUDES predicate carried no values.
    #[error("membership predicate on `{field}` has no values")]
    EmptyMembership { field: String },
}

/// The kind of remote call a pending operation maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOperation {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for CommitOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommitOperation::Create => "create",
            CommitOperation::Update => "update",
            CommitOperation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Aggregate failure of a [`crate::DataContext::commit`] flush.
///
/// Every pending operation is attempted; this error carries the ordered list
/// of the ones that failed. Operations that succeeded before or after a
/// failure are NOT rolled back (the remote API has no cross-record
/// transactions); their entries have been cleared from the pending set and
/// `succeeded` counts them.
#[derive(Debug, thiserror::Error)]
#[error("commit failed: {} of {attempted} operation(s) failed ({succeeded} succeeded)", .failures.len())]
pub struct CommitError {
    /// Number of operations attempted in this flush.
    pub attempted: usize,
    /// Number of operations that committed successfully.
    pub succeeded: usize,
    /// Failures in the order the operations were attempted.
    pub failures: Vec<CommitFailure>,
}

impl CommitError {
    /// Every attempted operation failed.
    pub fn is_total_failure(&self) -> bool {
        self.succeeded == 0
    }

    /// Some operations committed before/after the failures; the remote
    /// store now holds a partial result.
    pub fn is_partial(&self) -> bool {
        self.succeeded > 0
    }
}

/// A single failed operation within a commit.
#[derive(Debug, thiserror::Error)]
#[error("{operation} of {object}{} failed: {error}", .record_id.as_deref().map(|id| format!(" {id}")).unwrap_or_default())]
pub struct CommitFailure {
    /// Remote object name of the entity concerned.
    pub object: &'static str,
    /// Remote identity, when the entity has one.
    pub record_id: Option<String>,
    /// The operation that failed.
    pub operation: CommitOperation,
    /// The fields that were being written, for inspection and retry.
    pub fields: FieldMap,
    /// The underlying failure.
    #[source]
    pub error: Error,
}
