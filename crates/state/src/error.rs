//! Error types for the record model and transaction engine.

use thiserror::Error;

use crate::record::RecordKind;

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors from the record model and the layered transaction engine.
#[derive(Error, Debug)]
pub enum StateError {
    /// A typed accessor was called on a record of a different kind.
    ///
    /// Internal engine code matches exhaustively and cannot hit this; it
    /// signals a bug in a caller crossing the dynamic accessor boundary.
    #[error("wrong record variant: expected {expected}, found {actual}")]
    WrongVariant {
        /// The kind the accessor expected.
        expected: RecordKind,
        /// The record's live kind.
        actual: RecordKind,
    },

    /// Commit, rollback, or mutation was attempted on a frame that still has
    /// an open child. Nested frames must be committed or rolled back first.
    #[error("frame has an open child; resolve nested frames first")]
    HasOpenChild,

    /// An operation used a handle to a frame that has already been committed
    /// or rolled back.
    #[error("frame is no longer active")]
    InactiveFrame,

    /// A bulk deletion's affected-row count failed the active consistency
    /// policy. The whole root commit was aborted; nothing became durable.
    #[error("bulk delete for {kind} records affected {actual} rows, expected {expected}")]
    ConsistencyViolation {
        /// Record kind whose deletion failed the check.
        kind: RecordKind,
        /// Number of deletion keys submitted.
        expected: usize,
        /// Rows the backing store reported as deleted.
        actual: usize,
    },

    /// A bulk upsert affected a different number of rows than were
    /// submitted. The whole root commit was aborted; retry from a fresh
    /// frame.
    #[error("bulk upsert for {kind} records affected {actual} rows, expected {expected}")]
    PersistenceWriteFailed {
        /// Record kind whose upsert failed the check.
        kind: RecordKind,
        /// Number of rows submitted.
        expected: usize,
        /// Rows the backing store reported as written.
        actual: usize,
    },

    /// An issued-amount adjustment left the 128-bit range.
    #[error("issued-amount adjustment leaves the 128-bit range")]
    IssuanceOverflow,

    /// Backing-store failure.
    #[error("database error: {0}")]
    Db(#[from] hayashi_db::DbError),
}
