//! Error types for the mapping layer.

use p3bird_db::{DbError, ValueError};
use thiserror::Error;

/// Errors raised while deriving a schema from an entity declaration.
///
/// These are programmer errors: a declaration that fails here can never run
/// a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// No declared field is marked as the primary key.
    #[error("primary key not found for table `{table}`")]
    MissingPrimaryKey {
        /// The table being declared.
        table: String,
    },

    /// More than one declared field is marked as the primary key.
    #[error("duplicate primary key for field `{field}` (already `{existing}`)")]
    DuplicatePrimaryKey {
        /// The primary key seen first.
        existing: String,
        /// The second field marked as primary key.
        field: String,
    },

    /// Two declarations share an attribute or column name.
    #[error("duplicate field `{0}`")]
    DuplicateField(String),
}

/// Errors returned by CRUD operations.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The statement failed in the driver or the pool.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A `limit` argument had a shape other than `count` or `offset, count`.
    #[error("invalid limit value: {0}")]
    InvalidLimit(String),

    /// A column value could not be converted to the field's type.
    #[error("field `{field}`: {source}")]
    Conversion {
        /// The field being set.
        field: String,
        /// The underlying conversion failure.
        source: ValueError,
    },

    /// An attribute name that the entity does not declare.
    #[error("{entity} has no field `{field}`")]
    UnknownField {
        /// The entity type.
        entity: &'static str,
        /// The requested attribute.
        field: String,
    },
}
