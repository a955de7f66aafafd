//! Error types for the database layer.

use thiserror::Error;

/// Errors that can occur when creating the connection pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The configured pool bounds are unusable.
    #[error("invalid pool size: min_size {min_size}, max_size {max_size}")]
    InvalidSize {
        /// Configured minimum number of idle connections.
        min_size: u32,
        /// Configured maximum number of connections.
        max_size: u32,
    },

    /// The configured charset has no SQLite encoding equivalent.
    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Manual commit mode was requested; every statement commits on its own.
    #[error("autocommit = false is not supported")]
    AutocommitUnsupported,

    /// Failed to open the connection that keeps an in-memory database alive.
    #[error("failed to open in-memory database: {0}")]
    Open(#[from] rusqlite::Error),

    /// Failed to build the connection pool.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Errors that can occur while running a statement.
#[derive(Debug, Error)]
pub enum DbError {
    /// No connection could be checked out of the pool.
    #[error("failed to acquire pooled connection: {0}")]
    Pool(#[from] r2d2::Error),

    /// The driver rejected or failed the statement.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The blocking task running the statement panicked or was aborted.
    #[error("statement task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
