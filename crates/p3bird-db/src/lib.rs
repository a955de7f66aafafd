//! Database layer for p3bird.
//!
//! Provides the column value model, SQLite connection pooling (via `r2d2`),
//! and the two statement primitives every higher layer is built on:
//! [`Database::select`] for reads and [`Database::execute`] for writes.
//!
//! # Design decisions
//!
//! - **Explicit handle**: [`create_pool`] returns a [`Database`] that callers
//!   clone and pass around. There is no process-wide pool to forget to
//!   initialize.
//! - **Blocking driver on the blocking pool**: `rusqlite` is synchronous, so
//!   every statement runs inside `tokio::task::spawn_blocking` and the async
//!   caller suspends until it finishes.
//! - **One connection per statement**: a pooled connection is checked out for
//!   exactly one statement and returned when its guard drops, whatever the
//!   outcome.
//! - **Generic placeholders**: statements are written with `?` and rewritten
//!   to the driver's native syntax right before execution.

mod error;
mod executor;
mod pool;
mod value;

pub use error::{DbError, PoolError};
pub use executor::{rewrite_placeholders, PlaceholderStyle};
pub use pool::{create_pool, Database, DbPool, PoolConfig};
pub use value::{Row, Value, ValueError};
