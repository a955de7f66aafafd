//! Object-relational mapping for p3bird.
//!
//! Entities are declared once with [`entity!`]. The declaration produces a
//! typed record whose fields are all optional, and a [`Schema`] holding the
//! four SQL templates (select, insert, update, delete) the CRUD operations
//! run through a shared [`Database`] handle.
//!
//! # Usage
//!
//! ```rust,ignore
//! use p3bird_orm::{entity, FindAll, IntegerField, Limit, StringField};
//!
//! entity! {
//!     pub struct User in "user" {
//!         pub id: String => StringField::new().primary_key(),
//!         pub name: String => StringField::new(),
//!         pub score: i64 => IntegerField::new(),
//!     }
//! }
//!
//! let mut user = User { id: Some("u1".into()), name: Some("Alice".into()), ..Default::default() };
//! user.save(&db).await?;           // score takes its default, 0
//! let found = User::find(&db, "u1").await?;
//! let top = User::find_all(&db, FindAll::new().order_by("`score` desc").limit(Limit::Count(5))).await?;
//! ```
//!
//! # Error classes
//!
//! | Class | Surface |
//! |-------|---------|
//! | Declaration | [`SchemaError`], or a panic on first schema access |
//! | Usage | [`OrmError::InvalidLimit`] |
//! | Storage | [`OrmError::Db`], propagated unchanged |
//! | Consistency | `warn` log; affected-row count returned |

pub mod crud;
mod entity;
mod error;
mod field;
mod query;
mod schema;

pub use entity::{ensure_declared, Entity, FromValue};
pub use error::{OrmError, SchemaError};
pub use field::{
    BooleanField, FieldDefault, FieldDescriptor, FloatField, IntegerField, StorageType,
    StringField, TextField,
};
pub use p3bird_db::{Database, Row, Value};
pub use query::{FindAll, Limit};
pub use schema::{Schema, SchemaBuilder};

#[cfg(test)]
mod tests;
