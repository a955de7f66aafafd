//! Entity records and their declaration macro.
//!
//! An entity is a plain struct with one `Option<T>` per declared column;
//! `None` means "unset". [`entity!`](crate::entity!) generates the struct,
//! its [`Entity`] impl, and inherent async CRUD methods from a single
//! declaration.

use p3bird_db::{Row, Value, ValueError};

use crate::error::{OrmError, SchemaError};
use crate::schema::{Schema, SchemaBuilder};

/// A record type mapped to one table.
pub trait Entity: Default + Send + Sync + 'static {
    /// Type name used in diagnostics.
    const NAME: &'static str;

    /// Field declarations for this entity.
    fn declare() -> SchemaBuilder;

    /// The derived schema, built on first access.
    ///
    /// # Panics
    ///
    /// Panics if the declaration is invalid. Use [`Entity::try_schema`] or
    /// [`ensure_declared`] at startup to surface the error early.
    fn schema() -> &'static Schema;

    /// Builds the schema without caching it, reporting declaration errors.
    fn try_schema() -> Result<Schema, SchemaError> {
        Self::declare().build()
    }

    /// Current value of an attribute; `None` when unset or unknown.
    fn get(&self, attribute: &str) -> Option<Value>;

    /// Sets an attribute. `Value::Null` clears it.
    fn set(&mut self, attribute: &str, value: Value) -> Result<(), OrmError>;

    /// Builds an instance from a result row. Columns that do not map to a
    /// declared field are ignored.
    fn from_row(row: &Row) -> Result<Self, OrmError> {
        let schema = Self::schema();
        let mut entity = Self::default();
        for (column, value) in row.iter() {
            match schema.attribute_for_column(column) {
                Some(attribute) => entity.set(attribute, value.clone())?,
                None => tracing::trace!(entity = Self::NAME, column, "ignoring unmapped column"),
            }
        }
        Ok(entity)
    }
}

/// Checks an entity declaration, so a bad one fails at startup rather than
/// on first use.
///
/// # Errors
///
/// Returns the `SchemaError` the declaration produces.
pub fn ensure_declared<E: Entity>() -> Result<(), SchemaError> {
    E::try_schema().map(|schema| {
        tracing::debug!(entity = E::NAME, table = schema.table(), "entity declared");
    })
}

/// Conversion from a column value into a field's Rust type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;

    /// Like [`FromValue::from_value`], mapping `Null` to `None`.
    fn from_nullable(value: Value) -> Result<Option<Self>, ValueError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_value(value).map(Some)
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(ValueError {
                expected: "text",
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        value.as_i64()
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        value.as_f64()
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Blob(b) => Ok(b),
            other => Err(ValueError {
                expected: "blob",
                found: other.kind(),
            }),
        }
    }
}

/// Declares an entity: a typed record, its schema, and its CRUD methods.
///
/// ```rust,ignore
/// use p3bird_orm::{entity, IntegerField, StringField};
///
/// entity! {
///     /// A registered account.
///     pub struct User in "user" {
///         pub id: String => StringField::new().primary_key(),
///         pub name: String => StringField::new(),
///         pub score: i64 => IntegerField::new(),
///     }
/// }
/// ```
///
/// Every field becomes `Option<T>`. Struct and field attributes are passed
/// through, so derives such as `serde::Serialize` can be added.
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident in $table:literal {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty => $descriptor:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: ::std::option::Option<$ty>,
            )*
        }

        impl $crate::Entity for $name {
            const NAME: &'static str = stringify!($name);

            fn declare() -> $crate::SchemaBuilder {
                $crate::SchemaBuilder::new($table)
                    $( .field(stringify!($field), $descriptor) )*
            }

            fn schema() -> &'static $crate::Schema {
                static SCHEMA: ::std::sync::OnceLock<$crate::Schema> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    <Self as $crate::Entity>::declare()
                        .build()
                        .unwrap_or_else(|err| {
                            panic!("invalid entity declaration `{}`: {err}", stringify!($name))
                        })
                })
            }

            fn get(&self, attribute: &str) -> ::std::option::Option<$crate::Value> {
                match attribute {
                    $( stringify!($field) => self.$field.clone().map($crate::Value::from), )*
                    _ => ::std::option::Option::None,
                }
            }

            fn set(
                &mut self,
                attribute: &str,
                value: $crate::Value,
            ) -> ::std::result::Result<(), $crate::OrmError> {
                match attribute {
                    $(
                        stringify!($field) => {
                            self.$field = <$ty as $crate::FromValue>::from_nullable(value)
                                .map_err(|source| $crate::OrmError::Conversion {
                                    field: attribute.to_string(),
                                    source,
                                })?;
                            ::std::result::Result::Ok(())
                        }
                    )*
                    _ => ::std::result::Result::Err($crate::OrmError::UnknownField {
                        entity: stringify!($name),
                        field: attribute.to_string(),
                    }),
                }
            }
        }

        impl $name {
            /// Finds one record by primary key.
            pub async fn find(
                db: &$crate::Database,
                pk: impl ::std::convert::Into<$crate::Value>,
            ) -> ::std::result::Result<::std::option::Option<Self>, $crate::OrmError> {
                $crate::crud::find::<Self>(db, pk.into()).await
            }

            /// Finds every record matching `query`.
            pub async fn find_all(
                db: &$crate::Database,
                query: $crate::FindAll,
            ) -> ::std::result::Result<::std::vec::Vec<Self>, $crate::OrmError> {
                $crate::crud::find_all::<Self>(db, query).await
            }

            /// Inserts this record, filling unset fields from their defaults.
            pub async fn save(
                &mut self,
                db: &$crate::Database,
            ) -> ::std::result::Result<usize, $crate::OrmError> {
                $crate::crud::save(db, self).await
            }

            /// Updates the stored row with this record's current values.
            pub async fn update(
                &self,
                db: &$crate::Database,
            ) -> ::std::result::Result<usize, $crate::OrmError> {
                $crate::crud::update(db, self).await
            }

            /// Deletes the stored row with this record's primary key.
            pub async fn remove(
                &self,
                db: &$crate::Database,
            ) -> ::std::result::Result<usize, $crate::OrmError> {
                $crate::crud::remove(db, self).await
            }
        }
    };
}
