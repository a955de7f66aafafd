//! Field descriptors: static metadata for one column.
//!
//! Each storage type has its own builder ([`StringField`], [`BooleanField`],
//! [`IntegerField`], [`FloatField`], [`TextField`]). The builders fix the
//! storage type and DDL hint, take defaults of the matching Rust type, and
//! only offer `primary_key()` where a key column makes sense. All of them
//! convert into the type-erased [`FieldDescriptor`] the schema builder stores.

use std::fmt;
use std::sync::Arc;

use p3bird_db::Value;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    String,
    Boolean,
    Integer,
    Float,
    Text,
}

impl StorageType {
    /// DDL used when a declaration does not override it.
    pub fn default_ddl(self) -> &'static str {
        match self {
            Self::String => "varchar(100)",
            Self::Boolean => "boolean",
            Self::Integer => "bigint",
            Self::Float => "real",
            Self::Text => "text",
        }
    }

    /// Name of the builder that declares this storage type.
    pub fn field_kind(self) -> &'static str {
        match self {
            Self::String => "StringField",
            Self::Boolean => "BooleanField",
            Self::Integer => "IntegerField",
            Self::Float => "FloatField",
            Self::Text => "TextField",
        }
    }
}

type Producer = Arc<dyn Fn() -> Value + Send + Sync>;

/// Value used for a field left unset at save time.
#[derive(Clone)]
pub enum FieldDefault {
    /// A fixed value.
    Literal(Value),
    /// A zero-argument generator, evaluated once per resolution.
    Producer(Producer),
}

impl FieldDefault {
    /// Produces the default value, invoking the generator if there is one.
    pub fn resolve(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Producer(produce) => produce(),
        }
    }

    fn producer<T, F>(f: F) -> Self
    where
        T: Into<Value>,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::Producer(Arc::new(move || f().into()))
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Type-erased description of one column.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: Option<String>,
    storage_type: StorageType,
    ddl: String,
    primary_key: bool,
    default: Option<FieldDefault>,
}

impl FieldDescriptor {
    fn new(storage_type: StorageType, default: Option<FieldDefault>) -> Self {
        Self {
            name: None,
            storage_type,
            ddl: storage_type.default_ddl().to_string(),
            primary_key: false,
            default,
        }
    }

    /// Column name, once set explicitly or filled in by the schema builder.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Storage type fixed by the builder that produced this descriptor.
    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    /// Column type used in `create table`.
    pub fn ddl(&self) -> &str {
        &self.ddl
    }

    /// Whether this field is the table's primary key.
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Declared default, if any.
    pub fn default(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }

    /// Resolves the default value, if the field has one.
    pub fn resolve_default(&self) -> Option<Value> {
        self.default.as_ref().map(FieldDefault::resolve)
    }

    pub(crate) fn with_name_if_absent(mut self, name: &str) -> Self {
        if self.name.is_none() {
            self.name = Some(name.to_string());
        }
        self
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}, {}: {}>",
            self.storage_type.field_kind(),
            self.ddl,
            self.name.as_deref().unwrap_or("?")
        )
    }
}

/// `varchar` column. Defaults to `varchar(100)` with no default value.
#[derive(Debug, Clone)]
pub struct StringField(FieldDescriptor);

impl StringField {
    pub fn new() -> Self {
        Self(FieldDescriptor::new(StorageType::String, None))
    }

    /// Overrides the column name.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    /// Overrides the DDL hint, e.g. `varchar(50)`.
    pub fn ddl(mut self, ddl: impl Into<String>) -> Self {
        self.0.ddl = ddl.into();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.0.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.0.default = Some(FieldDefault::Literal(Value::Text(value.into())));
        self
    }

    /// Uses `produce` to generate a value whenever the field is unset on save.
    pub fn default_fn<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.0.default = Some(FieldDefault::producer(produce));
        self
    }
}

/// `boolean` column, defaulting to `false`. Never a primary key.
#[derive(Debug, Clone)]
pub struct BooleanField(FieldDescriptor);

impl BooleanField {
    pub fn new() -> Self {
        Self(FieldDescriptor::new(
            StorageType::Boolean,
            Some(FieldDefault::Literal(Value::Bool(false))),
        ))
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    pub fn default_value(mut self, value: bool) -> Self {
        self.0.default = Some(FieldDefault::Literal(Value::Bool(value)));
        self
    }

    pub fn default_fn<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.0.default = Some(FieldDefault::producer(produce));
        self
    }
}

/// `bigint` column, defaulting to `0`.
#[derive(Debug, Clone)]
pub struct IntegerField(FieldDescriptor);

impl IntegerField {
    pub fn new() -> Self {
        Self(FieldDescriptor::new(
            StorageType::Integer,
            Some(FieldDefault::Literal(Value::Integer(0))),
        ))
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.0.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: i64) -> Self {
        self.0.default = Some(FieldDefault::Literal(Value::Integer(value)));
        self
    }

    pub fn default_fn<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.0.default = Some(FieldDefault::producer(produce));
        self
    }
}

/// `real` column, defaulting to `0.0`.
#[derive(Debug, Clone)]
pub struct FloatField(FieldDescriptor);

impl FloatField {
    pub fn new() -> Self {
        Self(FieldDescriptor::new(
            StorageType::Float,
            Some(FieldDefault::Literal(Value::Float(0.0))),
        ))
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.0.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: f64) -> Self {
        self.0.default = Some(FieldDefault::Literal(Value::Float(value)));
        self
    }

    pub fn default_fn<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        self.0.default = Some(FieldDefault::producer(produce));
        self
    }
}

/// `text` column for large content. Never a primary key.
#[derive(Debug, Clone)]
pub struct TextField(FieldDescriptor);

impl TextField {
    pub fn new() -> Self {
        Self(FieldDescriptor::new(StorageType::Text, None))
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.0.default = Some(FieldDefault::Literal(Value::Text(value.into())));
        self
    }

    pub fn default_fn<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.0.default = Some(FieldDefault::producer(produce));
        self
    }
}

macro_rules! impl_into_descriptor {
    ($($builder:ident),* $(,)?) => {
        $(
            impl Default for $builder {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl From<$builder> for FieldDescriptor {
                fn from(builder: $builder) -> Self {
                    builder.0
                }
            }
        )*
    };
}

impl_into_descriptor!(StringField, BooleanField, IntegerField, FloatField, TextField);
