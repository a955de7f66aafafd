//! Schema derivation: from declared fields to SQL templates.
//!
//! A [`Schema`] is built once per entity type and never changes afterwards.
//! Templates use backtick-quoted identifiers and generic `?` placeholders;
//! the executor rewrites the placeholders for the driver.

use crate::error::SchemaError;
use crate::field::FieldDescriptor;

/// Collects field declarations for one table.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    table: String,
    declared: Vec<(String, FieldDescriptor)>,
}

impl SchemaBuilder {
    /// Starts a declaration for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            declared: Vec::new(),
        }
    }

    /// Declares a field. Declaration order is the column order of every
    /// template.
    pub fn field(mut self, attribute: impl Into<String>, field: impl Into<FieldDescriptor>) -> Self {
        self.declared.push((attribute.into(), field.into()));
        self
    }

    /// Validates the declarations and derives the schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::DuplicatePrimaryKey` if more than one field is a
    /// key, `SchemaError::MissingPrimaryKey` if none is, and
    /// `SchemaError::DuplicateField` if two fields share an attribute or
    /// column name.
    pub fn build(self) -> Result<Schema, SchemaError> {
        tracing::info!(table = %self.table, fields = self.declared.len(), "found model");

        let mut mapping: Vec<(String, FieldDescriptor)> = Vec::with_capacity(self.declared.len());
        let mut primary_key: Option<String> = None;
        let mut fields = Vec::new();

        for (attribute, field) in self.declared {
            let field = field.with_name_if_absent(&attribute);
            let column = field.name().unwrap_or(&attribute);
            if mapping
                .iter()
                .any(|(a, f)| *a == attribute || f.name() == Some(column))
            {
                return Err(SchemaError::DuplicateField(attribute));
            }
            tracing::debug!(attribute = %attribute, field = %field, "found mapping");

            if field.is_primary_key() {
                if let Some(existing) = primary_key {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        existing,
                        field: attribute,
                    });
                }
                primary_key = Some(attribute.clone());
            } else {
                fields.push(attribute.clone());
            }
            mapping.push((attribute, field));
        }

        let Some(primary_key) = primary_key else {
            return Err(SchemaError::MissingPrimaryKey { table: self.table });
        };

        Ok(Schema::derive(self.table, fields, primary_key, mapping))
    }
}

/// Immutable table metadata and SQL templates for one entity type.
#[derive(Debug, Clone)]
pub struct Schema {
    table: String,
    fields: Vec<String>,
    primary_key: String,
    mapping: Vec<(String, FieldDescriptor)>,
    select_sql: String,
    insert_sql: String,
    update_sql: String,
    delete_sql: String,
}

fn quote(identifier: &str) -> String {
    format!("`{identifier}`")
}

impl Schema {
    fn derive(
        table: String,
        fields: Vec<String>,
        primary_key: String,
        mapping: Vec<(String, FieldDescriptor)>,
    ) -> Self {
        let column = |attribute: &str| -> String {
            mapping
                .iter()
                .find(|(a, _)| a == attribute)
                .and_then(|(_, f)| f.name())
                .map_or_else(|| quote(attribute), quote)
        };

        let quoted_table = quote(&table);
        let quoted_key = column(&primary_key);
        let quoted_fields: Vec<String> = fields.iter().map(|f| column(f)).collect();

        let mut select_columns = vec![quoted_key.clone()];
        select_columns.extend(quoted_fields.iter().cloned());
        let select_sql = format!(
            "select {} from {quoted_table}",
            select_columns.join(", ")
        );

        let mut insert_columns = quoted_fields.clone();
        insert_columns.push(quoted_key.clone());
        let insert_sql = format!(
            "insert into {quoted_table} ({}) values ({})",
            insert_columns.join(", "),
            vec!["?"; insert_columns.len()].join(", ")
        );

        let assignments: Vec<String> = quoted_fields.iter().map(|c| format!("{c}=?")).collect();
        let update_sql = format!(
            "update {quoted_table} set {} where {quoted_key}=?",
            assignments.join(", ")
        );

        let delete_sql = format!("delete from {quoted_table} where {quoted_key}=?");

        Self {
            table,
            fields,
            primary_key,
            mapping,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        }
    }

    /// Unquoted table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Non-key attributes, in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Attribute name of the primary key.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Every declared attribute with its descriptor, in declaration order.
    pub fn mapping(&self) -> &[(String, FieldDescriptor)] {
        &self.mapping
    }

    /// Descriptor declared for `attribute`.
    pub fn field(&self, attribute: &str) -> Option<&FieldDescriptor> {
        self.mapping
            .iter()
            .find(|(a, _)| a == attribute)
            .map(|(_, f)| f)
    }

    /// Column name an attribute is stored under.
    pub fn column<'a>(&'a self, attribute: &'a str) -> &'a str {
        self.field(attribute)
            .and_then(FieldDescriptor::name)
            .unwrap_or(attribute)
    }

    /// Attribute a result column hydrates into, if any.
    pub fn attribute_for_column(&self, column: &str) -> Option<&str> {
        self.mapping
            .iter()
            .find(|(_, f)| f.name() == Some(column))
            .map(|(a, _)| a.as_str())
    }

    /// ``select `pk`, `f1`, ... from `table` ``
    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    /// ``insert into `table` (`f1`, ..., `pk`) values (?, ..., ?)``
    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    /// ``update `table` set `f1`=?, ... where `pk`=?``
    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }

    /// ``delete from `table` where `pk`=?``
    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }

    /// `create table if not exists` statement rendered from the DDL hints.
    ///
    /// The key column is `not null`, so a row can always be addressed by it.
    pub fn create_table_sql(&self) -> String {
        let definitions: Vec<String> = std::iter::once(&self.primary_key)
            .chain(self.fields.iter())
            .filter_map(|attribute| {
                self.field(attribute).map(|f| {
                    let key = if f.is_primary_key() { " not null primary key" } else { "" };
                    format!("{} {}{key}", quote(self.column(attribute)), f.ddl())
                })
            })
            .collect();

        format!(
            "create table if not exists {} ({})",
            quote(&self.table),
            definitions.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{BooleanField, FloatField, IntegerField, StringField, TextField};

    fn user_schema() -> Schema {
        SchemaBuilder::new("user")
            .field("id", StringField::new().primary_key())
            .field("name", StringField::new())
            .field("score", IntegerField::new())
            .build()
            .expect("schema should build")
    }

    #[test]
    fn templates_follow_declaration_order_with_key_last() {
        let schema = user_schema();

        assert_eq!(schema.table(), "user");
        assert_eq!(schema.primary_key(), "id");
        assert_eq!(schema.fields(), ["name", "score"]);
        assert_eq!(schema.select_sql(), "select `id`, `name`, `score` from `user`");
        assert_eq!(
            schema.insert_sql(),
            "insert into `user` (`name`, `score`, `id`) values (?, ?, ?)"
        );
        assert_eq!(
            schema.update_sql(),
            "update `user` set `name`=?, `score`=? where `id`=?"
        );
        assert_eq!(schema.delete_sql(), "delete from `user` where `id`=?");
    }

    #[test]
    fn every_template_names_the_table_once() {
        let schema = user_schema();
        for sql in [
            schema.select_sql(),
            schema.insert_sql(),
            schema.update_sql(),
            schema.delete_sql(),
        ] {
            assert_eq!(sql.matches("`user`").count(), 1, "in {sql}");
        }
    }

    #[test]
    fn key_position_does_not_depend_on_declaration_position() {
        let schema = SchemaBuilder::new("blog")
            .field("name", StringField::new())
            .field("id", IntegerField::new().primary_key())
            .field("content", TextField::new())
            .build()
            .expect("schema should build");

        assert_eq!(schema.fields(), ["name", "content"]);
        assert_eq!(schema.select_sql(), "select `id`, `name`, `content` from `blog`");
        assert!(schema.insert_sql().contains("(`name`, `content`, `id`)"));
        assert!(schema.update_sql().ends_with("where `id`=?"));
    }

    #[test]
    fn missing_primary_key_is_rejected() {
        let err = SchemaBuilder::new("log")
            .field("message", TextField::new())
            .field("seen", BooleanField::new())
            .build()
            .expect_err("build should fail without a key");
        assert_eq!(
            err,
            SchemaError::MissingPrimaryKey {
                table: "log".to_string()
            }
        );
    }

    #[test]
    fn second_primary_key_is_rejected() {
        let err = SchemaBuilder::new("pair")
            .field("a", StringField::new().primary_key())
            .field("b", FloatField::new().primary_key())
            .build()
            .expect_err("build should fail with two keys");
        assert_eq!(
            err,
            SchemaError::DuplicatePrimaryKey {
                existing: "a".to_string(),
                field: "b".to_string()
            }
        );
    }

    #[test]
    fn duplicate_attribute_or_column_is_rejected() {
        let err = SchemaBuilder::new("t")
            .field("id", StringField::new().primary_key())
            .field("id", StringField::new())
            .build()
            .expect_err("duplicate attribute should fail");
        assert_eq!(err, SchemaError::DuplicateField("id".to_string()));

        let err = SchemaBuilder::new("t")
            .field("id", StringField::new().primary_key())
            .field("alias", StringField::new().column("id"))
            .build()
            .expect_err("duplicate column should fail");
        assert_eq!(err, SchemaError::DuplicateField("alias".to_string()));
    }

    #[test]
    fn column_overrides_flow_into_templates_and_hydration_lookup() {
        let schema = SchemaBuilder::new("user")
            .field("id", StringField::new().primary_key())
            .field("display_name", StringField::new().column("name"))
            .build()
            .expect("schema should build");

        assert_eq!(schema.select_sql(), "select `id`, `name` from `user`");
        assert_eq!(schema.update_sql(), "update `user` set `name`=? where `id`=?");
        assert_eq!(schema.column("display_name"), "name");
        assert_eq!(schema.attribute_for_column("name"), Some("display_name"));
        assert_eq!(schema.attribute_for_column("display_name"), None);
    }

    #[test]
    fn create_table_uses_ddl_hints() {
        let schema = SchemaBuilder::new("blog")
            .field("id", StringField::new().ddl("varchar(50)").primary_key())
            .field("summary", StringField::new().ddl("varchar(200)"))
            .field("content", TextField::new())
            .field("created_at", FloatField::new())
            .build()
            .expect("schema should build");

        assert_eq!(
            schema.create_table_sql(),
            "create table if not exists `blog` (`id` varchar(50) not null primary key, \
             `summary` varchar(200), `content` text, `created_at` real)"
        );
    }
}
