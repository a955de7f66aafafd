//! CRUD operations over any [`Entity`].
//!
//! Each operation builds its statement from the entity's schema and runs it
//! through [`Database::select`] or [`Database::execute`]. Writes that touch
//! a row count other than one are logged as warnings and reported through
//! the returned count; they are not errors.

use p3bird_db::{Database, Value};

use crate::entity::Entity;
use crate::error::OrmError;
use crate::query::FindAll;

/// Finds one record by primary key. Returns `None` when no row matches.
///
/// Every call hydrates a fresh instance.
pub async fn find<E: Entity>(db: &Database, pk: Value) -> Result<Option<E>, OrmError> {
    let schema = E::schema();
    let sql = format!(
        "{} where `{}`=?",
        schema.select_sql(),
        schema.column(schema.primary_key())
    );

    let rows = db.select(&sql, vec![pk], Some(1)).await?;
    rows.first().map(E::from_row).transpose()
}

/// Finds every record matching `query`, in the order the store returns them.
pub async fn find_all<E: Entity>(db: &Database, query: FindAll) -> Result<Vec<E>, OrmError> {
    let (sql, args) = query.to_sql(E::schema().select_sql());
    let rows = db.select(&sql, args, None).await?;
    rows.iter().map(E::from_row).collect()
}

/// Resolves an attribute for insertion, falling back to the field default
/// and writing the resolved default back into the entity.
fn value_or_default<E: Entity>(entity: &mut E, attribute: &str) -> Result<Value, OrmError> {
    if let Some(value) = entity.get(attribute) {
        return Ok(value);
    }

    let default = E::schema()
        .field(attribute)
        .and_then(|field| field.resolve_default());

    match default {
        Some(value) => {
            tracing::debug!(entity = E::NAME, attribute, value = %value, "using default value");
            entity.set(attribute, value.clone())?;
            Ok(value)
        }
        None => Ok(Value::Null),
    }
}

/// Inserts the entity.
///
/// Unset fields take their declared default (a generator runs once per
/// field per call) and the resolved value is stored back on the entity.
/// Returns the affected-row count.
pub async fn save<E: Entity>(db: &Database, entity: &mut E) -> Result<usize, OrmError> {
    let schema = E::schema();
    let mut args = Vec::with_capacity(schema.fields().len() + 1);
    for attribute in schema.fields() {
        args.push(value_or_default(entity, attribute)?);
    }
    args.push(value_or_default(entity, schema.primary_key())?);

    let affected = db.execute(schema.insert_sql(), args).await?;
    if affected != 1 {
        tracing::warn!(
            table = schema.table(),
            affected,
            "failed to insert by primary key"
        );
    }
    Ok(affected)
}

/// Writes the entity's current values over the row with its primary key.
///
/// Unset fields are written as `NULL`; defaults are not applied.
pub async fn update<E: Entity>(db: &Database, entity: &E) -> Result<usize, OrmError> {
    let schema = E::schema();
    let args: Vec<Value> = schema
        .fields()
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(schema.primary_key()))
        .map(|attribute| entity.get(attribute).unwrap_or(Value::Null))
        .collect();

    let affected = db.execute(schema.update_sql(), args).await?;
    if affected != 1 {
        tracing::warn!(
            table = schema.table(),
            affected,
            "failed to update by primary key"
        );
    }
    Ok(affected)
}

/// Deletes the row with the entity's primary key. The entity itself is left
/// as it was.
pub async fn remove<E: Entity>(db: &Database, entity: &E) -> Result<usize, OrmError> {
    let schema = E::schema();
    let pk = entity.get(schema.primary_key()).unwrap_or(Value::Null);

    let affected = db.execute(schema.delete_sql(), vec![pk]).await?;
    if affected != 1 {
        tracing::warn!(
            table = schema.table(),
            affected,
            "failed to remove by primary key"
        );
    }
    Ok(affected)
}

/// Creates the entity's table from its DDL hints if it does not exist yet.
pub async fn create_table<E: Entity>(db: &Database) -> Result<(), OrmError> {
    db.execute(&E::schema().create_table_sql(), Vec::new()).await?;
    Ok(())
}
