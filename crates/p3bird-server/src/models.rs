//! Blog data models: users, blogs, and comments.

use p3bird_orm::{
    crud, ensure_declared, entity, BooleanField, Database, FloatField, OrmError, SchemaError,
    StringField, TextField,
};
use serde::Serialize;

/// Generates a sortable 50-character key: the millisecond timestamp padded
/// to 15 digits, a random UUID in hex, and a `000` suffix.
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Current time as fractional seconds since the Unix epoch.
pub fn now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

entity! {
    #[derive(Serialize)]
    pub struct User in "users" {
        pub id: String => StringField::new().primary_key().ddl("varchar(50)").default_fn(next_id),
        pub email: String => StringField::new().ddl("varchar(50)"),
        #[serde(skip_serializing)]
        pub passwd: String => StringField::new().ddl("varchar(50)"),
        pub admin: bool => BooleanField::new(),
        pub name: String => StringField::new().ddl("varchar(50)"),
        pub image: String => StringField::new().ddl("varchar(500)"),
        pub created_at: f64 => FloatField::new().default_fn(now),
    }
}

entity! {
    #[derive(Serialize)]
    pub struct Blog in "blogs" {
        pub id: String => StringField::new().primary_key().ddl("varchar(50)").default_fn(next_id),
        pub user_id: String => StringField::new().ddl("varchar(50)"),
        pub user_name: String => StringField::new().ddl("varchar(50)"),
        pub user_image: String => StringField::new().ddl("varchar(500)"),
        pub name: String => StringField::new().ddl("varchar(50)"),
        pub summary: String => StringField::new().ddl("varchar(200)"),
        pub content: String => TextField::new(),
        pub created_at: f64 => FloatField::new().default_fn(now),
    }
}

entity! {
    #[derive(Serialize)]
    pub struct Comment in "comments" {
        pub id: String => StringField::new().primary_key().ddl("varchar(50)").default_fn(next_id),
        pub blog_id: String => StringField::new().ddl("varchar(50)"),
        pub user_id: String => StringField::new().ddl("varchar(50)"),
        pub user_name: String => StringField::new().ddl("varchar(50)"),
        pub user_image: String => StringField::new().ddl("varchar(500)"),
        pub content: String => TextField::new(),
        pub created_at: f64 => FloatField::new().default_fn(now),
    }
}

/// Checks every model declaration.
pub fn ensure_models() -> Result<(), SchemaError> {
    ensure_declared::<User>()?;
    ensure_declared::<Blog>()?;
    ensure_declared::<Comment>()
}

/// Creates the model tables that do not exist yet.
pub async fn create_tables(db: &Database) -> Result<(), OrmError> {
    crud::create_table::<User>(db).await?;
    crud::create_table::<Blog>(db).await?;
    crud::create_table::<Comment>(db).await?;
    tracing::info!("model tables ready");
    Ok(())
}
