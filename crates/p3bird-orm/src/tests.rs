//! Unit tests for the CRUD façade against an on-disk SQLite pool.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use p3bird_db::{create_pool, PoolConfig};
use tracing_subscriber::fmt::MakeWriter;

use crate::crud::{create_table, find, find_all};
use crate::{
    ensure_declared, entity, BooleanField, Database, Entity, FindAll, FloatField, IntegerField,
    Limit, OrmError, Row, SchemaError, StringField, TextField, Value,
};

entity! {
    struct Account in "account" {
        id: String => StringField::new().primary_key(),
        email: String => StringField::new().ddl("varchar(50)"),
        admin: bool => BooleanField::new(),
        logins: i64 => IntegerField::new(),
        balance: f64 => FloatField::new().default_value(1.5),
        bio: String => TextField::new(),
    }
}

static TICKETS_ISSUED: AtomicUsize = AtomicUsize::new(0);

entity! {
    struct Ticket in "ticket" {
        id: String => StringField::new().primary_key().default_fn(|| {
            let n = TICKETS_ISSUED.fetch_add(1, Ordering::SeqCst);
            format!("t-{n:04}")
        }),
        title: String => StringField::new().default_value("untitled"),
    }
}

entity! {
    struct Keyless in "keyless" {
        note: String => TextField::new(),
    }
}

/// Opens a pool on a fresh database file with the given tables created.
async fn test_db(dir: &tempfile::TempDir) -> Database {
    let path = dir.path().join("orm.db");
    let db = create_pool(&PoolConfig::new("www-data", "", path.to_string_lossy()))
        .expect("should create pool");
    create_table::<Account>(&db)
        .await
        .expect("should create account table");
    create_table::<Ticket>(&db)
        .await
        .expect("should create ticket table");
    db
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn account(id: &str, email: &str) -> Account {
    Account {
        id: Some(id.to_string()),
        email: Some(email.to_string()),
        ..Account::default()
    }
}

// ── save / find ──────────────────────────────────────────────────────

#[tokio::test]
async fn save_then_find_round_trips_with_defaults_for_unset_fields() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;

    let mut alice = account("a1", "alice@example.com");
    alice.logins = Some(7);
    let affected = alice.save(&db).await.expect("save should succeed");
    assert_eq!(affected, 1);

    // Resolved defaults are written back to the instance.
    assert_eq!(alice.admin, Some(false));
    assert_eq!(alice.balance, Some(1.5));
    assert_eq!(alice.bio, None, "text field has no default");

    let found = Account::find(&db, "a1")
        .await
        .expect("find should succeed")
        .expect("row should exist");
    assert_eq!(found, alice);
    assert_eq!(found.logins, Some(7));
}

#[tokio::test]
async fn find_missing_key_returns_none() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;

    let found = find::<Account>(&db, Value::from("nobody"))
        .await
        .expect("find should succeed");
    assert!(found.is_none());
}

#[tokio::test]
async fn each_find_hydrates_a_fresh_instance() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;
    account("a1", "a@example.com")
        .save(&db)
        .await
        .expect("save should succeed");

    let mut first = Account::find(&db, "a1").await.unwrap().unwrap();
    let second = Account::find(&db, "a1").await.unwrap().unwrap();
    first.email = Some("changed@example.com".to_string());

    assert_eq!(second.email.as_deref(), Some("a@example.com"));
}

#[tokio::test]
async fn saving_an_existing_key_propagates_the_storage_error() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;
    account("a1", "a@example.com").save(&db).await.unwrap();

    let err = account("a1", "again@example.com")
        .save(&db)
        .await
        .expect_err("duplicate key should fail");
    assert!(matches!(err, OrmError::Db(_)), "unexpected error: {err:?}");
}

// ── defaults ─────────────────────────────────────────────────────────

#[tokio::test]
async fn producer_default_runs_once_per_save_and_only_when_unset() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;

    let before = TICKETS_ISSUED.load(Ordering::SeqCst);
    let mut generated = Ticket::default();
    generated.save(&db).await.expect("save should succeed");
    assert_eq!(TICKETS_ISSUED.load(Ordering::SeqCst), before + 1);

    let id = generated.id.clone().expect("generated key should be stored");
    assert!(id.starts_with("t-"));
    assert_eq!(generated.title.as_deref(), Some("untitled"));

    let mut explicit = Ticket {
        id: Some("fixed".to_string()),
        title: Some("Ship it".to_string()),
    };
    explicit.save(&db).await.expect("save should succeed");
    assert_eq!(TICKETS_ISSUED.load(Ordering::SeqCst), before + 1);

    let found = Ticket::find(&db, id.as_str()).await.unwrap().unwrap();
    assert_eq!(found, generated);
}

#[tokio::test]
async fn saving_without_a_key_is_rejected_by_the_store() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;

    let mut unkeyed = Account {
        email: Some("nobody@example.com".to_string()),
        ..Account::default()
    };
    let err = unkeyed
        .save(&db)
        .await
        .expect_err("a row without a key cannot be addressed");
    assert!(matches!(err, OrmError::Db(_)), "unexpected error: {err:?}");

    let rows = find_all::<Account>(&db, FindAll::new()).await.unwrap();
    assert!(rows.is_empty(), "nothing should be stored: {rows:?}");
}

// ── update ───────────────────────────────────────────────────────────

#[tokio::test]
async fn update_writes_current_values_and_leaves_unset_fields_null() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;

    let mut alice = account("a1", "alice@example.com");
    alice.bio = Some("hello".to_string());
    alice.save(&db).await.unwrap();

    alice.bio = None;
    alice.balance = None;
    alice.admin = Some(true);
    let affected = alice.update(&db).await.expect("update should succeed");
    assert_eq!(affected, 1);

    let found = Account::find(&db, "a1").await.unwrap().unwrap();
    assert_eq!(found.admin, Some(true));
    assert_eq!(found.bio, None);
    assert_eq!(found.balance, None, "update must not apply defaults");
}

#[tokio::test]
async fn update_of_missing_row_reports_zero_without_error() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;

    let ghost = account("ghost", "ghost@example.com");
    let affected = ghost.update(&db).await.expect("update should not raise");
    assert_eq!(affected, 0);
}

// ── remove ───────────────────────────────────────────────────────────

#[tokio::test]
async fn removing_twice_reports_zero_the_second_time() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;

    let mut alice = account("a1", "alice@example.com");
    alice.save(&db).await.unwrap();

    assert_eq!(alice.remove(&db).await.expect("first remove"), 1);
    assert_eq!(alice.remove(&db).await.expect("second remove"), 0);

    assert_eq!(alice.id.as_deref(), Some("a1"), "instance is untouched");
    assert!(Account::find(&db, "a1").await.unwrap().is_none());
}

#[tokio::test]
async fn writes_missing_their_row_log_a_warning() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;

    let mut alice = account("a1", "alice@example.com");
    alice.save(&db).await.unwrap();
    assert_eq!(alice.remove(&db).await.unwrap(), 1);
    assert!(
        !logs.contents().contains("WARN"),
        "single-row writes are quiet: {}",
        logs.contents()
    );

    assert_eq!(alice.remove(&db).await.unwrap(), 0);
    assert_eq!(alice.update(&db).await.unwrap(), 0);

    let output = logs.contents();
    assert_eq!(output.matches("WARN").count(), 2, "{output}");
    assert!(output.contains("failed to remove by primary key"), "{output}");
    assert!(output.contains("failed to update by primary key"), "{output}");
    assert!(output.contains("affected=0"), "{output}");
    assert!(output.contains("account"), "{output}");
}

// ── find_all ─────────────────────────────────────────────────────────

async fn seed_accounts(db: &Database) {
    for (i, name) in ["ann", "bob", "cat", "dan", "eve"].into_iter().enumerate() {
        let mut a = account(name, &format!("{name}@example.com"));
        a.logins = Some(i64::try_from(i).unwrap() * 10);
        a.save(db).await.unwrap();
    }
}

#[tokio::test]
async fn find_all_without_fragments_returns_every_row() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;
    assert!(find_all::<Account>(&db, FindAll::new()).await.unwrap().is_empty());

    seed_accounts(&db).await;
    let all = Account::find_all(&db, FindAll::new()).await.unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn blank_filter_returns_every_row() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;
    seed_accounts(&db).await;

    let all = Account::find_all(&db, FindAll::new().filter("", Vec::<Value>::new()).order_by(""))
        .await
        .expect("blank fragments should be skipped");
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn find_all_applies_filter_order_and_limits() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;
    seed_accounts(&db).await;

    let busy = Account::find_all(
        &db,
        FindAll::new()
            .filter("`logins` >= ?", [20_i64])
            .order_by("`logins` desc")
            .limit(Limit::Count(2)),
    )
    .await
    .unwrap();
    let ids: Vec<_> = busy.iter().filter_map(|a| a.id.as_deref()).collect();
    assert_eq!(ids, ["eve", "dan"]);

    let page = Account::find_all(
        &db,
        FindAll::new().order_by("`id`").limit(Limit::range(1, 2)),
    )
    .await
    .unwrap();
    let ids: Vec<_> = page.iter().filter_map(|a| a.id.as_deref()).collect();
    assert_eq!(ids, ["bob", "cat"]);
}

// ── hydration ────────────────────────────────────────────────────────

#[test]
fn hydration_ignores_unmapped_columns() {
    let row: Row = vec![
        ("id".to_string(), Value::from("a1")),
        ("admin".to_string(), Value::Integer(1)),
        ("extra".to_string(), Value::from("ignored")),
    ]
    .into_iter()
    .collect();

    let account = Account::from_row(&row).expect("hydration should succeed");
    assert_eq!(account.id.as_deref(), Some("a1"));
    assert_eq!(account.admin, Some(true));
    assert_eq!(account.email, None);
}

#[tokio::test]
async fn mistyped_column_value_is_a_conversion_error() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = test_db(&dir).await;
    db.execute(
        "insert into `account` (`id`, `logins`) values (?, ?)",
        vec![Value::from("odd"), Value::from("many")],
    )
    .await
    .unwrap();

    match Account::find(&db, "odd").await {
        Err(OrmError::Conversion { field, .. }) => assert_eq!(field, "logins"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn setting_an_undeclared_attribute_is_rejected() {
    let mut account = Account::default();
    match account.set("nickname", Value::from("x")) {
        Err(OrmError::UnknownField { entity, field }) => {
            assert_eq!(entity, "Account");
            assert_eq!(field, "nickname");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

// ── declaration errors ───────────────────────────────────────────────

#[test]
fn ensure_declared_reports_declaration_errors() {
    ensure_declared::<Account>().expect("account declaration is valid");
    assert_eq!(
        ensure_declared::<Keyless>(),
        Err(SchemaError::MissingPrimaryKey {
            table: "keyless".to_string()
        })
    );
}

#[test]
#[should_panic(expected = "invalid entity declaration `Keyless`")]
fn invalid_declaration_panics_on_first_schema_access() {
    let _ = Keyless::schema();
}
