//! Connection pool configuration and creation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;

use crate::error::PoolError;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u64 = 5_000;

/// `db` value that selects an in-memory database.
const MEMORY_DB: &str = ":memory:";

/// Distinguishes the in-memory databases of independent pools.
static MEMORY_DB_SEQ: AtomicU64 = AtomicU64::new(0);

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Recognized connection pool options.
///
/// `user`, `password`, and `db` are required; everything else has a default.
/// The SQLite backend opens `db` as a file path (or `:memory:`); `host`,
/// `port`, `user`, and `password` address a network store and are carried
/// so one configuration shape serves every backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PoolConfig {
    /// Database host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Database port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database user.
    pub user: String,

    /// Database password. Never logged.
    pub password: String,

    /// Database name. For SQLite, the path of the database file, or
    /// `:memory:` for a database that lives as long as the pool.
    pub db: String,

    /// Connection character set.
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Whether each statement commits on its own.
    #[serde(default = "default_autocommit")]
    pub autocommit: bool,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_size")]
    pub max_size: u32,

    /// Minimum number of idle connections kept open.
    #[serde(default = "default_min_size")]
    pub min_size: u32,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8".to_string()
}

fn default_autocommit() -> bool {
    true
}

fn default_max_size() -> u32 {
    10
}

fn default_min_size() -> u32 {
    1
}

impl PoolConfig {
    /// Creates a configuration from the required options, with every other
    /// option at its default.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        db: impl Into<String>,
    ) -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: user.into(),
            password: password.into(),
            db: db.into(),
            charset: default_charset(),
            autocommit: default_autocommit(),
            max_size: default_max_size(),
            min_size: default_min_size(),
        }
    }
}

/// Shared handle to the connection pool.
///
/// Cloning is cheap; all clones share the same pool. The pool closes once
/// the last handle is dropped.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Held open for an in-memory database, which SQLite discards as soon
    /// as its last connection closes.
    memory_anchor: Option<Arc<Mutex<Connection>>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.pool.state();
        f.debug_struct("Database")
            .field("max_size", &self.pool.max_size())
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .field("in_memory", &self.memory_anchor.is_some())
            .finish()
    }
}

impl Database {
    /// Wraps an already-built pool.
    pub fn from_pool(pool: DbPool) -> Self {
        Self {
            pool,
            memory_anchor: None,
        }
    }

    /// The underlying r2d2 pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Maps a connection charset name to the SQLite encoding pragma value.
fn sqlite_encoding(charset: &str) -> Result<&'static str, PoolError> {
    match charset.to_ascii_lowercase().as_str() {
        "utf8" | "utf-8" | "utf8mb4" => Ok("UTF-8"),
        "utf16" | "utf-16" => Ok("UTF-16"),
        "utf16le" | "utf-16le" => Ok("UTF-16le"),
        "utf16be" | "utf-16be" => Ok("UTF-16be"),
        _ => Err(PoolError::UnsupportedCharset(charset.to_string())),
    }
}

/// Creates the connection pool described by `config`.
///
/// Blocks until `min_size` connections are open. Each connection is opened
/// in WAL mode with foreign keys enabled and the configured encoding.
/// Calling this again builds a new, independent pool.
///
/// With `db = ":memory:"` every pooled connection shares one private
/// in-memory database, which lives until the last handle is dropped. Its
/// connections share a cache with table-level locks, so the pool is capped
/// at one connection and statements run one at a time.
///
/// # Errors
///
/// Returns `PoolError::InvalidSize` if `max_size` is zero or smaller than
/// `min_size`, `PoolError::UnsupportedCharset` or
/// `PoolError::AutocommitUnsupported` for options the SQLite backend cannot
/// honor, and `PoolError::PoolInit` if the initial connections cannot be
/// opened.
pub fn create_pool(config: &PoolConfig) -> Result<Database, PoolError> {
    if config.max_size == 0 || config.min_size > config.max_size {
        return Err(PoolError::InvalidSize {
            min_size: config.min_size,
            max_size: config.max_size,
        });
    }
    if !config.autocommit {
        return Err(PoolError::AutocommitUnsupported);
    }
    let encoding = sqlite_encoding(&config.charset)?;

    let in_memory = config.db == MEMORY_DB;
    let (max_size, min_size) = if in_memory {
        (1, config.min_size.min(1))
    } else {
        (config.max_size, config.min_size)
    };

    tracing::info!(
        host = %config.host,
        port = config.port,
        user = %config.user,
        db = %config.db,
        min_size,
        max_size,
        "creating database connection pool"
    );
    if in_memory && config.max_size > 1 {
        tracing::warn!(
            requested = config.max_size,
            "in-memory database is limited to one pooled connection"
        );
    }

    let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let (path, memory_anchor) = if in_memory {
        let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
        let uri = format!(
            "file:p3bird-{}-{seq}?mode=memory&cache=shared",
            std::process::id()
        );
        flags |= OpenFlags::SQLITE_OPEN_URI;
        let anchor = Connection::open_with_flags(&uri, flags)?;
        (uri, Some(Arc::new(Mutex::new(anchor))))
    } else {
        (config.db.clone(), None)
    };

    let manager = SqliteConnectionManager::file(&path)
        .with_flags(flags)
        .with_init(move |conn| {
            // The encoding only takes effect before the database has any
            // content, so it goes first; on an existing file SQLite keeps
            // what it has.
            conn.execute_batch(&format!("PRAGMA encoding = '{encoding}';"))?;

            // Set WAL mode and verify it was accepted. In-memory databases
            // report "memory" which is expected and acceptable.
            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            if journal_mode != "wal" && journal_mode != "memory" {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!("failed to set WAL journal mode, got: {journal_mode}")),
                ));
            }
            conn.execute_batch(&format!(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
            ))
        });

    let pool = Pool::builder()
        .max_size(max_size)
        .min_idle(Some(min_size))
        .build(manager)?;

    Ok(Database {
        pool,
        memory_anchor,
    })
}
