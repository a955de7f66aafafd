//! Statement execution: the `select` and `execute` primitives.
//!
//! Both primitives check out one pooled connection, run one parameterized
//! statement on tokio's blocking pool, and hand the connection back when its
//! guard drops. If the calling future is dropped mid-flight, the blocking task
//! still runs to completion and returns its connection; only the result is
//! discarded.

use rusqlite::{params_from_iter, Connection};

use crate::error::DbError;
use crate::pool::Database;
use crate::value::{Row, Value};

/// Native placeholder syntax of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Anonymous `?`.
    Question,
    /// Numbered `?1`, `?2`, ... as used by SQLite.
    Numbered,
    /// `%s`, as used by MySQL client libraries.
    Format,
}

/// The placeholder style of the SQLite backend.
const NATIVE_STYLE: PlaceholderStyle = PlaceholderStyle::Numbered;

/// Rewrites every generic `?` placeholder in `sql` to `style`.
///
/// Question marks inside quoted literals or identifiers (`'...'`, `"..."`,
/// `` `...` ``) are left alone. Placeholders are numbered in textual order,
/// which is the order arguments must be supplied in.
pub fn rewrite_placeholders(sql: &str, style: PlaceholderStyle) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut index = 0usize;

    for ch in sql.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                out.push(ch);
            }
            None => match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '?' => {
                    index += 1;
                    match style {
                        PlaceholderStyle::Question => out.push('?'),
                        PlaceholderStyle::Numbered => {
                            out.push('?');
                            out.push_str(&index.to_string());
                        }
                        PlaceholderStyle::Format => out.push_str("%s"),
                    }
                }
                _ => out.push(ch),
            },
        }
    }

    out
}

impl Database {
    /// Runs a read statement and returns its rows in order.
    ///
    /// With `limit`, at most that many rows are fetched. The caller suspends
    /// until a pooled connection is free and the statement has finished.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` if no connection could be acquired,
    /// `DbError::Sqlite` if the driver fails, and `DbError::Task` if the
    /// blocking task dies. The connection is released in every case.
    pub async fn select(
        &self,
        sql: &str,
        args: Vec<Value>,
        limit: Option<usize>,
    ) -> Result<Vec<Row>, DbError> {
        tracing::info!(sql, "SQL");
        let native = rewrite_placeholders(sql, NATIVE_STYLE);
        let pool = self.pool().clone();

        let rows = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            query_rows(&conn, &native, &args, limit)
        })
        .await??;

        tracing::info!(rows = rows.len(), "rows returned");
        Ok(rows)
    }

    /// Runs a write statement and returns the number of affected rows.
    ///
    /// No retry is attempted; a failed write is reported to the caller as is.
    ///
    /// # Errors
    ///
    /// Same as [`Database::select`].
    pub async fn execute(&self, sql: &str, args: Vec<Value>) -> Result<usize, DbError> {
        tracing::info!(sql, "SQL");
        let native = rewrite_placeholders(sql, NATIVE_STYLE);
        let pool = self.pool().clone();

        let affected = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let affected = conn.execute(&native, params_from_iter(args.iter()))?;
            Ok::<_, DbError>(affected)
        })
        .await??;

        tracing::debug!(affected, "statement executed");
        Ok(affected)
    }
}

fn query_rows(
    conn: &Connection,
    sql: &str,
    args: &[Value],
    limit: Option<usize>,
) -> Result<Vec<Row>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = stmt.query(params_from_iter(args.iter()))?;
    let mut out = Vec::new();

    while limit.map_or(true, |max| out.len() < max) {
        let Some(row) = rows.next()? else {
            break;
        };
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value: rusqlite::types::Value = row.get(i)?;
            values.push(Value::from(value));
        }
        out.push(Row::new(columns.clone(), values));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_placeholders_follow_textual_order() {
        let sql = "update `user` set `name`=?, `score`=? where `id`=?";
        assert_eq!(
            rewrite_placeholders(sql, PlaceholderStyle::Numbered),
            "update `user` set `name`=?1, `score`=?2 where `id`=?3"
        );
    }

    #[test]
    fn format_placeholders_replace_question_marks() {
        assert_eq!(
            rewrite_placeholders("select * from t limit ?, ?", PlaceholderStyle::Format),
            "select * from t limit %s, %s"
        );
    }

    #[test]
    fn quoted_question_marks_are_not_placeholders() {
        let sql = "select `a?` from t where b = 'why?' and c = ?";
        assert_eq!(
            rewrite_placeholders(sql, PlaceholderStyle::Numbered),
            "select `a?` from t where b = 'why?' and c = ?1"
        );
        assert_eq!(rewrite_placeholders(sql, PlaceholderStyle::Question), sql);
    }
}
