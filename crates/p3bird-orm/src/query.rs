//! Caller-supplied fragments for [`find_all`](crate::crud::find_all).

use std::str::FromStr;

use p3bird_db::Value;

use crate::error::OrmError;

/// Row window appended as a `limit` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// `limit ?` with one argument.
    Count(u32),
    /// `limit ?, ?` with arguments `offset, count`.
    Range { offset: u32, count: u32 },
}

impl Limit {
    /// Window of `count` rows starting after `offset` rows.
    pub fn range(offset: u32, count: u32) -> Self {
        Self::Range { offset, count }
    }

    fn clause(self) -> &'static str {
        match self {
            Self::Count(_) => "limit ?",
            Self::Range { .. } => "limit ?, ?",
        }
    }

    fn args(self) -> Vec<Value> {
        match self {
            Self::Count(count) => vec![Value::from(count)],
            Self::Range { offset, count } => vec![Value::from(offset), Value::from(count)],
        }
    }
}

/// Parses `"count"` or `"offset, count"`.
///
/// Anything else, including negative numbers and more than two parts, is
/// an [`OrmError::InvalidLimit`].
impl FromStr for Limit {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OrmError::InvalidLimit(s.to_string());
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();

        match parts.as_slice() {
            [count] => count.parse().map(Self::Count).map_err(|_| invalid()),
            [offset, count] => {
                let offset = offset.parse().map_err(|_| invalid())?;
                let count = count.parse().map_err(|_| invalid())?;
                Ok(Self::Range { offset, count })
            }
            _ => Err(invalid()),
        }
    }
}

/// `where` / `order by` / `limit` fragments for a multi-row select.
///
/// Fragments are inserted verbatim; only `args` and the limit values are
/// bound as parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindAll {
    where_clause: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl FindAll {
    /// An empty query: every row, in store order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `where` clause and the arguments for its placeholders.
    pub fn filter<I, V>(mut self, clause: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_clause = Some(clause.into());
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `order by` fragment.
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// Sets the row window.
    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Appends the fragments to `select` and collects the bound arguments,
    /// `where` arguments first and limit arguments last. Blank `where` and
    /// `order by` fragments are skipped.
    pub fn to_sql(&self, select: &str) -> (String, Vec<Value>) {
        let mut sql = vec![select.to_string()];
        let mut args = self.args.clone();

        let non_blank = |fragment: &&String| !fragment.trim().is_empty();
        if let Some(clause) = self.where_clause.as_ref().filter(non_blank) {
            sql.push("where".to_string());
            sql.push(clause.clone());
        }
        if let Some(order_by) = self.order_by.as_ref().filter(non_blank) {
            sql.push("order by".to_string());
            sql.push(order_by.clone());
        }
        if let Some(limit) = self.limit {
            sql.push(limit.clause().to_string());
            args.extend(limit.args());
        }

        (sql.join(" "), args)
    }
}
