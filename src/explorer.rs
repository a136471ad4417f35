//! Ad hoc queries against a local SQLite database.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde_json::{Map, Number, Value};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PREVIEW_LIMIT: usize = 30;

static BLOCKED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(drop|delete|truncate)\b").unwrap());

pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("Query is required")]
    EmptyQuery,
    #[error("Operation not allowed: {0}")]
    NotAllowed(String),
    #[error("No tables found in database")]
    NoTables,
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Rejects destructive statements before they reach the database.
pub struct QueryGuard;

impl QueryGuard {
    pub fn check(sql: &str) -> Result<(), ExplorerError> {
        if sql.trim().is_empty() {
            return Err(ExplorerError::EmptyQuery);
        }
        if let Some(m) = BLOCKED_REGEX.find(sql) {
            warn!(keyword = m.as_str(), "rejecting query");
            return Err(ExplorerError::NotAllowed(m.as_str().to_uppercase()));
        }
        Ok(())
    }
}

pub struct Explorer {
    conn: Connection,
}

impl Explorer {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExplorerError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Run a guarded query and return every row keyed by column name.
    pub fn run(&self, sql: &str) -> Result<Vec<Row>, ExplorerError> {
        QueryGuard::check(sql)?;
        info!(sql, "running query");
        self.fetch(sql, [])
    }

    /// First rows of the first table in the database.
    pub fn preview(&self, limit: usize) -> Result<(String, Vec<Row>), ExplorerError> {
        let table: Option<String> = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY rowid LIMIT 1")?
            .query_map([], |row| row.get::<_, String>(0))?
            .next()
            .transpose()?;
        let table = table.ok_or(ExplorerError::NoTables)?;

        let sql = format!("SELECT * FROM \"{}\" LIMIT ?", table.replace('"', "\"\""));
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self.fetch(&sql, [limit])?;
        Ok((table, rows))
    }

    fn fetch<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Row>, ExplorerError> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Map::with_capacity(names.len());
            for (idx, name) in names.iter().enumerate() {
                record.insert(name.clone(), to_json(row.get_ref(idx)?));
            }
            out.push(record);
        }
        Ok(out)
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|&byte| Value::from(byte)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::example_queries;
    use crate::sample::SAMPLE_SCHEMA;
    use crate::sql::parse_schema;
    use serde_json::json;

    fn explorer() -> Explorer {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, score REAL, avatar BLOB);
             INSERT INTO users VALUES
               (1, 'ada', 9.5, x'0102'), (2, 'bob', NULL, NULL), (3, 'cy', 1.0, NULL);
             CREATE TABLE logs (id INTEGER, msg TEXT);",
        )
        .unwrap();
        Explorer::from_connection(conn)
    }

    #[test]
    fn test_guard_rejects_destructive_queries() {
        assert!(matches!(
            QueryGuard::check("DROP TABLE users"),
            Err(ExplorerError::NotAllowed(k)) if k == "DROP"
        ));
        assert!(matches!(
            QueryGuard::check("delete from users"),
            Err(ExplorerError::NotAllowed(_))
        ));
        assert!(matches!(QueryGuard::check("Truncate users"), Err(ExplorerError::NotAllowed(_))));
        assert!(matches!(QueryGuard::check("   "), Err(ExplorerError::EmptyQuery)));
        assert!(QueryGuard::check("SELECT deleted_at FROM users").is_ok());
    }

    #[test]
    fn test_run_returns_named_rows() {
        let rows = explorer()
            .run("SELECT id, name, score, avatar FROM users ORDER BY id")
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({"id": 1, "name": "ada", "score": 9.5, "avatar": [1, 2]})
        );
        assert_eq!(rows[1]["score"], Value::Null);
    }

    #[test]
    fn test_run_blocked_query_leaves_data() {
        let explorer = explorer();
        assert!(explorer.run("DELETE FROM users").is_err());
        assert_eq!(explorer.run("SELECT * FROM users").unwrap().len(), 3);
    }

    #[test]
    fn test_run_reports_sqlite_errors() {
        assert!(matches!(
            explorer().run("SELECT * FROM missing"),
            Err(ExplorerError::Sqlite(_))
        ));
    }

    #[test]
    fn test_preview_first_table() {
        let (table, rows) = explorer().preview(2).unwrap();
        assert_eq!(table, "users");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_preview_empty_database() {
        let explorer = Explorer::from_connection(Connection::open_in_memory().unwrap());
        assert!(matches!(
            explorer.preview(DEFAULT_PREVIEW_LIMIT),
            Err(ExplorerError::NoTables)
        ));
    }

    /// Create `ddl` in a fresh database and run every example query for it.
    fn run_examples(ddl: &str) -> usize {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(ddl).unwrap();
        let explorer = Explorer::from_connection(conn);

        let queries = example_queries(&parse_schema(ddl).unwrap());
        for q in &queries {
            if let Err(e) = explorer.run(&q.query) {
                panic!("{} failed: {}", q.query, e);
            }
        }
        queries.len()
    }

    #[test]
    fn test_sample_examples_run() {
        assert_eq!(run_examples(SAMPLE_SCHEMA), 7);
    }

    #[test]
    fn test_examples_with_quoted_names_run() {
        let ddl = r#"
            CREATE TABLE "order items" (
              id INTEGER PRIMARY KEY,
              note TEXT,
              "parent id" INTEGER REFERENCES "order items"(id)
            );
            CREATE TABLE "order" (
              id INTEGER PRIMARY KEY,
              "item id" INTEGER REFERENCES "order items"(id)
            );
            CREATE TABLE [Line-Item] (id INTEGER PRIMARY KEY, `order` INTEGER REFERENCES "order");
        "#;
        // three select-all queries plus three joins
        assert_eq!(run_examples(ddl), 6);
    }
}
