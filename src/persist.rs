// used for persistence
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::trace;

use crate::connection::{Driver, RowCursor};
use crate::error::Result;
use crate::statement::{SqlStatement, SqliteStatement};
use crate::value::Value;

/// [`Driver`] over a SQLite database.
pub struct SqliteDriver {
    db: Connection,
    statement: SqliteStatement,
}

impl SqliteDriver {
    pub fn open(path: &str) -> Result<SqliteDriver> {
        if path == ":memory:" {
            return Self::open_in_memory();
        }
        Self::configured(Connection::open(path)?)
    }
    pub fn open_in_memory() -> Result<SqliteDriver> {
        Self::configured(Connection::open_in_memory()?)
    }
    // the bundled engine enforces foreign keys unless told otherwise
    fn configured(db: Connection) -> Result<SqliteDriver> {
        db.execute_batch("PRAGMA foreign_keys = OFF;")?;
        Ok(Self::from_connection(db))
    }
    /// Wraps an already opened database as is.
    pub fn from_connection(db: Connection) -> SqliteDriver {
        SqliteDriver {
            db,
            statement: SqliteStatement,
        }
    }
}

impl Driver for SqliteDriver {
    fn execute(&mut self, sql: &str, arguments: &[(String, Value)]) -> Result<RowCursor> {
        let mut statement = self.db.prepare(sql)?;
        let names: Vec<String> = arguments.iter().map(|(name, _)| format!(":{}", name)).collect();
        let bound: Vec<(&str, &dyn ToSql)> = names
            .iter()
            .zip(arguments)
            .map(|(name, (_, value))| (name.as_str(), value as &dyn ToSql))
            .collect();
        let columns: Vec<String> = statement.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut rows = statement.query(bound.as_slice())?;
        let mut buffered = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(Value::from(row.get_ref(i)?));
            }
            buffered.push(values);
        }
        trace!(rows = buffered.len(), "buffered");
        Ok(RowCursor::new(columns, buffered))
    }

    fn last_insert_id(&self) -> i64 {
        self.db.last_insert_rowid()
    }

    fn table_exists(&mut self, table: &str) -> Result<bool> {
        let found = self
            .db
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn drop_table(&mut self, table: &str) -> Result<()> {
        self.db.execute(&self.statement.drop_table(table), [])?;
        Ok(())
    }

    fn statement(&self) -> &dyn SqlStatement {
        &self.statement
    }
}
