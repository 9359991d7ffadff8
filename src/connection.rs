//! Connections to the storage engine.
//!
//! A [`Connection`] is a cloneable handle around a [`Driver`]. The first
//! connection opened in a process becomes the default connection, used by
//! every operation that is not handed a connection explicitly, until it is
//! closed.

use std::fmt;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use lazy_static::lazy_static;
use tracing::{debug, info};

use crate::error::{Result, RowkeepError};
use crate::meta::MetaInfo;
use crate::model::{Model, save_record};
use crate::persist::SqliteDriver;
use crate::settings::Settings;
use crate::statement::{Index, SqlStatement};
use crate::value::Value;

// ------------- Driver -------------
/// The storage engine boundary.
pub trait Driver: Send {
    /// Runs one statement. Arguments are bound by name, without the colon.
    fn execute(&mut self, sql: &str, arguments: &[(String, Value)]) -> Result<RowCursor>;
    fn last_insert_id(&self) -> i64;
    fn table_exists(&mut self, table: &str) -> Result<bool>;
    fn drop_table(&mut self, table: &str) -> Result<()>;
    fn statement(&self) -> &dyn SqlStatement;
}

/// Rows returned by a driver, buffered in result order.
#[derive(Debug, Clone, Default)]
pub struct RowCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
}

impl RowCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            position: None,
        }
    }
    /// Moves to the next row; false once the rows are exhausted.
    pub fn next(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.rows.len());
            false
        }
    }
    /// Value of column `index` in the current row, null when out of range.
    pub fn column_value(&self, index: usize) -> Value {
        self.position
            .and_then(|p| self.rows.get(p))
            .and_then(|row| row.get(index))
            .cloned()
            .unwrap_or_default()
    }
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ------------- Connection -------------
struct ConnectionData {
    driver: Mutex<Option<Box<dyn Driver>>>,
    models: Mutex<Vec<&'static MetaInfo>>,
}

#[derive(Clone)]
pub struct Connection {
    d: Arc<ConnectionData>,
}

lazy_static! {
    static ref DEFAULT_CONNECTION: RwLock<Option<Connection>> = RwLock::new(None);
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|e| RowkeepError::Lock(e.to_string()))
}

impl Connection {
    /// Wraps `driver`. Becomes the default connection when none is open.
    pub fn open<D: Driver + 'static>(driver: D) -> Connection {
        let connection = Connection {
            d: Arc::new(ConnectionData {
                driver: Mutex::new(Some(Box::new(driver))),
                models: Mutex::new(Vec::new()),
            }),
        };
        let mut default = DEFAULT_CONNECTION.write().unwrap_or_else(PoisonError::into_inner);
        if default.is_none() {
            *default = Some(connection.clone());
            info!("opened default connection");
        } else {
            info!("opened connection");
        }
        connection
    }

    /// Opens a SQLite database in memory.
    pub fn open_in_memory() -> Result<Connection> {
        Ok(Connection::open(SqliteDriver::open_in_memory()?))
    }

    /// Opens the SQLite database named by `settings`.
    pub fn open_with_settings(settings: &Settings) -> Result<Connection> {
        let connection = Connection::open(SqliteDriver::open(&settings.database)?);
        if settings.foreign_keys {
            connection.execute("PRAGMA foreign_keys = ON;", &[])?;
        }
        Ok(connection)
    }

    /// Releases the driver. Closing the default connection leaves the
    /// process without one.
    pub fn close(&self) -> Result<()> {
        lock(&self.d.driver)?.take();
        let mut default = DEFAULT_CONNECTION.write().unwrap_or_else(PoisonError::into_inner);
        if default.as_ref().is_some_and(|c| c.same(self)) {
            *default = None;
            info!("closed default connection");
        } else {
            info!("closed connection");
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        lock(&self.d.driver).is_ok_and(|driver| driver.is_some())
    }

    fn same(&self, other: &Connection) -> bool {
        ptr::eq(Arc::as_ptr(&self.d), Arc::as_ptr(&other.d))
    }

    pub fn default_connection() -> Option<Connection> {
        DEFAULT_CONNECTION
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `connection` itself, or the default connection when none is given.
    pub fn resolve(connection: Option<&Connection>) -> Result<Connection> {
        match connection {
            Some(connection) => Ok(connection.clone()),
            None => Connection::default_connection().ok_or(RowkeepError::NoConnection),
        }
    }

    fn with_driver<T>(&self, f: impl FnOnce(&mut dyn Driver) -> Result<T>) -> Result<T> {
        let mut driver = lock(&self.d.driver)?;
        match driver.as_mut() {
            Some(driver) => f(&mut **driver),
            None => Err(RowkeepError::NoConnection),
        }
    }

    /// Runs `f` with the statement generator of the driver's dialect.
    pub fn with_statement<T>(&self, f: impl FnOnce(&dyn SqlStatement) -> T) -> Result<T> {
        self.with_driver(|driver| Ok(f(driver.statement())))
    }

    pub fn execute(&self, sql: &str, arguments: &[(String, Value)]) -> Result<RowCursor> {
        debug!(sql, arguments = arguments.len(), "execute");
        self.with_driver(|driver| driver.execute(sql, arguments))
    }

    /// Runs an INSERT and returns the row id it created. The id is read while
    /// the driver is still held, so inserts through other clones of this
    /// connection cannot interleave.
    pub fn insert(&self, sql: &str, arguments: &[(String, Value)]) -> Result<i64> {
        debug!(sql, arguments = arguments.len(), "insert");
        self.with_driver(|driver| {
            driver.execute(sql, arguments)?;
            Ok(driver.last_insert_id())
        })
    }

    pub fn last_insert_id(&self) -> Result<i64> {
        self.with_driver(|driver| Ok(driver.last_insert_id()))
    }

    // ------------- Schema -------------
    /// Registers `M` for [`create_tables`](Self::create_tables) and
    /// [`drop_tables`](Self::drop_tables). False when already registered.
    pub fn add_model<M: Model>(&self) -> Result<bool> {
        let meta = M::meta_info();
        let mut models = lock(&self.d.models)?;
        if models.iter().any(|m| ptr::eq(*m, meta)) {
            return Ok(false);
        }
        models.push(meta);
        Ok(true)
    }

    pub fn models(&self) -> Result<Vec<&'static MetaInfo>> {
        Ok(lock(&self.d.models)?.clone())
    }

    pub fn create_tables(&self) -> Result<()> {
        for meta in self.models()? {
            self.create_table_for(meta)?;
        }
        Ok(())
    }

    pub fn drop_tables(&self) -> Result<()> {
        for meta in self.models()?.into_iter().rev() {
            self.drop_table(meta)?;
        }
        Ok(())
    }

    pub fn create_table_if_not_exists<M: Model>(&self) -> Result<bool> {
        self.create_table_for(M::meta_info())
    }

    /// Creates the table of `meta` unless it exists. A freshly created table
    /// receives the type's initial data. Returns true when it was created.
    pub fn create_table_for(&self, meta: &'static MetaInfo) -> Result<bool> {
        if self.exists(meta)? {
            return Ok(false);
        }
        let sql = self.with_statement(|statement| statement.create_table_if_not_exists(meta))?;
        self.execute(&sql, &[])?;
        let mut seeded = 0;
        for mut record in meta.initial_data() {
            save_record(self, &mut *record, false, false)?;
            seeded += 1;
        }
        info!(table = meta.name(), seeded, "created table");
        Ok(true)
    }

    pub fn exists(&self, meta: &MetaInfo) -> Result<bool> {
        self.with_driver(|driver| driver.table_exists(meta.name()))
    }

    pub fn drop_table(&self, meta: &MetaInfo) -> Result<()> {
        self.with_driver(|driver| driver.drop_table(meta.name()))?;
        info!(table = meta.name(), "dropped table");
        Ok(())
    }

    pub fn create_index_if_not_exists(&self, index: &Index) -> Result<()> {
        let meta = index.meta_info();
        if index.columns().is_empty() {
            return Err(RowkeepError::QueryBuild(format!("index '{}' has no columns", index.name())));
        }
        if let Some(column) = index.columns().iter().find(|c| meta.field_by_name(c).is_none()) {
            return Err(RowkeepError::QueryBuild(format!(
                "index '{}' names unknown field '{}' of '{}'",
                index.name(),
                column,
                meta.name()
            )));
        }
        let sql = self.with_statement(|statement| statement.create_index_if_not_exists(index))?;
        self.execute(&sql, &[])?;
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let open = self.d.driver.try_lock().map(|driver| driver.is_some());
        f.debug_struct("Connection").field("open", &open.ok()).finish()
    }
}
