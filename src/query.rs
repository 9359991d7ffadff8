//! Query builders and result cursors.
//!
//! Every builder method returns a new query and leaves the receiver as it
//! was, so earlier builder states stay usable. Query state sits behind an
//! `Arc` and is copied only when a derived query changes it.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::connection::{Connection, RowCursor};
use crate::error::{Result, RowkeepError};
use crate::expression::{Expression, Where};
use crate::list::{List, SharedList};
use crate::meta::MetaInfo;
use crate::model::{Model, Record};
use crate::value::Value;

// ------------- SharedQuery -------------
#[derive(Debug, Clone)]
struct QueryData {
    connection: Option<Connection>,
    meta: &'static MetaInfo,
    filter: Option<Where>,
    fields: Vec<String>,
    order_by: Vec<String>,
    limit: i64,
    func: Option<String>,
}

/// Untyped query over the table of one registered record type.
#[derive(Debug, Clone)]
pub struct SharedQuery {
    d: Arc<QueryData>,
}

impl SharedQuery {
    pub fn for_meta_info(meta: &'static MetaInfo) -> Self {
        Self {
            d: Arc::new(QueryData {
                connection: None,
                meta,
                filter: None,
                fields: Vec::new(),
                order_by: Vec::new(),
                limit: -1,
                func: None,
            }),
        }
    }

    fn derive(&self, change: impl FnOnce(&mut QueryData)) -> Self {
        let mut query = self.clone();
        change(Arc::make_mut(&mut query.d));
        query
    }

    /// Runs the query on `connection` instead of the default connection.
    pub fn with_connection(&self, connection: Connection) -> Self {
        self.derive(|d| d.connection = Some(connection))
    }
    /// Replaces any earlier filter.
    pub fn filter(&self, filter: Where) -> Self {
        self.derive(|d| d.filter = Some(filter))
    }
    /// A negative limit means no limit.
    pub fn limit(&self, limit: i64) -> Self {
        self.derive(|d| d.limit = limit)
    }
    /// Appends an order spec such as `"height desc"`.
    pub fn order_by(&self, spec: &str) -> Self {
        let spec = spec.to_string();
        self.derive(|d| d.order_by.push(spec))
    }
    /// Restricts the projection; an empty list selects every field.
    pub fn select(&self, fields: &[&str]) -> Self {
        let fields = fields.iter().map(|f| f.to_string()).collect();
        self.derive(|d| d.fields = fields)
    }
    fn aggregate(&self, func: &str, fields: &[&str]) -> Self {
        let func = func.to_string();
        let fields = fields.iter().map(|f| f.to_string()).collect();
        self.derive(|d| {
            d.func = Some(func);
            d.fields = fields;
            d.order_by.clear();
            // a limit would apply to the single aggregate row
            d.limit = -1;
        })
    }

    pub fn meta_info(&self) -> &'static MetaInfo {
        self.d.meta
    }
    pub fn connection(&self) -> Option<&Connection> {
        self.d.connection.as_ref()
    }
    pub fn filter_ref(&self) -> Option<&Where> {
        self.d.filter.as_ref()
    }
    pub fn fields(&self) -> &[String] {
        &self.d.fields
    }
    pub fn order_by_list(&self) -> &[String] {
        &self.d.order_by
    }
    pub fn limit_value(&self) -> i64 {
        self.d.limit
    }
    pub fn func(&self) -> Option<&str> {
        self.d.func.as_deref()
    }

    /// The SELECT text this query runs.
    pub fn sql(&self) -> Result<String> {
        self.resolve_connection()?.with_statement(|statement| statement.select(self))?
    }

    fn resolve_connection(&self) -> Result<Connection> {
        Connection::resolve(self.d.connection.as_ref())
    }

    fn bindings(&self) -> Vec<(String, Value)> {
        self.d
            .filter
            .as_ref()
            .map_or_else(Vec::new, |filter| Expression::new(filter).bindings())
    }

    fn run_select(&self) -> Result<RowCursor> {
        let connection = self.resolve_connection()?;
        let sql = connection.with_statement(|statement| statement.select(self))??;
        connection.execute(&sql, &self.bindings())
    }

    pub fn exec(&self) -> Result<SharedCursor> {
        let rows = self.run_select()?;
        debug!(table = self.d.meta.name(), rows = rows.len(), "query returned");
        Ok(SharedCursor::new(self.d.meta, rows))
    }

    /// Materialises every matching row, in the order the engine returns them.
    pub fn all(&self) -> Result<SharedList> {
        let mut cursor = self.exec()?;
        let mut list = SharedList::with_meta_info(self.d.meta);
        while cursor.next() {
            list.append(cursor.record()?);
        }
        Ok(list)
    }

    /// Number of matching rows. Ordering and limit are not applied.
    pub fn count(&self) -> Result<i64> {
        let value = self.aggregate("count", &[]).scalar()?;
        value
            .as_i64()
            .ok_or_else(|| RowkeepError::Driver(format!("count returned {}", value)))
    }

    /// Runs an aggregate such as `sum` or `avg` over `fields` and returns its
    /// result. Aggregates over no rows follow the engine, e.g. `sum` is null.
    pub fn call(&self, func: &str, fields: &[&str]) -> Result<Value> {
        self.aggregate(func, fields).scalar()
    }

    fn scalar(&self) -> Result<Value> {
        let mut rows = self.run_select()?;
        if rows.next() {
            Ok(rows.column_value(0))
        } else {
            Ok(Value::Null)
        }
    }

    /// Deletes every matching row.
    pub fn remove(&self) -> Result<()> {
        let connection = self.resolve_connection()?;
        let sql = connection.with_statement(|statement| statement.delete_from(self))??;
        connection.execute(&sql, &self.bindings())?;
        Ok(())
    }
}

// ------------- SharedCursor -------------
/// Rows of one executed query, read one at a time.
pub struct SharedCursor {
    meta: &'static MetaInfo,
    rows: RowCursor,
    // field index per result column, None for columns the record lacks
    mapping: Vec<Option<usize>>,
}

impl SharedCursor {
    fn new(meta: &'static MetaInfo, rows: RowCursor) -> Self {
        let mapping = rows
            .columns()
            .iter()
            .map(|name| meta.field_by_name(name).map(|f| f.index()))
            .collect();
        Self { meta, rows, mapping }
    }

    pub fn next(&mut self) -> bool {
        self.rows.next()
    }

    pub fn meta_info(&self) -> &'static MetaInfo {
        self.meta
    }

    /// A new record holding the current row.
    pub fn record(&self) -> Result<Box<dyn Record>> {
        let mut record = self.meta.create();
        if self.fill(&mut *record) {
            Ok(record)
        } else {
            Err(RowkeepError::Schema(format!(
                "row of '{}' does not fit the declared field types",
                self.meta.name()
            )))
        }
    }

    /// Writes the projected columns of the current row into `record`. Returns
    /// false, leaving `record` untouched, when a value cannot be converted or
    /// `record` is of another type.
    pub fn record_to(&self, record: &mut dyn Record) -> bool {
        if !self.meta.is_type_of(record) {
            return false;
        }
        let mut staged = self.meta.create();
        if !self.fill(&mut *staged) {
            return false;
        }
        for index in self.mapping.iter().flatten() {
            let value = match staged.column(*index) {
                Some(column) => column.column_value(false),
                None => continue,
            };
            if let Some(column) = record.column_mut(*index) {
                column.set_column_value(value);
            }
        }
        true
    }

    fn fill(&self, record: &mut dyn Record) -> bool {
        for (position, index) in self.mapping.iter().enumerate() {
            if let Some(index) = index {
                let value = self.rows.column_value(position);
                let written = record
                    .column_mut(*index)
                    .is_some_and(|column| column.set_column_value(value));
                if !written {
                    return false;
                }
            }
        }
        true
    }
}

impl fmt::Debug for SharedCursor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SharedCursor")
            .field("table", &self.meta.name())
            .field("rows", &self.rows.len())
            .finish()
    }
}

// ------------- Typed wrappers -------------
/// Query over the table of `M`.
pub struct Query<M: Model> {
    shared: SharedQuery,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Query<M> {
    pub fn new() -> Self {
        Self::from_shared(SharedQuery::for_meta_info(M::meta_info()))
    }
    fn from_shared(shared: SharedQuery) -> Self {
        Self {
            shared,
            _model: PhantomData,
        }
    }
    pub fn with_connection(&self, connection: Connection) -> Self {
        Self::from_shared(self.shared.with_connection(connection))
    }
    pub fn filter(&self, filter: Where) -> Self {
        Self::from_shared(self.shared.filter(filter))
    }
    pub fn limit(&self, limit: i64) -> Self {
        Self::from_shared(self.shared.limit(limit))
    }
    pub fn order_by(&self, spec: &str) -> Self {
        Self::from_shared(self.shared.order_by(spec))
    }
    pub fn select(&self, fields: &[&str]) -> Self {
        Self::from_shared(self.shared.select(fields))
    }
    pub fn shared(&self) -> &SharedQuery {
        &self.shared
    }
    pub fn sql(&self) -> Result<String> {
        self.shared.sql()
    }
    pub fn exec(&self) -> Result<Cursor<M>> {
        Ok(Cursor {
            shared: self.shared.exec()?,
            _model: PhantomData,
        })
    }
    pub fn all(&self) -> Result<List<M>> {
        List::try_from(self.shared.all()?)
    }
    pub fn count(&self) -> Result<i64> {
        self.shared.count()
    }
    pub fn call(&self, func: &str, fields: &[&str]) -> Result<Value> {
        self.shared.call(func, fields)
    }
    pub fn remove(&self) -> Result<()> {
        self.shared.remove()
    }
}

impl<M: Model> Default for Query<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Query<M> {
    fn clone(&self) -> Self {
        Self::from_shared(self.shared.clone())
    }
}

impl<M: Model> fmt::Debug for Query<M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.shared, f)
    }
}

impl<M: Model> From<Query<M>> for SharedQuery {
    fn from(query: Query<M>) -> Self {
        query.shared
    }
}

pub struct Cursor<M: Model> {
    shared: SharedCursor,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Cursor<M> {
    pub fn next(&mut self) -> bool {
        self.shared.next()
    }
    pub fn record(&self) -> Result<M> {
        let mut record = M::default();
        if self.shared.record_to(&mut record) {
            Ok(record)
        } else {
            Err(RowkeepError::Schema(format!(
                "row of '{}' does not fit the declared field types",
                M::TABLE
            )))
        }
    }
    pub fn record_to(&self, record: &mut M) -> bool {
        self.shared.record_to(record)
    }
}

impl<M: Model> fmt::Debug for Cursor<M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.shared, f)
    }
}
