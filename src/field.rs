//! Field cells composed into every record.
//!
//! Every field kind keeps its state behind an `Arc`. Cloning a record therefore
//! only bumps reference counts; the first mutation of a shared cell detaches it
//! (`Arc::make_mut`) so sibling copies never observe the change.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::clause::{Clause, Flag};
use crate::connection::Connection;
use crate::error::{Result, RowkeepError};
use crate::expression::Where;
use crate::model::Model;
use crate::value::{FieldType, Value, ValueType};

/// Object safe access to one field of a record, used by the registry and the
/// query layer to read and write columns by position.
pub trait Column: fmt::Debug + Send + Sync {
    fn value_type(&self) -> ValueType;
    fn clause(&self) -> Clause;
    /// The current value; with `convert` the storage form is returned.
    fn column_value(&self, convert: bool) -> Value;
    /// Coerces and stores `value`. Leaves the field untouched on failure.
    fn set_column_value(&mut self, value: Value) -> bool;
    fn clear_column(&mut self);
    fn mark_clean(&mut self);
}

/// Construction of a blank field carrying its declared clause.
pub trait Declare: Sized {
    fn declare(clause: Clause) -> Self;
}

// ------------- Field -------------
#[derive(Debug, Clone)]
struct FieldData<T> {
    value: Option<T>,
    clause: Clause,
    loaded: bool,
    dirty: bool,
}

#[derive(Debug, Clone)]
pub struct Field<T: FieldType> {
    d: Arc<FieldData<T>>,
}

impl<T: FieldType> Field<T> {
    pub fn new() -> Self {
        Self::with_clause(Clause::new())
    }
    pub fn with_clause(clause: Clause) -> Self {
        Self {
            d: Arc::new(FieldData {
                value: None,
                clause,
                loaded: false,
                dirty: false,
            }),
        }
    }
    pub fn value(&self) -> Option<&T> {
        self.d.value.as_ref()
    }
    pub fn get(&self, convert: bool) -> Value {
        let value = self.d.value.as_ref().map_or(Value::Null, FieldType::to_value);
        if convert { value.into_storage() } else { value }
    }
    pub fn set<V: Into<Value>>(&mut self, value: V) -> bool {
        let value = value.into();
        let typed = if value.is_null() {
            None
        } else {
            match T::from_value(value) {
                Some(typed) => Some(typed),
                None => return false,
            }
        };
        let d = self.detached();
        d.value = typed;
        d.dirty = true;
        d.loaded = true;
        true
    }
    /// Typed assignment, which cannot fail.
    pub fn assign(&mut self, value: T) {
        let d = self.detached();
        d.value = Some(value);
        d.dirty = true;
        d.loaded = true;
    }
    /// Releases the value; the clause is kept.
    pub fn clear(&mut self) {
        let d = self.detached();
        d.value = None;
        d.dirty = false;
        d.loaded = false;
    }
    /// Makes the underlying storage private to this field.
    pub fn detach(&mut self) {
        Arc::make_mut(&mut self.d);
    }
    fn detached(&mut self) -> &mut FieldData<T> {
        Arc::make_mut(&mut self.d)
    }
    pub fn is_null(&self) -> bool {
        self.d.value.is_none()
    }
    pub fn is_dirty(&self) -> bool {
        self.d.dirty
    }
    pub fn is_loaded(&self) -> bool {
        self.d.loaded
    }
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.d) > 1
    }
    pub fn clause(&self) -> &Clause {
        &self.d.clause
    }
}

impl Field<String> {
    pub fn as_str(&self) -> Option<&str> {
        self.d.value.as_deref()
    }
}

impl<T: FieldType> Default for Field<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FieldType> PartialEq for Field<T> {
    fn eq(&self, other: &Self) -> bool {
        self.d.value == other.d.value
    }
}

impl PartialEq<&str> for Field<String> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl<T: FieldType> Declare for Field<T> {
    fn declare(clause: Clause) -> Self {
        Self::with_clause(clause)
    }
}

impl<T: FieldType> Column for Field<T> {
    fn value_type(&self) -> ValueType {
        T::VALUE_TYPE
    }
    fn clause(&self) -> Clause {
        self.d.clause.clone()
    }
    fn column_value(&self, convert: bool) -> Value {
        self.get(convert)
    }
    fn set_column_value(&mut self, value: Value) -> bool {
        self.set(value)
    }
    fn clear_column(&mut self) {
        self.clear()
    }
    fn mark_clean(&mut self) {
        if self.d.dirty {
            self.detached().dirty = false;
        }
    }
}

// ------------- PrimaryKey -------------
/// Integer identity column, rendered as `PRIMARY KEY AUTOINCREMENT`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKey(Field<i64>);

impl PrimaryKey {
    pub fn declared_clause() -> Clause {
        Clause::primary_key() | Flag::Autoincrement
    }
    pub fn id(&self) -> Option<i64> {
        self.0.value().copied()
    }
}

impl Default for PrimaryKey {
    fn default() -> Self {
        Self(Field::with_clause(Self::declared_clause()))
    }
}

impl std::ops::Deref for PrimaryKey {
    type Target = Field<i64>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for PrimaryKey {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Declare for PrimaryKey {
    fn declare(clause: Clause) -> Self {
        Self(Field::with_clause(Self::declared_clause() | clause))
    }
}

impl Column for PrimaryKey {
    fn value_type(&self) -> ValueType {
        ValueType::Integer
    }
    fn clause(&self) -> Clause {
        self.0.clause().clone()
    }
    fn column_value(&self, convert: bool) -> Value {
        self.0.get(convert)
    }
    fn set_column_value(&mut self, value: Value) -> bool {
        self.0.set(value)
    }
    fn clear_column(&mut self) {
        self.0.clear()
    }
    fn mark_clean(&mut self) {
        self.0.mark_clean()
    }
}

// ------------- ForeignKey -------------
#[derive(Debug, Clone)]
enum Reference<M> {
    Unresolved(Option<i64>),
    Resolved(Box<M>),
}

#[derive(Debug, Clone)]
struct ForeignKeyData<M> {
    reference: Reference<M>,
    clause: Clause,
    dirty: bool,
}

/// Integer column referencing the primary key of `M`.
///
/// Rows read from storage only carry the key. The related record is fetched
/// on the first [`ForeignKey::resolve`] and cached afterwards.
#[derive(Debug, Clone)]
pub struct ForeignKey<M: Model> {
    d: Arc<ForeignKeyData<M>>,
}

impl<M: Model> ForeignKey<M> {
    pub fn new() -> Self {
        Self::declare(Clause::new())
    }
    pub fn key(&self) -> Option<i64> {
        match &self.d.reference {
            Reference::Unresolved(key) => *key,
            Reference::Resolved(record) => {
                let primary_key = M::meta_info().primary_key()?;
                M::meta_info()
                    .value(&**record, primary_key.name())
                    .and_then(|v| v.as_i64())
            }
        }
    }
    pub fn is_loaded(&self) -> bool {
        matches!(self.d.reference, Reference::Resolved(_))
    }
    pub fn is_null(&self) -> bool {
        self.key().is_none()
    }
    pub fn get(&self) -> Option<&M> {
        match &self.d.reference {
            Reference::Resolved(record) => Some(record),
            Reference::Unresolved(_) => None,
        }
    }
    pub fn set_record(&mut self, record: M) {
        let d = Arc::make_mut(&mut self.d);
        d.reference = Reference::Resolved(Box::new(record));
        d.dirty = true;
    }
    pub fn set_key(&mut self, key: Option<i64>) {
        let d = Arc::make_mut(&mut self.d);
        d.reference = Reference::Unresolved(key);
        d.dirty = true;
    }
    pub fn clear(&mut self) {
        let d = Arc::make_mut(&mut self.d);
        d.reference = Reference::Unresolved(None);
        d.dirty = false;
    }

    /// Returns the related record, fetching it through the default connection
    /// when it has not been loaded yet.
    pub fn resolve(&mut self) -> Result<&M> {
        let connection = Connection::resolve(None)?;
        self.resolve_with(&connection)
    }

    pub fn resolve_with(&mut self, connection: &Connection) -> Result<&M> {
        let pending = match &self.d.reference {
            Reference::Unresolved(key) => Some(*key),
            Reference::Resolved(_) => None,
        };
        if let Some(key) = pending {
            let key = key.ok_or_else(|| {
                RowkeepError::NotFound(format!("null reference to '{}'", M::TABLE))
            })?;
            let primary_key = M::meta_info().primary_key().ok_or_else(|| {
                RowkeepError::Schema(format!("'{}' has no primary key", M::TABLE))
            })?;
            let mut record = M::default();
            let found = record.load_with(connection, Where::with_op(primary_key.name(), "=", key))?;
            if !found {
                warn!(table = M::TABLE, key, "foreign key does not resolve");
                return Err(RowkeepError::NotFound(format!(
                    "no '{}' row with {} = {}",
                    M::TABLE,
                    primary_key.name(),
                    key
                )));
            }
            Arc::make_mut(&mut self.d).reference = Reference::Resolved(Box::new(record));
        }
        self.get().ok_or_else(|| {
            RowkeepError::NotFound(format!("unresolved reference to '{}'", M::TABLE))
        })
    }
}

impl<M: Model> Default for ForeignKey<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> From<M> for ForeignKey<M> {
    fn from(record: M) -> Self {
        let mut key = Self::new();
        key.set_record(record);
        key
    }
}

impl<M: Model> Declare for ForeignKey<M> {
    fn declare(clause: Clause) -> Self {
        Self {
            d: Arc::new(ForeignKeyData {
                reference: Reference::Unresolved(None),
                clause,
                dirty: false,
            }),
        }
    }
}

impl<M: Model> Column for ForeignKey<M> {
    fn value_type(&self) -> ValueType {
        ValueType::Integer
    }
    fn clause(&self) -> Clause {
        // the target descriptor is looked up lazily so that declaring a blank
        // record never touches the registry
        let key = Clause::foreign_key(M::meta_info()) | Flag::NotNull;
        let extra = self.d.clause.clone();
        match key.clone().try_union(extra.clone()) {
            Ok(clause) => clause,
            Err(e) => {
                warn!(target_table = M::TABLE, error = %e, "payload on a foreign key ignored");
                key | extra.without_payload()
            }
        }
    }
    fn column_value(&self, _convert: bool) -> Value {
        self.key().map_or(Value::Null, Value::Integer)
    }
    fn set_column_value(&mut self, value: Value) -> bool {
        match value.coerce(ValueType::Integer) {
            Some(Value::Integer(key)) => {
                self.set_key(Some(key));
                true
            }
            Some(Value::Null) => {
                self.set_key(None);
                true
            }
            _ => false,
        }
    }
    fn clear_column(&mut self) {
        self.clear()
    }
    fn mark_clean(&mut self) {
        if self.d.dirty {
            Arc::make_mut(&mut self.d).dirty = false;
        }
    }
}
