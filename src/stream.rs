//! Positional reading and writing of record fields.
//!
//! Both [`RecordStream`] and [`ListWriter`] walk the fields of a record in
//! declaration order, skipping the primary key, which the engine assigns.

use crate::error::{Result, RowkeepError};
use crate::list::List;
use crate::meta::MetaInfo;
use crate::model::{Model, Record};
use crate::value::{FieldType, Value};

fn writable_fields(meta: &MetaInfo) -> Vec<usize> {
    meta.fields()
        .iter()
        .filter(|f| !f.is_primary_key())
        .map(|f| f.index())
        .collect()
}

fn write_field(record: &mut dyn Record, index: usize, value: Value) -> Result<()> {
    let meta = record.meta();
    let written = record
        .column_mut(index)
        .is_some_and(|column| column.set_column_value(value.clone()));
    if written {
        Ok(())
    } else {
        let name = meta.at(index).map_or("?", |f| f.name());
        Err(RowkeepError::Schema(format!(
            "{} does not fit '{}.{}'",
            value,
            meta.name(),
            name
        )))
    }
}

// ------------- RecordStream -------------
/// Reads and writes successive fields of one record. The position wraps
/// around to the first field after the last one.
pub struct RecordStream<'a> {
    record: &'a mut dyn Record,
    fields: Vec<usize>,
    current: usize,
}

impl<'a> RecordStream<'a> {
    pub fn new(record: &'a mut dyn Record) -> Self {
        let fields = writable_fields(record.meta());
        Self {
            record,
            fields,
            current: 0,
        }
    }

    pub fn record(&self) -> &dyn Record {
        &*self.record
    }

    /// Position of the next field, counted among the writable fields.
    pub fn current_field(&self) -> usize {
        self.current
    }

    fn advance(&mut self) {
        self.current += 1;
        if self.current >= self.fields.len() {
            self.current = 0;
        }
    }

    pub fn write<V: Into<Value>>(&mut self, value: V) -> Result<&mut Self> {
        let index = *self
            .fields
            .get(self.current)
            .ok_or_else(|| RowkeepError::Schema(format!("'{}' has no writable fields", self.record.meta().name())))?;
        write_field(&mut *self.record, index, value.into())?;
        self.advance();
        Ok(self)
    }

    pub fn read(&mut self) -> Value {
        let value = self
            .fields
            .get(self.current)
            .and_then(|index| self.record.column(*index))
            .map_or(Value::Null, |column| column.column_value(false));
        self.advance();
        value
    }

    /// Reads the next field as `T`; None when it is null or of another type.
    pub fn read_as<T: FieldType>(&mut self) -> Option<T> {
        T::from_value(self.read())
    }
}

// ------------- ListWriter -------------
/// Fills a list with records written field by field. A record is appended
/// once its last field is written, or earlier on [`next`](ListWriter::next).
/// Dropping the writer appends a partially written record.
pub struct ListWriter<'a, M: Model> {
    list: &'a mut List<M>,
    fields: Vec<usize>,
    record: Option<M>,
    current: usize,
}

impl<'a, M: Model> ListWriter<'a, M> {
    pub fn new(list: &'a mut List<M>) -> Self {
        Self {
            list,
            fields: writable_fields(M::meta_info()),
            record: None,
            current: 0,
        }
    }

    pub fn write<V: Into<Value>>(&mut self, value: V) -> Result<&mut Self> {
        let index = *self
            .fields
            .get(self.current)
            .ok_or_else(|| RowkeepError::Schema(format!("'{}' has no writable fields", M::TABLE)))?;
        let record = self.record.get_or_insert_with(M::default);
        write_field(record, index, value.into())?;
        self.current += 1;
        if self.current >= self.fields.len() {
            self.flush();
        }
        Ok(self)
    }

    /// Appends the record being written, if any, and starts a new one.
    pub fn next(&mut self) -> &mut Self {
        self.flush();
        self
    }

    pub fn close(mut self) {
        self.flush();
    }

    fn flush(&mut self) {
        if let Some(record) = self.record.take() {
            self.list.append(record);
        }
        self.current = 0;
    }
}

impl<M: Model> Drop for ListWriter<'_, M> {
    fn drop(&mut self) {
        self.flush();
    }
}
