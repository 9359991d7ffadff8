//! Homogeneous record lists.
//!
//! A list is bound to one record type, either explicitly or by its first
//! element; records of any other type are refused. Like fields, lists share
//! their storage between copies until one of them is changed.

use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{Result, RowkeepError};
use crate::meta::MetaInfo;
use crate::model::{Model, Record, save_record};

// ------------- SharedList -------------
#[derive(Debug, Clone, Default)]
struct ListData {
    records: Vec<Box<dyn Record>>,
    meta: Option<&'static MetaInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct SharedList {
    d: Arc<ListData>,
}

impl SharedList {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_meta_info(meta: &'static MetaInfo) -> Self {
        Self {
            d: Arc::new(ListData {
                records: Vec::new(),
                meta: Some(meta),
            }),
        }
    }
    fn detached(&mut self) -> &mut ListData {
        Arc::make_mut(&mut self.d)
    }

    pub fn len(&self) -> usize {
        self.d.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.d.records.is_empty()
    }
    pub fn at(&self, index: usize) -> Option<&dyn Record> {
        self.d.records.get(index).map(|r| &**r)
    }
    pub fn at_mut(&mut self, index: usize) -> Option<&mut dyn Record> {
        if index >= self.len() {
            return None;
        }
        self.detached().records.get_mut(index).map(|r| &mut **r)
    }
    pub fn last(&self) -> Option<&dyn Record> {
        self.d.records.last().map(|r| &**r)
    }
    pub fn iter(&self) -> impl Iterator<Item = &dyn Record> {
        self.d.records.iter().map(|r| &**r)
    }
    pub fn meta_info(&self) -> Option<&'static MetaInfo> {
        self.d.meta
    }
    /// Binds the list to `meta`. Fails when the list holds records of
    /// another type.
    pub fn set_meta_info(&mut self, meta: &'static MetaInfo) -> bool {
        if self.d.records.iter().any(|r| !meta.is_type_of(&**r)) {
            return false;
        }
        self.detached().meta = Some(meta);
        true
    }
    /// True while another copy shares this list's storage.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.d) > 1
    }

    fn accepts(&self, meta: &'static MetaInfo) -> bool {
        self.d.meta.is_none_or(|bound| ptr::eq(bound, meta))
    }

    /// Appends `record`, binding the list to its type when unbound. Returns
    /// false for a record of another type.
    pub fn append(&mut self, record: Box<dyn Record>) -> bool {
        let meta = record.meta();
        if !self.accepts(meta) {
            return false;
        }
        let d = self.detached();
        d.meta = Some(meta);
        d.records.push(record);
        true
    }

    /// Appends copies of the records of `other`, in order.
    pub fn append_list(&mut self, other: &SharedList) -> bool {
        let meta = match other.d.meta {
            Some(meta) => meta,
            None => return true,
        };
        if !self.accepts(meta) {
            return false;
        }
        let d = self.detached();
        d.meta = Some(meta);
        d.records.extend(other.d.records.iter().cloned());
        true
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Box<dyn Record>> {
        if index >= self.len() {
            return None;
        }
        Some(self.detached().records.remove(index))
    }

    /// Drops every record; the bound type is kept.
    pub fn clear(&mut self) {
        if !self.is_empty() {
            self.detached().records.clear();
        }
    }

    pub fn save(&mut self, force_insert: bool, force_all_fields: bool) -> bool {
        match Connection::resolve(None) {
            Ok(connection) => self.save_with(&connection, force_insert, force_all_fields),
            Err(e) => {
                warn!(error = %e, "list not saved");
                false
            }
        }
    }

    /// Saves every record in order. A failing record does not stop the
    /// remaining ones; the result is false when any of them failed.
    pub fn save_with(&mut self, connection: &Connection, force_insert: bool, force_all_fields: bool) -> bool {
        let mut saved = true;
        let records = &mut self.detached().records;
        for (index, record) in records.iter_mut().enumerate() {
            if let Err(e) = save_record(connection, &mut **record, force_insert, force_all_fields) {
                warn!(table = record.meta().name(), index, error = %e, "record not saved");
                saved = false;
            }
        }
        debug!(records = records.len(), saved, "list saved");
        saved
    }
}

// ------------- List -------------
/// A list of `M` records.
pub struct List<M: Model> {
    shared: SharedList,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> List<M> {
    pub fn new() -> Self {
        Self {
            shared: SharedList::with_meta_info(M::meta_info()),
            _model: PhantomData,
        }
    }
    pub fn len(&self) -> usize {
        self.shared.len()
    }
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }
    pub fn at(&self, index: usize) -> Option<&M> {
        self.shared.at(index).and_then(|r| r.downcast_ref::<M>())
    }
    pub fn at_mut(&mut self, index: usize) -> Option<&mut M> {
        self.shared.at_mut(index).and_then(|r| r.downcast_mut::<M>())
    }
    pub fn last(&self) -> Option<&M> {
        self.shared.last().and_then(|r| r.downcast_ref::<M>())
    }
    pub fn iter(&self) -> impl Iterator<Item = &M> {
        self.shared.iter().filter_map(|r| r.downcast_ref::<M>())
    }
    pub fn append(&mut self, record: M) {
        // the list is bound to M, so this cannot be refused
        self.shared.append(Box::new(record));
    }
    pub fn append_list(&mut self, other: &List<M>) {
        self.shared.append_list(&other.shared);
    }
    pub fn remove_at(&mut self, index: usize) -> Option<M> {
        let record = self.shared.remove_at(index)?;
        record.downcast_ref::<M>().cloned()
    }
    pub fn clear(&mut self) {
        self.shared.clear()
    }
    pub fn is_shared(&self) -> bool {
        self.shared.is_shared()
    }
    pub fn shared(&self) -> &SharedList {
        &self.shared
    }
    pub fn save(&mut self, force_insert: bool, force_all_fields: bool) -> bool {
        self.shared.save(force_insert, force_all_fields)
    }
    pub fn save_with(&mut self, connection: &Connection, force_insert: bool, force_all_fields: bool) -> bool {
        self.shared.save_with(connection, force_insert, force_all_fields)
    }
}

impl<M: Model> Default for List<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for List<M> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for List<M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<M: Model> From<List<M>> for SharedList {
    fn from(list: List<M>) -> Self {
        list.shared
    }
}

impl<M: Model> TryFrom<SharedList> for List<M> {
    type Error = RowkeepError;

    /// Fails when the shared list is bound to another record type.
    fn try_from(mut shared: SharedList) -> Result<Self> {
        if !shared.accepts(M::meta_info()) || !shared.set_meta_info(M::meta_info()) {
            return Err(RowkeepError::Schema(format!(
                "list of '{}' is not a list of '{}'",
                shared.meta_info().map_or("?", |m| m.name()),
                M::TABLE
            )));
        }
        Ok(Self {
            shared,
            _model: PhantomData,
        })
    }
}

impl<M: Model> FromIterator<M> for List<M> {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        let mut list = Self::new();
        for record in iter {
            list.append(record);
        }
        list
    }
}
