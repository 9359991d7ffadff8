//! Per record type schema descriptors and the process wide registry.
//!
//! A [`MetaInfo`] is built once per record type, the first time it is asked
//! for, and kept for the rest of the process. Field order is the declaration
//! order of the record and never changes; both DDL generation and row
//! materialisation rely on it.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::ptr;
use std::sync::{Mutex, PoisonError};

use lazy_static::lazy_static;
use seahash::SeaHasher;
use tracing::debug;

use crate::clause::{Clause, Flag};
use crate::model::{Model, Record};
use crate::value::{Value, ValueType};

pub type RegistryHasher = BuildHasherDefault<SeaHasher>;

// ------------- FieldDescriptor -------------
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: &'static str,
    index: usize,
    value_type: ValueType,
    clause: Clause,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, index: usize, value_type: ValueType, clause: Clause) -> Self {
        Self {
            name,
            index,
            value_type,
            clause,
        }
    }
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn index(&self) -> usize {
        self.index
    }
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
    pub fn clause(&self) -> &Clause {
        &self.clause
    }
    pub fn is_primary_key(&self) -> bool {
        self.clause.test_flag(Flag::PrimaryKey)
    }
    /// The descriptor of the referenced record type, for foreign key fields.
    pub fn foreign_key(&self) -> Option<&'static MetaInfo> {
        self.clause.foreign_key_target()
    }
}

// ------------- MetaInfo -------------
pub struct MetaInfo {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
    create: fn() -> Box<dyn Record>,
    initial_data: fn() -> Vec<Box<dyn Record>>,
}

fn create_blank<M: Model>() -> Box<dyn Record> {
    Box::new(M::default())
}

fn create_initial_data<M: Model>() -> Vec<Box<dyn Record>> {
    M::initial_data()
        .into_iter()
        .map(|record| Box::new(record) as Box<dyn Record>)
        .collect()
}

impl MetaInfo {
    /// Builds the descriptor of `M`. Use [`meta_info`] to get the registered one.
    pub fn of<M: Model>() -> Self {
        Self {
            name: M::TABLE,
            type_id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
            fields: M::field_descriptors(),
            create: create_blank::<M>,
            initial_data: create_initial_data::<M>,
        }
    }
    /// The table name.
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
    pub fn len(&self) -> usize {
        self.fields.len()
    }
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
    pub fn at(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
    pub fn field_name_list(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
    pub fn foreign_key_name_list(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.clause.test_flag(Flag::ForeignKey))
            .map(|f| f.name)
            .collect()
    }
    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.is_primary_key())
    }
    pub fn is_type_of(&self, record: &dyn Record) -> bool {
        ptr::eq(self, record.meta())
    }

    pub fn value(&self, record: &dyn Record, name: &str) -> Option<Value> {
        self.value_converted(record, name, false)
    }
    pub fn value_converted(&self, record: &dyn Record, name: &str, convert: bool) -> Option<Value> {
        if !self.is_type_of(record) {
            return None;
        }
        let field = self.field_by_name(name)?;
        record.column(field.index).map(|c| c.column_value(convert))
    }
    /// Writes `value` into the named field of `record`. Returns false, leaving
    /// the record untouched, when the name is unknown, the record is of another
    /// type or the value cannot be coerced to the declared type.
    pub fn set_value(&self, record: &mut dyn Record, name: &str, value: Value) -> bool {
        if !self.is_type_of(record) {
            return false;
        }
        match self.field_by_name(name) {
            Some(field) => record
                .column_mut(field.index)
                .is_some_and(|c| c.set_column_value(value)),
            None => false,
        }
    }

    /// A new blank record, owned by the caller.
    pub fn create(&self) -> Box<dyn Record> {
        (self.create)()
    }
    /// Seed records; every call builds fresh instances.
    pub fn initial_data(&self) -> Vec<Box<dyn Record>> {
        (self.initial_data)()
    }
}

impl PartialEq for MetaInfo {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for MetaInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MetaInfo")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

// ------------- Registry -------------
lazy_static! {
    static ref REGISTRY: Mutex<HashMap<TypeId, &'static MetaInfo, RegistryHasher>> =
        Mutex::new(HashMap::default());
}

/// The registered descriptor of `M`, built and cached on first use.
///
/// Building happens outside the registry lock, because describing a record
/// with foreign keys registers the referenced types first.
pub fn meta_info<M: Model>() -> &'static MetaInfo {
    let type_id = TypeId::of::<M>();
    if let Some(info) = lookup(type_id) {
        return info;
    }
    let built = MetaInfo::of::<M>();
    let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
    // a racing thread may have registered it meanwhile, first one wins
    *registry.entry(type_id).or_insert_with(|| {
        debug!(table = built.name, fields = built.fields.len(), "registered record type");
        Box::leak(Box::new(built))
    })
}

pub fn lookup(type_id: TypeId) -> Option<&'static MetaInfo> {
    REGISTRY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
        .copied()
}

/// Looks a registered descriptor up by table name.
pub fn lookup_table(name: &str) -> Option<&'static MetaInfo> {
    REGISTRY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .values()
        .find(|info| info.name == name)
        .copied()
}
