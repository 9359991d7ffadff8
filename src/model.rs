//! Record types and their persistence.
//!
//! Record types are declared with the [`model!`](crate::model!) macro, which
//! writes the struct, a `Default` attaching every field's clause, and the
//! [`Record`] and [`Model`] implementations:
//!
//! ```
//! use rowkeep::{model, Clause, Field, PrimaryKey};
//!
//! model! {
//!     pub struct Setting in "setting" {
//!         pub id: PrimaryKey,
//!         pub key: Field<String> = Clause::not_null() | Clause::unique(),
//!         pub value: Field<String>,
//!     }
//! }
//!
//! let info = <Setting as rowkeep::Model>::meta_info();
//! assert_eq!(info.field_name_list(), vec!["id", "key", "value"]);
//! ```

use std::any::Any;
use std::fmt;

use tracing::debug;

use crate::clause::Flag;
use crate::connection::Connection;
use crate::error::{Result, RowkeepError};
use crate::expression::Where;
use crate::field::Column;
use crate::meta::{FieldDescriptor, MetaInfo};
use crate::query::{Query, SharedQuery};
use crate::value::Value;

/// Object safe view of a record instance.
pub trait Record: Any + Send + Sync + fmt::Debug {
    fn meta(&self) -> &'static MetaInfo;
    fn column(&self, index: usize) -> Option<&dyn Column>;
    fn column_mut(&mut self, index: usize) -> Option<&mut dyn Column>;
    /// Validation run before every save.
    fn clean(&mut self) -> bool {
        true
    }
    fn clone_record(&self) -> Box<dyn Record>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn Record> {
    fn clone(&self) -> Self {
        self.clone_record()
    }
}

impl<'a> dyn Record + 'a {
    pub fn downcast_ref<M: Model>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }
    pub fn downcast_mut<M: Model>(&mut self) -> Option<&mut M> {
        self.as_any_mut().downcast_mut::<M>()
    }
    fn primary_key_value(&self) -> Option<(&'static FieldDescriptor, Value)> {
        let field = self.meta().primary_key()?;
        let value = self.column(field.index())?.column_value(false);
        Some((field, value))
    }
}

/// A statically known record type.
pub trait Model: Record + Clone + Default + Sized {
    const TABLE: &'static str;

    /// Field descriptors in declaration order.
    fn field_descriptors() -> Vec<FieldDescriptor>;

    fn initial_data() -> Vec<Self> {
        Vec::new()
    }

    fn meta_info() -> &'static MetaInfo {
        crate::meta::meta_info::<Self>()
    }

    fn objects() -> Query<Self> {
        Query::new()
    }

    fn save(&mut self, force_insert: bool, force_all_fields: bool) -> Result<()> {
        let connection = Connection::resolve(None)?;
        self.save_with(&connection, force_insert, force_all_fields)
    }
    fn save_with(&mut self, connection: &Connection, force_insert: bool, force_all_fields: bool) -> Result<()> {
        save_record(connection, self, force_insert, force_all_fields)
    }

    /// Loads the first row matching `filter`. Returns false, leaving the
    /// record untouched, when nothing matches.
    fn load(&mut self, filter: Where) -> Result<bool> {
        let connection = Connection::resolve(None)?;
        self.load_with(&connection, filter)
    }
    fn load_with(&mut self, connection: &Connection, filter: Where) -> Result<bool> {
        load_record(connection, self, filter)
    }

    /// Deletes the row of this record and clears its primary key.
    fn remove(&mut self) -> Result<()> {
        let connection = Connection::resolve(None)?;
        self.remove_with(&connection)
    }
    fn remove_with(&mut self, connection: &Connection) -> Result<()> {
        remove_record(connection, self)
    }
}

// ------------- Persistence -------------
/// Inserts or replaces `record`.
///
/// A record without a primary key value, or any record when `force_insert`
/// is set, is inserted without its primary key column and gets the engine's
/// new row id. Otherwise the row is replaced in place. Null columns are left
/// out unless `force_all_fields` is set, so column defaults apply.
pub fn save_record(
    connection: &Connection,
    record: &mut dyn Record,
    force_insert: bool,
    force_all_fields: bool,
) -> Result<()> {
    let meta = record.meta();
    if !record.clean() {
        return Err(RowkeepError::Constraint(format!(
            "'{}' record failed validation",
            meta.name()
        )));
    }
    let primary_key = record.primary_key_value();
    let insert = force_insert || primary_key.as_ref().is_none_or(|(_, v)| v.is_null());

    let mut names = Vec::new();
    let mut arguments = Vec::new();
    for field in meta.fields() {
        if insert && field.clause().test_flag(Flag::PrimaryKey) {
            continue;
        }
        let value = record
            .column(field.index())
            .map_or(Value::Null, |c| c.column_value(true));
        if value.is_null() && !force_all_fields {
            continue;
        }
        names.push(field.name());
        arguments.push((field.name().to_string(), value));
    }

    let sql = connection.with_statement(|statement| {
        if insert {
            statement.insert_into(meta, &names)
        } else {
            statement.replace_into(meta, &names)
        }
    })?;
    if insert {
        let id = connection.insert(&sql, &arguments)?;
        if let Some((field, _)) = primary_key {
            if let Some(column) = record.column_mut(field.index()) {
                column.set_column_value(Value::Integer(id));
            }
            debug!(table = meta.name(), id, "inserted");
        }
    } else {
        connection.execute(&sql, &arguments)?;
    }
    mark_clean(record);
    Ok(())
}

pub fn load_record(connection: &Connection, record: &mut dyn Record, filter: Where) -> Result<bool> {
    let query = SharedQuery::for_meta_info(record.meta())
        .with_connection(connection.clone())
        .filter(filter)
        .limit(1);
    let mut cursor = query.exec()?;
    if !cursor.next() {
        return Ok(false);
    }
    if !cursor.record_to(record) {
        return Err(RowkeepError::Schema(format!(
            "row of '{}' does not fit the declared field types",
            record.meta().name()
        )));
    }
    mark_clean(record);
    Ok(true)
}

pub fn remove_record(connection: &Connection, record: &mut dyn Record) -> Result<()> {
    let meta = record.meta();
    let (field, value) = record
        .primary_key_value()
        .ok_or_else(|| RowkeepError::Schema(format!("'{}' has no primary key", meta.name())))?;
    if value.is_null() {
        return Err(RowkeepError::Schema(format!(
            "'{}' record has not been saved",
            meta.name()
        )));
    }
    SharedQuery::for_meta_info(meta)
        .with_connection(connection.clone())
        .filter(Where::with_op(field.name(), "=", value))
        .remove()?;
    if let Some(column) = record.column_mut(field.index()) {
        column.clear_column();
    }
    Ok(())
}

fn mark_clean(record: &mut dyn Record) {
    for index in 0..record.meta().len() {
        if let Some(column) = record.column_mut(index) {
            column.mark_clean();
        }
    }
}

// ------------- Declaration -------------
/// Declares a record type.
///
/// Each field is `name: Kind` with an optional `= clause` appended to the
/// kind's own clause. After the struct body, `seed = path;` names a function
/// returning the initial records and `clean = path;` a validation function.
#[macro_export]
macro_rules! model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident in $table:literal {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty $(= $clause:expr)? ),* $(,)?
        }
        $(seed = $seed:path;)?
        $(clean = $clean:path;)?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $ty, )*
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field: <$ty as $crate::field::Declare>::declare(
                            $crate::clause::Clause::new() $(| $clause)?
                        ),
                    )*
                }
            }
        }

        impl $crate::model::Record for $name {
            fn meta(&self) -> &'static $crate::meta::MetaInfo {
                <Self as $crate::model::Model>::meta_info()
            }
            fn column(&self, index: usize) -> ::std::option::Option<&dyn $crate::field::Column> {
                let columns: &[&dyn $crate::field::Column] = &[ $( &self.$field ),* ];
                columns.get(index).copied()
            }
            #[allow(unused_mut, unused_assignments)]
            fn column_mut(&mut self, index: usize) -> ::std::option::Option<&mut dyn $crate::field::Column> {
                let mut position = 0usize;
                $(
                    if position == index {
                        return ::std::option::Option::Some(&mut self.$field);
                    }
                    position += 1;
                )*
                ::std::option::Option::None
            }
            #[allow(unused_mut, unused_assignments)]
            fn clean(&mut self) -> bool {
                let mut hook: ::std::option::Option<fn(&mut Self) -> bool> = ::std::option::Option::None;
                $( hook = ::std::option::Option::Some($clean); )?
                hook.map_or(true, |hook| hook(self))
            }
            fn clone_record(&self) -> ::std::boxed::Box<dyn $crate::model::Record> {
                ::std::boxed::Box::new(::std::clone::Clone::clone(self))
            }
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }

        impl $crate::model::Model for $name {
            const TABLE: &'static str = $table;
            fn field_descriptors() -> ::std::vec::Vec<$crate::meta::FieldDescriptor> {
                let blank = <Self as ::std::default::Default>::default();
                let mut fields = ::std::vec::Vec::new();
                $(
                    fields.push($crate::meta::FieldDescriptor::new(
                        stringify!($field),
                        fields.len(),
                        $crate::field::Column::value_type(&blank.$field),
                        $crate::field::Column::clause(&blank.$field),
                    ));
                )*
                fields
            }
            $(
                fn initial_data() -> ::std::vec::Vec<Self> {
                    $seed()
                }
            )?
        }
    };
}
