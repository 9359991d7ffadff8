//! Rowkeep – a small object-relational mapping core over SQLite.
//!
//! Rowkeep lets record types be declared as ordinary structs and takes care
//! of the SQL around them:
//! * A [`meta::MetaInfo`] describes one record type: its table, its fields in
//!   declaration order and their column constraints. It is built once per type
//!   and kept in a process wide registry.
//! * A [`field::Field`] is a typed, copy-on-write value cell. Records are made
//!   of fields, so copying a record is cheap and copies never alias changes.
//! * A [`expression::Where`] is a predicate tree which compiles into SQL with
//!   positional placeholders (`:arg0`, `:arg1`, ...) and the values bound to them.
//! * A [`query::Query`] combines a filter, a projection, an ordering and a
//!   limit, and renders them through a [`statement::SqlStatement`] dialect.
//!
//! ## Modules
//! * [`clause`] – Column constraints (`PRIMARY KEY`, `UNIQUE`, `NOT NULL`,
//!   `DEFAULT`, `FOREIGN KEY`) composed with `|`.
//! * [`value`] – The dynamically typed [`value::Value`] and the Rust types
//!   that can be held by a field.
//! * [`field`] – Field kinds: [`Field`], [`PrimaryKey`] and the lazily
//!   resolved [`ForeignKey`].
//! * [`meta`] – Schema descriptors and their registry.
//! * [`model`] – The [`Record`] and [`Model`] traits and the [`model!`] macro.
//! * [`expression`] – Filters and their compilation.
//! * [`statement`] – DDL and DML text generation.
//! * [`query`] – Query builders and cursors.
//! * [`list`] – Homogeneous, copy-on-write record lists.
//! * [`connection`] – Connections, the default connection and the driver boundary.
//! * [`persist`] – The SQLite driver.
//! * [`stream`] – Writing records field by field.
//! * [`settings`] – Configuration and logging setup.
//!
//! ## Quick Start
//! ```
//! use rowkeep::{model, Clause, Connection, Field, Model, PrimaryKey, Where};
//!
//! model! {
//!     pub struct Note in "note" {
//!         pub id: PrimaryKey,
//!         pub title: Field<String> = Clause::not_null(),
//!         pub stars: Field<i64>,
//!     }
//! }
//!
//! let connection = Connection::open_in_memory()?;
//! connection.create_table_if_not_exists::<Note>()?;
//!
//! let mut note = Note::default();
//! note.title.set("groceries");
//! note.stars.assign(3);
//! note.save_with(&connection, false, false)?;
//! assert!(note.id.id().is_some());
//!
//! let starred = Note::objects()
//!     .with_connection(connection.clone())
//!     .filter(Where::new("stars >=", 2))
//!     .count()?;
//! assert_eq!(starred, 1);
//! # Ok::<(), rowkeep::RowkeepError>(())
//! ```
//!
//! ## Connections
//! The first connection opened in a process becomes the default connection.
//! Every operation has a `_with` variant, or a `with_connection` builder, that
//! takes a connection explicitly; the plain variants use the default one and
//! fail with [`RowkeepError::NoConnection`] when there is none.

pub mod clause;
pub mod connection;
pub mod error;
pub mod expression;
pub mod field;
pub mod list;
pub mod meta;
pub mod model;
pub mod persist;
pub mod query;
pub mod settings;
pub mod statement;
pub mod stream;
pub mod value;

pub use clause::{Clause, Flag};
pub use connection::{Connection, Driver, RowCursor};
pub use error::{Result, RowkeepError};
pub use expression::{Expression, Where};
pub use field::{Column, Declare, Field, ForeignKey, PrimaryKey};
pub use list::{List, SharedList};
pub use meta::{FieldDescriptor, MetaInfo, meta_info};
pub use model::{Model, Record};
pub use persist::SqliteDriver;
pub use query::{Cursor, Query, SharedCursor, SharedQuery};
pub use settings::Settings;
pub use statement::{Index, SqlStatement, SqliteStatement};
pub use stream::{ListWriter, RecordStream};
pub use value::{FieldType, Value, ValueType};
