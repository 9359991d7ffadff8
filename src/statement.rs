//! SQL text generation from registry metadata and query state.
//!
//! The [`SqlStatement`] trait carries the generic rendering rules; a dialect
//! only supplies column types and constraint text. [`SqliteStatement`] is the
//! dialect used by the bundled SQLite driver.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::clause::{Clause, Flag, Payload};
use crate::error::{Result, RowkeepError};
use crate::expression::Expression;
use crate::meta::MetaInfo;
use crate::model::Model;
use crate::query::SharedQuery;
use crate::value::ValueType;

lazy_static! {
    static ref ORDER_SPEC: Regex =
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)(?:\s+((?i)asc|desc))?\s*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Parses an order spec such as `"height desc"` into a field name and
/// direction. The direction defaults to ascending.
pub fn parse_order_spec(spec: &str) -> Option<(String, Direction)> {
    let captures = ORDER_SPEC.captures(spec)?;
    let field = captures.get(1)?.as_str().to_string();
    let direction = match captures.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(d) if d == "desc" => Direction::Desc,
        _ => Direction::Asc,
    };
    Some((field, direction))
}

// ------------- Index -------------
#[derive(Debug, Clone)]
pub struct Index {
    name: String,
    meta: &'static MetaInfo,
    columns: Vec<String>,
}

impl Index {
    pub fn new<M: Model>(name: &str) -> Self {
        Self::for_meta_info(name, M::meta_info())
    }
    pub fn for_meta_info(name: &str, meta: &'static MetaInfo) -> Self {
        Self {
            name: name.to_string(),
            meta,
            columns: Vec::new(),
        }
    }
    pub fn column(mut self, name: &str) -> Self {
        self.columns.push(name.to_string());
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn meta_info(&self) -> &'static MetaInfo {
        self.meta
    }
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

// ------------- Statements -------------
pub trait SqlStatement: Send + Sync {
    fn column_type(&self, value_type: ValueType) -> &'static str;
    fn column_constraint(&self, clause: &Clause) -> String;

    fn create_table_if_not_exists(&self, meta: &MetaInfo) -> String {
        let mut lines = Vec::new();
        for field in meta.fields() {
            lines.push(format!(
                "{} {} {}",
                field.name(),
                self.column_type(field.value_type()),
                self.column_constraint(field.clause())
            ));
        }
        for field in meta.fields() {
            if let Some(target) = field.foreign_key() {
                let key = target.primary_key().map_or("id", |f| f.name());
                lines.push(format!(
                    "FOREIGN KEY({}) REFERENCES {}({})",
                    field.name(),
                    target.name(),
                    key
                ));
            }
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {}  (\n{}\n);",
            meta.name(),
            lines.join(",\n")
        )
    }

    fn create_index_if_not_exists(&self, index: &Index) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} on {} ({});",
            index.name(),
            index.meta_info().name(),
            index.columns().join(",")
        )
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {};", table)
    }

    fn insert_into(&self, meta: &MetaInfo, fields: &[&str]) -> String {
        self.write_into("INSERT", meta, fields)
    }

    fn replace_into(&self, meta: &MetaInfo, fields: &[&str]) -> String {
        self.write_into("REPLACE", meta, fields)
    }

    fn write_into(&self, keyword: &str, meta: &MetaInfo, fields: &[&str]) -> String {
        if fields.is_empty() {
            return format!("{} INTO {} DEFAULT VALUES;", keyword, meta.name());
        }
        let placeholders: Vec<String> = fields.iter().map(|f| format!(":{}", f)).collect();
        format!(
            "{} INTO {} ({}) values ({});",
            keyword,
            meta.name(),
            fields.join(","),
            placeholders.join(",")
        )
    }

    /// `SELECT <projection or *> FROM <table> [WHERE ..] [ORDER BY ..] [LIMIT n];`
    /// With an aggregate function set the projection becomes `func(fields)`.
    fn select(&self, query: &SharedQuery) -> Result<String> {
        let meta = query.meta_info();
        let projection = match query.func() {
            Some(func) => {
                let fields = self.projection(query, true)?;
                format!("{}({})", func, if fields.is_empty() { "*".to_string() } else { fields.join(",") })
            }
            None => {
                let fields = self.projection(query, false)?;
                if fields.is_empty() { "*".to_string() } else { fields.join(",") }
            }
        };
        let mut sql = format!("SELECT {} FROM {}", projection, meta.name());
        self.append_where(&mut sql, query);
        let order_by = self.order_by(query)?;
        if !order_by.is_empty() {
            sql += &format!(" ORDER BY {}", order_by.join(","));
        }
        self.append_limit(&mut sql, query);
        sql.push(';');
        Ok(sql)
    }

    /// `DELETE FROM <table> [WHERE ..] [LIMIT n];`. A limit is rendered as
    /// given; engines built without support for it reject the statement.
    fn delete_from(&self, query: &SharedQuery) -> Result<String> {
        let mut sql = format!("DELETE FROM {}", query.meta_info().name());
        self.append_where(&mut sql, query);
        if query.limit_value() >= 0 {
            warn!(table = query.meta_info().name(), "DELETE with LIMIT may be rejected by the engine");
        }
        self.append_limit(&mut sql, query);
        sql.push(';');
        Ok(sql)
    }

    fn projection(&self, query: &SharedQuery, allow_star: bool) -> Result<Vec<String>> {
        let meta = query.meta_info();
        let mut fields = Vec::new();
        for name in query.fields() {
            let name = name.trim();
            if (allow_star && name == "*") || meta.field_by_name(name).is_some() {
                fields.push(name.to_string());
            } else {
                return Err(RowkeepError::QueryBuild(format!(
                    "'{}' has no field '{}'",
                    meta.name(),
                    name
                )));
            }
        }
        Ok(fields)
    }

    fn order_by(&self, query: &SharedQuery) -> Result<Vec<String>> {
        let meta = query.meta_info();
        let mut specs = Vec::new();
        for spec in query.order_by_list() {
            let (field, direction) = parse_order_spec(spec)
                .ok_or_else(|| RowkeepError::QueryBuild(format!("malformed order spec '{}'", spec)))?;
            if meta.field_by_name(&field).is_none() {
                return Err(RowkeepError::QueryBuild(format!(
                    "cannot order '{}' by unknown field '{}'",
                    meta.name(),
                    field
                )));
            }
            specs.push(match direction {
                Direction::Asc => format!("{} ASC", field),
                Direction::Desc => format!("{} DESC", field),
            });
        }
        Ok(specs)
    }

    fn append_where(&self, sql: &mut String, query: &SharedQuery) {
        if let Some(filter) = query.filter_ref() {
            let expression = Expression::new(filter);
            if !expression.is_empty() {
                *sql += &format!(" WHERE {}", expression.string());
            }
        }
    }

    fn append_limit(&self, sql: &mut String, query: &SharedQuery) {
        if query.limit_value() >= 0 {
            *sql += &format!(" LIMIT {}", query.limit_value());
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteStatement;

impl SqlStatement for SqliteStatement {
    fn column_type(&self, value_type: ValueType) -> &'static str {
        match value_type {
            ValueType::Integer | ValueType::Boolean => "INTEGER",
            ValueType::Real => "REAL",
            ValueType::Blob => "BLOB",
            ValueType::DateTime => "DATETIME",
            ValueType::Date => "DATE",
            // decimals keep their exact text, a numeric affinity would round them
            ValueType::Text | ValueType::Decimal | ValueType::Json | ValueType::TextList => "TEXT",
        }
    }

    fn column_constraint(&self, clause: &Clause) -> String {
        let mut tokens = Vec::new();
        if clause.test_flag(Flag::PrimaryKey) {
            if clause.test_flag(Flag::Autoincrement) {
                tokens.push("PRIMARY KEY AUTOINCREMENT".to_string());
            } else {
                tokens.push("PRIMARY KEY".to_string());
            }
        }
        if clause.test_flag(Flag::Unique) {
            tokens.push("UNIQUE".to_string());
        }
        if clause.test_flag(Flag::NotNull) {
            tokens.push("NOT NULL".to_string());
        }
        match clause.flag(Flag::Default) {
            Some(Payload::Default(value)) => tokens.push(format!("DEFAULT {}", value.sql_literal())),
            Some(Payload::DefaultExpression(expression)) => tokens.push(format!("DEFAULT {}", expression)),
            _ => (),
        }
        tokens.join(" ")
    }
}
