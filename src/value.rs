// used for persistence
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

// used for timestamps in the database
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
// used for decimal numbers
use bigdecimal::BigDecimal;

// used when parsing text into the richer types
use std::str::FromStr;
// used to print out readable forms of a value
use std::fmt;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Separator between the elements of a stored text list.
pub const LIST_SEPARATOR: &str = " & ";

// ------------- Value Types -------------
/// Tag naming the declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    Real,
    Boolean,
    Text,
    Blob,
    DateTime,
    Date,
    Decimal,
    Json,
    TextList,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueType::Integer => "Integer",
            ValueType::Real => "Real",
            ValueType::Boolean => "Boolean",
            ValueType::Text => "Text",
            ValueType::Blob => "Blob",
            ValueType::DateTime => "DateTime",
            ValueType::Date => "Date",
            ValueType::Decimal => "Decimal",
            ValueType::Json => "Json",
            ValueType::TextList => "TextList",
        };
        write!(f, "{}", name)
    }
}

// ------------- Value -------------
/// A dynamically typed value, as read from or bound to a column.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Blob(Vec<u8>),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Decimal(BigDecimal),
    Json(serde_json::Value),
    TextList(Vec<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ValueType::Integer),
            Value::Real(_) => Some(ValueType::Real),
            Value::Boolean(_) => Some(ValueType::Boolean),
            Value::Text(_) => Some(ValueType::Text),
            Value::Blob(_) => Some(ValueType::Blob),
            Value::DateTime(_) => Some(ValueType::DateTime),
            Value::Date(_) => Some(ValueType::Date),
            Value::Decimal(_) => Some(ValueType::Decimal),
            Value::Json(_) => Some(ValueType::Json),
            Value::TextList(_) => Some(ValueType::TextList),
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self.clone().coerce(ValueType::Integer) {
            Some(Value::Integer(i)) => Some(i),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self.clone().coerce(ValueType::Real) {
            Some(Value::Real(r)) => Some(r),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The flat form a structured value takes in storage. Text lists, decimals
    /// and JSON documents become text; everything else is left as is.
    pub fn into_storage(self) -> Value {
        match self {
            Value::TextList(list) => Value::Text(encode_text_list(&list)),
            Value::Decimal(d) => Value::Text(d.to_string()),
            Value::Json(j) => Value::Text(j.to_string()),
            other => other,
        }
    }

    /// Converts the value into the variant named by `target`, or `None` when
    /// no sensible conversion exists. Null stays null for every target.
    pub fn coerce(self, target: ValueType) -> Option<Value> {
        if self.is_null() || self.value_type() == Some(target) {
            return Some(self);
        }
        match (target, self) {
            (ValueType::Integer, Value::Real(r))
                if r.fract() == 0.0 && r >= i64::MIN as f64 && r < i64::MAX as f64 =>
            {
                Some(Value::Integer(r as i64))
            }
            (ValueType::Integer, Value::Boolean(b)) => Some(Value::Integer(b as i64)),
            (ValueType::Integer, Value::Text(s)) => s.trim().parse().ok().map(Value::Integer),
            (ValueType::Integer, Value::Decimal(d)) => d.to_string().parse().ok().map(Value::Integer),
            (ValueType::Real, Value::Integer(i)) => Some(Value::Real(i as f64)),
            (ValueType::Real, Value::Text(s)) => s.trim().parse().ok().map(Value::Real),
            (ValueType::Real, Value::Decimal(d)) => d.to_string().parse().ok().map(Value::Real),
            (ValueType::Boolean, Value::Integer(i)) => Some(Value::Boolean(i != 0)),
            (ValueType::Boolean, Value::Text(s)) => match s.trim() {
                "1" | "true" | "TRUE" | "True" => Some(Value::Boolean(true)),
                "0" | "false" | "FALSE" | "False" => Some(Value::Boolean(false)),
                _ => None,
            },
            (ValueType::Text, Value::Integer(i)) => Some(Value::Text(i.to_string())),
            (ValueType::Text, Value::Real(r)) => Some(Value::Text(r.to_string())),
            (ValueType::Text, Value::Boolean(b)) => Some(Value::Text(b.to_string())),
            (ValueType::Text, Value::Decimal(d)) => Some(Value::Text(d.to_string())),
            (ValueType::Text, Value::DateTime(d)) => Some(Value::Text(d.format(DATETIME_FORMAT).to_string())),
            (ValueType::Text, Value::Date(d)) => Some(Value::Text(d.format(DATE_FORMAT).to_string())),
            (ValueType::Blob, Value::Text(s)) => Some(Value::Blob(s.into_bytes())),
            (ValueType::DateTime, Value::Text(s)) => parse_datetime(&s).map(Value::DateTime),
            (ValueType::DateTime, Value::Integer(i)) => DateTime::from_timestamp(i, 0).map(Value::DateTime),
            (ValueType::Date, Value::Text(s)) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok().map(Value::Date),
            (ValueType::Date, Value::DateTime(d)) => Some(Value::Date(d.date_naive())),
            (ValueType::Decimal, Value::Text(s)) => BigDecimal::from_str(s.trim()).ok().map(Value::Decimal),
            (ValueType::Decimal, Value::Integer(i)) => Some(Value::Decimal(BigDecimal::from(i))),
            (ValueType::Decimal, Value::Real(r)) => BigDecimal::from_str(&r.to_string()).ok().map(Value::Decimal),
            (ValueType::Json, Value::Text(s)) => serde_json::from_str(&s).ok().map(Value::Json),
            (ValueType::TextList, Value::Text(s)) => Some(Value::TextList(decode_text_list(&s))),
            _ => None,
        }
    }

    /// Renders the value as an SQL literal, e.g. for DEFAULT constraints.
    pub fn sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Boolean(b) => (*b as i64).to_string(),
            Value::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
                format!("X'{}'", hex)
            }
            other => match other.clone().coerce(ValueType::Text).map(Value::into_storage) {
                Some(Value::Text(s)) => quote(&s),
                _ => quote(&encode_structured(other)),
            },
        }
    }
}

fn encode_structured(value: &Value) -> String {
    match value.clone().into_storage() {
        Value::Text(s) => s,
        other => format!("{:?}", other),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .map(|d| d.and_utc())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.sql_literal())
    }
}

// ------------- Text lists -------------
/// Joins the elements with [`LIST_SEPARATOR`]. Ampersands and double quotes
/// inside the elements are written as `&amp;` and `&quot;`, so the separator
/// never occurs inside an encoded element.
pub fn encode_text_list(list: &[String]) -> String {
    list.iter()
        .map(|s| s.replace('&', "&amp;").replace('"', "&quot;"))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Empty text decodes to an empty list, so a list holding only one empty
/// element loads back empty.
pub fn decode_text_list(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    s.split(LIST_SEPARATOR).map(unescape).collect()
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with("&amp;") {
            out.push('&');
            rest = &rest[5..];
        } else if rest.starts_with("&quot;") {
            out.push('"');
            rest = &rest[6..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

// ------------- Storage boundary -------------
impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(r) => ToSqlOutput::from(*r),
            Value::Boolean(b) => ToSqlOutput::from(*b as i64),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Blob(bytes) => ToSqlOutput::from(bytes.as_slice()),
            Value::DateTime(d) => ToSqlOutput::from(d.format(DATETIME_FORMAT).to_string()),
            Value::Date(d) => ToSqlOutput::from(d.format(DATE_FORMAT).to_string()),
            Value::Decimal(d) => ToSqlOutput::from(d.to_string()),
            Value::Json(j) => ToSqlOutput::from(j.to_string()),
            Value::TextList(list) => ToSqlOutput::from(encode_text_list(list)),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Value {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

// ------------- Conversions -------------
impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Integer(i)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Value {
        Value::Integer(i as i64)
    }
}
impl From<f64> for Value {
    fn from(r: f64) -> Value {
        Value::Real(r)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Boolean(b)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Text(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Text(s)
    }
}
impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Value {
        Value::Blob(bytes)
    }
}
impl From<Vec<String>> for Value {
    fn from(list: Vec<String>) -> Value {
        Value::TextList(list)
    }
}
impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Value {
        Value::DateTime(d)
    }
}
impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Value {
        Value::Date(d)
    }
}
impl From<BigDecimal> for Value {
    fn from(d: BigDecimal) -> Value {
        Value::Decimal(d)
    }
}
impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Value {
        Value::Json(j)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Value {
        option.map_or(Value::Null, Into::into)
    }
}

// ------------- Field Types -------------
/// A Rust type that can be held by a field. The declared [`ValueType`] is
/// used for schema generation; `from_value` applies the coercion rules of
/// [`Value::coerce`].
pub trait FieldType: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    const VALUE_TYPE: ValueType;
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! field_type {
    ($ty:ty, $variant:ident) => {
        field_type!($ty, $variant, |v: $ty| v, |v: &$ty| v.clone());
    };
    ($ty:ty, $variant:ident, $from:expr, $to:expr) => {
        impl FieldType for $ty {
            const VALUE_TYPE: ValueType = ValueType::$variant;
            fn to_value(&self) -> Value {
                Value::$variant(($to)(self))
            }
            fn from_value(value: Value) -> Option<Self> {
                match value.coerce(ValueType::$variant)? {
                    Value::$variant(v) => Some(($from)(v)),
                    _ => None,
                }
            }
        }
    };
}

field_type!(i64, Integer);
field_type!(f64, Real);
field_type!(bool, Boolean);
field_type!(String, Text);
field_type!(Vec<u8>, Blob);
field_type!(Vec<String>, TextList);
field_type!(DateTime<Utc>, DateTime);
field_type!(NaiveDate, Date);
field_type!(BigDecimal, Decimal);
field_type!(serde_json::Value, Json);

impl FieldType for i32 {
    const VALUE_TYPE: ValueType = ValueType::Integer;
    fn to_value(&self) -> Value {
        Value::Integer(*self as i64)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce(ValueType::Integer)? {
            Value::Integer(i) => i32::try_from(i).ok(),
            _ => None,
        }
    }
}
