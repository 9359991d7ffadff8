//! Column constraints attached to a field.
//!
//! A [`Clause`] is a small set of [`Flag`]s plus at most one attached
//! [`Payload`]: the literal of a `DEFAULT` or the target table of a
//! `FOREIGN KEY`. Clauses compose with `|`.

use std::fmt;
use std::ops;
use std::ptr;

use crate::error::{Result, RowkeepError};
use crate::meta::MetaInfo;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    PrimaryKey,
    Autoincrement,
    Unique,
    NotNull,
    Default,
    ForeignKey,
}

impl Flag {
    fn bit(self) -> u8 {
        match self {
            Flag::PrimaryKey => 1,
            Flag::Autoincrement => 1 << 1,
            Flag::Unique => 1 << 2,
            Flag::NotNull => 1 << 3,
            Flag::Default => 1 << 4,
            Flag::ForeignKey => 1 << 5,
        }
    }
}

#[derive(Clone)]
pub enum Payload {
    /// A literal default value.
    Default(Value),
    /// A default given as an SQL expression, e.g. `CURRENT_TIMESTAMP`.
    DefaultExpression(String),
    ForeignKey(&'static MetaInfo),
}

impl Payload {
    fn flag(&self) -> Flag {
        match self {
            Payload::Default(_) | Payload::DefaultExpression(_) => Flag::Default,
            Payload::ForeignKey(_) => Flag::ForeignKey,
        }
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::Default(a), Payload::Default(b)) => a == b,
            (Payload::DefaultExpression(a), Payload::DefaultExpression(b)) => a == b,
            (Payload::ForeignKey(a), Payload::ForeignKey(b)) => ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Payload::Default(v) => write!(f, "Default({:?})", v),
            Payload::DefaultExpression(e) => write!(f, "DefaultExpression({})", e),
            // only the table name, the target descriptor may be large
            Payload::ForeignKey(meta) => write!(f, "ForeignKey({})", meta.name()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clause {
    flags: u8,
    payload: Option<Payload>,
}

impl Clause {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_flag(flag: Flag) -> Self {
        Self {
            flags: flag.bit(),
            payload: None,
        }
    }
    pub fn primary_key() -> Self {
        Self::from_flag(Flag::PrimaryKey)
    }
    pub fn autoincrement() -> Self {
        Self::from_flag(Flag::Autoincrement)
    }
    pub fn unique() -> Self {
        Self::from_flag(Flag::Unique)
    }
    pub fn not_null() -> Self {
        Self::from_flag(Flag::NotNull)
    }
    pub fn default_value<V: Into<Value>>(value: V) -> Self {
        Self {
            flags: Flag::Default.bit(),
            payload: Some(Payload::Default(value.into())),
        }
    }
    pub fn default_expression(expression: &str) -> Self {
        Self {
            flags: Flag::Default.bit(),
            payload: Some(Payload::DefaultExpression(expression.to_string())),
        }
    }
    pub fn foreign_key(target: &'static MetaInfo) -> Self {
        Self {
            flags: Flag::ForeignKey.bit(),
            payload: Some(Payload::ForeignKey(target)),
        }
    }

    pub fn test_flag(&self, flag: Flag) -> bool {
        self.flags & flag.bit() != 0
    }
    pub fn is_empty(&self) -> bool {
        self.flags == 0
    }
    /// The attached payload, if it belongs to `flag`.
    pub fn flag(&self, flag: Flag) -> Option<&Payload> {
        self.payload
            .as_ref()
            .filter(|p| p.flag() == flag && self.test_flag(flag))
    }
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
    pub fn foreign_key_target(&self) -> Option<&'static MetaInfo> {
        match self.flag(Flag::ForeignKey) {
            Some(Payload::ForeignKey(meta)) => Some(*meta),
            _ => None,
        }
    }

    /// The same clause without its payload, or the flag the payload belongs to.
    pub fn without_payload(self) -> Clause {
        match &self.payload {
            Some(payload) => Clause {
                flags: self.flags & !payload.flag().bit(),
                payload: None,
            },
            None => self,
        }
    }

    /// Unions the flags of both clauses. A payload carried by exactly one side
    /// is kept; when both sides carry one the union is rejected.
    pub fn try_union(self, other: Clause) -> Result<Clause> {
        let payload = match (self.payload, other.payload) {
            (Some(a), Some(b)) => {
                return Err(RowkeepError::Schema(format!(
                    "cannot union clauses carrying two payloads: {:?} and {:?}",
                    a, b
                )));
            }
            (a, b) => a.or(b),
        };
        Ok(Clause {
            flags: self.flags | other.flags,
            payload,
        })
    }
}

impl From<Flag> for Clause {
    fn from(flag: Flag) -> Self {
        Clause::from_flag(flag)
    }
}

/// # Panics
///
/// Panics when both clauses carry a payload. Use [`Clause::try_union`] to
/// get an error instead.
impl ops::BitOr for Clause {
    type Output = Clause;
    fn bitor(self, other: Clause) -> Clause {
        match self.try_union(other) {
            Ok(clause) => clause,
            Err(e) => panic!("{}", e),
        }
    }
}

impl ops::BitOr<Flag> for Clause {
    type Output = Clause;
    fn bitor(self, flag: Flag) -> Clause {
        Clause {
            flags: self.flags | flag.bit(),
            payload: self.payload,
        }
    }
}
