//! Column value conversions
//!
//! Record fields cross into storage as `libsql::Value`. [`TreeValue`] is the
//! bridge for the field types record types commonly use for ids, parent
//! references and scope columns.

use chrono::NaiveDate;
use libsql::Value;
use uuid::Uuid;

/// Conversion between a field type and its stored column value
pub trait TreeValue: Sized {
    fn to_value(&self) -> Value;

    /// # Errors
    ///
    /// Returns a human-readable reason when the stored value has the wrong
    /// storage class or cannot be parsed.
    fn from_value(value: Value) -> Result<Self, String>;
}

impl TreeValue for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(format!("expected INTEGER, found {:?}", other)),
        }
    }
}

impl TreeValue for i32 {
    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| format!("{} does not fit in i32", wide))
    }
}

impl TreeValue for bool {
    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        Ok(i64::from_value(value)? != 0)
    }
}

impl TreeValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(format!("expected TEXT, found {:?}", other)),
        }
    }
}

impl TreeValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        let text = String::from_value(value)?;
        Uuid::parse_str(&text).map_err(|e| format!("invalid uuid '{}': {}", text, e))
    }
}

impl TreeValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Text(self.format("%Y-%m-%d").to_string())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        let text = String::from_value(value)?;
        NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{}': {}", text, e))
    }
}

impl<T: TreeValue> TreeValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Hashable, comparable view of a column value
///
/// `libsql::Value` carries floats and so cannot be a map key; rebuild and
/// scope comparison go through this instead. Reals compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    Null,
    Integer(i64),
    Real(u64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<&Value> for ValueKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => ValueKey::Null,
            Value::Integer(i) => ValueKey::Integer(*i),
            Value::Real(r) => ValueKey::Real(r.to_bits()),
            Value::Text(s) => ValueKey::Text(s.clone()),
            Value::Blob(b) => ValueKey::Blob(b.clone()),
        }
    }
}

/// Storage-level equality of two column values
pub fn same_value(a: &Value, b: &Value) -> bool {
    ValueKey::from(a) == ValueKey::from(b)
}
