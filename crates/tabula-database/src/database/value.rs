use core::fmt;

use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, ValueRef};
use time::OffsetDateTime;

/// A single cell or positional parameter crossing the engine boundary.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Name of the storage class held by this value.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Blob(value.to_vec())
    }
}

/// Timestamps are stored as unix seconds (utc).
impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Self::Integer(value.unix_timestamp())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(r) => Self::Real(r),
            // text that is not valid utf-8 stays raw, text fields then reject it
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(text) => Self::Text(text.to_string()),
                Err(_) => Self::Blob(t.to_vec()),
            },
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Self::Null => ValueRef::Null,
            Self::Integer(i) => ValueRef::Integer(*i),
            Self::Real(r) => ValueRef::Real(*r),
            Self::Text(s) => ValueRef::Text(s.as_bytes()),
            Self::Blob(b) => ValueRef::Blob(b),
        }))
    }
}

/// Build a positional parameter list out of mixed Rust values.
///
/// ```
/// use tabula_database::{args, database::value::Value};
///
/// let params = args!["Pirlo", 5, 2.5];
/// assert_eq!(params[1], Value::Integer(5));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::database::value::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::database::value::Value::from($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_macro() {
        let params = args!["Baloteli", 10, None::<i64>, 1.5];
        assert_eq!(
            params,
            vec![
                Value::Text("Baloteli".into()),
                Value::Integer(10),
                Value::Null,
                Value::Real(1.5),
            ]
        );
        assert!(args![].is_empty());
    }

    #[test]
    fn test_kind_and_display() {
        assert_eq!(Value::from(true).kind(), "integer");
        assert_eq!(Value::Blob(vec![1, 2]).to_string(), "<2 bytes>");
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn test_invalid_utf8_text_kept_raw() {
        assert_eq!(Value::from(ValueRef::Text(b"Pirlo")), Value::Text("Pirlo".into()));
        assert_eq!(
            Value::from(ValueRef::Text(&[0xff, 0xfe, b'A'])),
            Value::Blob(vec![0xff, 0xfe, b'A'])
        );
    }
}
