use time::OffsetDateTime;

use crate::database::value::Value;

/// Read and write access to one bound record field.
///
/// `set_value` returns the name of the expected type when the cell cannot be coerced.
pub trait Field {
    fn to_value(&self) -> Value;

    /// # Errors
    /// Will return `Err` with the expected type name if `value` does not fit this field.
    fn set_value(&mut self, value: &Value) -> Result<(), &'static str>;
}

/// Conversion between a field type and the engine's storage classes.
///
/// Conversions only succeed when no information is lost, a real with a fraction never
/// becomes an integer.
pub trait FieldValue: Sized {
    const TYPE: &'static str;

    fn from_value(value: &Value) -> Option<Self>;

    fn to_value(&self) -> Value;
}

impl<T: FieldValue> Field for T {
    fn to_value(&self) -> Value {
        FieldValue::to_value(self)
    }

    fn set_value(&mut self, value: &Value) -> Result<(), &'static str> {
        *self = T::from_value(value).ok_or(T::TYPE)?;
        Ok(())
    }
}

impl FieldValue for i64 {
    const TYPE: &'static str = "integer";

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(*i),
            Value::Real(r) if r.fract() == 0.0 && r.abs() < i64::MAX as f64 => Some(*r as i64),
            Value::Text(t) => t.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }
}

impl FieldValue for i32 {
    const TYPE: &'static str = "32-bit integer";

    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| i32::try_from(i).ok())
    }

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl FieldValue for u32 {
    const TYPE: &'static str = "unsigned 32-bit integer";

    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| u32::try_from(i).ok())
    }

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl FieldValue for f64 {
    const TYPE: &'static str = "real";

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Real(r) => Some(*r),
            Value::Integer(i) => Some(*i as f64),
            Value::Text(t) => t.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }
}

impl FieldValue for bool {
    const TYPE: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(*i != 0),
            Value::Text(t) => match t.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl FieldValue for String {
    const TYPE: &'static str = "text";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(t) => Some(t.clone()),
            Value::Integer(_) | Value::Real(_) => Some(value.to_string()),
            Value::Blob(b) => String::from_utf8(b.clone()).ok(),
            Value::Null => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FieldValue for Vec<u8> {
    const TYPE: &'static str = "blob";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Blob(b) => Some(b.clone()),
            Value::Text(t) => Some(t.clone().into_bytes()),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }
}

/// Stored as unix seconds.
impl FieldValue for OffsetDateTime {
    const TYPE: &'static str = "unix timestamp";

    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|t| OffsetDateTime::from_unix_timestamp(t).ok())
    }

    fn to_value(&self) -> Value {
        Value::Integer(self.unix_timestamp())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const TYPE: &'static str = T::TYPE;

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            return Some(None);
        }
        T::from_value(value).map(Some)
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }
}
