//! Bound argument values.
//!
//! Arguments are stored as [`Value`], a closed set of the types the
//! execution layer knows how to encode. Builder methods accept anything that
//! implements [`IntoArgs`]: `()`, arrays and `Vec`s of `Into<Value>` items,
//! or the output of the [`args!`](crate::args) macro for mixed types.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

/// A single bound argument or scanned column value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
    Json(serde_json::Value),
    /// A caller-formatted named parameter (SQL Server `@name` style).
    ///
    /// The name is carried for executors that bind by name; Postgres-style
    /// executors encode the inner value positionally.
    Named { name: String, value: Box<Value> },
}

impl Value {
    /// Wrap a value as a named parameter.
    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Value::Named {
            name: name.into(),
            value: Box::new(value.into()),
        }
    }

    /// Short type name, used in decode error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int2(_) => "int2",
            Value::Int4(_) => "int4",
            Value::Int8(_) => "int8",
            Value::Float4(_) => "float4",
            Value::Float8(_) => "float8",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytea",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Date(_) => "date",
            Value::Json(_) => "json",
            Value::Named { value, .. } => value.kind(),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Named { value, .. } => value.is_null(),
            _ => false,
        }
    }

    fn as_to_sql(&self) -> Option<&(dyn ToSql + Sync)> {
        let inner: &(dyn ToSql + Sync) = match self {
            Value::Null => return None,
            Value::Bool(v) => v,
            Value::Int2(v) => v,
            Value::Int4(v) => v,
            Value::Int8(v) => v,
            Value::Float4(v) => v,
            Value::Float8(v) => v,
            Value::Text(v) => v,
            Value::Bytes(v) => v,
            Value::Uuid(v) => v,
            Value::Timestamp(v) => v,
            Value::TimestampTz(v) => v,
            Value::Date(v) => v,
            Value::Json(v) => v,
            Value::Named { value, .. } => return value.as_to_sql(),
        };
        Some(inner)
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        self.to_sql_checked(ty, out)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        // Narrower numbers widen to the inferred parameter type (LIMIT is int8).
        match *self {
            Value::Int2(v) if *ty == Type::INT4 => i32::from(v).to_sql_checked(ty, out),
            Value::Int2(v) if *ty == Type::INT8 => i64::from(v).to_sql_checked(ty, out),
            Value::Int4(v) if *ty == Type::INT8 => i64::from(v).to_sql_checked(ty, out),
            Value::Float4(v) if *ty == Type::FLOAT8 => f64::from(v).to_sql_checked(ty, out),
            Value::Named { ref value, .. } => value.to_sql_checked(ty, out),
            _ => match self.as_to_sql() {
                None => Ok(IsNull::Yes),
                Some(inner) => inner.to_sql_checked(ty, out),
            },
        }
    }
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int2(i16::from_sql(ty, raw)?),
            Type::INT4 => Value::Int4(i32::from_sql(ty, raw)?),
            Type::INT8 => Value::Int8(i64::from_sql(ty, raw)?),
            Type::FLOAT4 => Value::Float4(f32::from_sql(ty, raw)?),
            Type::FLOAT8 => Value::Float8(f64::from_sql(ty, raw)?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                Value::Text(String::from_sql(ty, raw)?)
            }
            Type::BYTEA => Value::Bytes(Vec::<u8>::from_sql(ty, raw)?),
            Type::UUID => Value::Uuid(uuid::Uuid::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::TimestampTz(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::DATE => Value::Date(NaiveDate::from_sql(ty, raw)?),
            Type::JSON | Type::JSONB => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            _ => return Err(format!("unsupported column type: {ty}").into()),
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Value::Null)
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::BOOL
                | Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::UNKNOWN
                | Type::BYTEA
                | Type::UUID
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
        )
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    f32 => Float4,
    f64 => Float8,
    String => Text,
    Vec<u8> => Bytes,
    uuid::Uuid => Uuid,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    NaiveDate => Date,
    serde_json::Value => Json,
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int8(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Error returned when a scanned [`Value`] does not fit the destination type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot assign {found} to {expected}")]
pub struct TypeMismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

/// Conversion from a scanned [`Value`] into a destination type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, TypeMismatch>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

macro_rules! impl_from_value {
    ($ty:ty, $name:literal, { $($pat:pat => $out:expr),* $(,)? }) => {
        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, TypeMismatch> {
                match value {
                    $($pat => Ok($out),)*
                    Value::Named { value, .. } => <$ty>::from_value(*value),
                    other => Err(TypeMismatch { expected: $name, found: other.kind() }),
                }
            }
        }
    };
}

impl_from_value!(bool, "bool", { Value::Bool(v) => v });
impl_from_value!(i16, "i16", { Value::Int2(v) => v });
impl_from_value!(i32, "i32", {
    Value::Int2(v) => i32::from(v),
    Value::Int4(v) => v,
});
impl_from_value!(i64, "i64", {
    Value::Int2(v) => i64::from(v),
    Value::Int4(v) => i64::from(v),
    Value::Int8(v) => v,
});
impl_from_value!(f32, "f32", { Value::Float4(v) => v });
impl_from_value!(f64, "f64", {
    Value::Float4(v) => f64::from(v),
    Value::Float8(v) => v,
});
impl_from_value!(String, "String", { Value::Text(v) => v });
impl_from_value!(Vec<u8>, "Vec<u8>", { Value::Bytes(v) => v });
impl_from_value!(uuid::Uuid, "Uuid", { Value::Uuid(v) => v });
impl_from_value!(NaiveDateTime, "NaiveDateTime", { Value::Timestamp(v) => v });
impl_from_value!(DateTime<Utc>, "DateTime<Utc>", { Value::TimestampTz(v) => v });
impl_from_value!(NaiveDate, "NaiveDate", { Value::Date(v) => v });
impl_from_value!(serde_json::Value, "serde_json::Value", { Value::Json(v) => v });

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int2(v) => write!(f, "{v}"),
            Value::Int4(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Float4(v) => write!(f, "{v}"),
            Value::Float8(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Uuid(v) => write!(f, "'{v}'"),
            Value::Timestamp(v) => write!(f, "'{v}'"),
            Value::TimestampTz(v) => write!(f, "'{v}'"),
            Value::Date(v) => write!(f, "'{v}'"),
            Value::Json(v) => write!(f, "'{v}'"),
            Value::Named { name, value } => write!(f, "@{name}={value}"),
        }
    }
}

/// Anything that can be turned into an ordered, counted list of arguments.
///
/// The count must be known up front: the chunk engine records how many
/// arguments each clause introduced.
pub trait IntoArgs {
    type Iter: ExactSizeIterator<Item = Value>;

    fn into_args(self) -> Self::Iter;
}

impl IntoArgs for () {
    type Iter = std::iter::Empty<Value>;

    fn into_args(self) -> Self::Iter {
        std::iter::empty()
    }
}

impl<T: Into<Value>, const N: usize> IntoArgs for [T; N] {
    type Iter = std::iter::Map<std::array::IntoIter<T, N>, fn(T) -> Value>;

    fn into_args(self) -> Self::Iter {
        self.into_iter().map(<T as Into<Value>>::into as fn(T) -> Value)
    }
}

impl<T: Into<Value>> IntoArgs for Vec<T> {
    type Iter = std::iter::Map<std::vec::IntoIter<T>, fn(T) -> Value>;

    fn into_args(self) -> Self::Iter {
        self.into_iter().map(<T as Into<Value>>::into as fn(T) -> Value)
    }
}

/// Build an argument array from values of mixed types.
///
/// ```
/// use sqlweave::{args, Value};
///
/// let a = args![1_i64, "active", None::<i32>];
/// assert_eq!(a[1], Value::Text("active".into()));
/// assert_eq!(a[2], Value::Null);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        [] as [$crate::Value; 0]
    };
    ($($value:expr),+ $(,)?) => {
        [$($crate::Value::from($value)),+]
    };
}
