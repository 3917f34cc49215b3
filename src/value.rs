//! SQL 参数值类型，以及与驱动值、record 字段之间的转换。

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use std::borrow::Cow;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// SQL 参数值。
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(Cow<'static, str>),
    Bytes(Vec<u8>),
    DateTime(OffsetDateTime),
}

/// 显式 key-value 映射：每个 entry 都参与（不论是否为零值）。
///
/// 使用 `BTreeMap` 保证生成的 SQL 列顺序稳定。
pub type ValueMap = BTreeMap<String, SqlValue>;

/// 构造 `ValueMap` 的便捷宏。
///
/// ```ignore
/// let m = value_map! { "name" => "x", "age" => 0_i64 };
/// ```
#[macro_export]
macro_rules! value_map {
    () => {
        $crate::value::ValueMap::new()
    };
    ($($k:expr => $v:expr),+ $(,)?) => {{
        let mut m = $crate::value::ValueMap::new();
        $(
            m.insert(String::from($k), $crate::value::SqlValue::from($v));
        )+
        m
    }};
}

impl SqlValue {
    /// 将 `Option<T>` 映射为 `SqlValue`：`None => Null`，`Some(v) => v.into()`。
    pub fn from_option<T: Into<SqlValue>>(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub(crate) fn from_value_ref(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::I64(i),
            ValueRef::Real(f) => Self::F64(f),
            ValueRef::Text(t) => Self::String(Cow::Owned(String::from_utf8_lossy(t).into_owned())),
            ValueRef::Blob(b) => Self::Bytes(b.to_vec()),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            Self::U64(v) => i64::try_from(*v).ok(),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::F64(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let out = match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            Self::I64(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            Self::U64(v) => {
                let v = i64::try_from(*v)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                ToSqlOutput::Owned(Value::Integer(v))
            }
            Self::F64(v) => ToSqlOutput::Owned(Value::Real(*v)),
            Self::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Self::DateTime(dt) => {
                let s = dt
                    .format(&Rfc3339)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                ToSqlOutput::Owned(Value::Text(s))
            }
        };
        Ok(out)
    }
}

impl From<()> for SqlValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! from_signed {
    ($($t:ty),+ $(,)?) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                Self::I64(v as i64)
            }
        })+
    };
}

macro_rules! from_unsigned {
    ($($t:ty),+ $(,)?) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                Self::U64(v as u64)
            }
        })+
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::F64(v as f64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(Cow::Owned(v))
    }
}

impl From<&'static str> for SqlValue {
    fn from(v: &'static str) -> Self {
        Self::String(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<OffsetDateTime> for SqlValue {
    fn from(v: OffsetDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        Self::from_option(v)
    }
}

/// 解码错误信息（由调用方补充列名后转成 `Error::Decode`）。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    fn mismatch(expected: &str, got: &SqlValue) -> Self {
        Self(format!("expected {expected}, got {got:?}"))
    }
}

/// 从结果值写回 record 字段或标量集合。
///
/// 非 `Option` 类型遇到 `NULL` 时取零值。
pub trait FromSqlValue: Sized {
    fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError>;
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError> {
        Ok(v)
    }
}

impl FromSqlValue for String {
    fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError> {
        match v {
            SqlValue::Null => Ok(String::new()),
            SqlValue::String(s) => Ok(s.into_owned()),
            SqlValue::I64(n) => Ok(n.to_string()),
            SqlValue::U64(n) => Ok(n.to_string()),
            SqlValue::F64(n) => Ok(n.to_string()),
            SqlValue::Bool(b) => Ok(b.to_string()),
            SqlValue::Bytes(b) => {
                String::from_utf8(b).map_err(|e| DecodeError(format!("invalid utf8: {e}")))
            }
            SqlValue::DateTime(dt) => dt
                .format(&Rfc3339)
                .map_err(|e| DecodeError(format!("format datetime: {e}"))),
        }
    }
}

macro_rules! decode_int {
    ($($t:ty),+ $(,)?) => {
        $(impl FromSqlValue for $t {
            fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError> {
                if v.is_null() {
                    return Ok(0);
                }
                let n = v.as_i64().ok_or_else(|| DecodeError::mismatch(stringify!($t), &v))?;
                <$t>::try_from(n).map_err(|_| {
                    DecodeError(format!("value {n} out of range for {}", stringify!($t)))
                })
            }
        })+
    };
}

decode_int!(i8, i16, i32, i64, isize, u8, u16, u32, usize);

impl FromSqlValue for u64 {
    fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError> {
        match v {
            SqlValue::Null => Ok(0),
            SqlValue::U64(n) => Ok(n),
            other => {
                let n = other
                    .as_i64()
                    .ok_or_else(|| DecodeError::mismatch("u64", &other))?;
                u64::try_from(n).map_err(|_| DecodeError(format!("value {n} out of range for u64")))
            }
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError> {
        match v {
            SqlValue::Null => Ok(0.0),
            SqlValue::F64(f) => Ok(f),
            SqlValue::I64(n) => Ok(n as f64),
            SqlValue::U64(n) => Ok(n as f64),
            SqlValue::String(ref s) => s.trim().parse().map_err(|_| DecodeError::mismatch("f64", &v)),
            other => Err(DecodeError::mismatch("f64", &other)),
        }
    }
}

impl FromSqlValue for f32 {
    fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError> {
        f64::from_sql_value(v).map(|f| f as f32)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError> {
        match v {
            SqlValue::Null => Ok(false),
            SqlValue::Bool(b) => Ok(b),
            SqlValue::String(ref s) => match s.as_ref() {
                "true" | "TRUE" | "1" => Ok(true),
                "false" | "FALSE" | "0" => Ok(false),
                _ => Err(DecodeError::mismatch("bool", &v)),
            },
            other => other
                .as_i64()
                .map(|n| n != 0)
                .ok_or_else(|| DecodeError::mismatch("bool", &other)),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError> {
        match v {
            SqlValue::Null => Ok(Vec::new()),
            SqlValue::Bytes(b) => Ok(b),
            SqlValue::String(s) => Ok(s.into_owned().into_bytes()),
            other => Err(DecodeError::mismatch("bytes", &other)),
        }
    }
}

impl FromSqlValue for OffsetDateTime {
    fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError> {
        match v {
            SqlValue::Null => Ok(OffsetDateTime::UNIX_EPOCH),
            SqlValue::DateTime(dt) => Ok(dt),
            SqlValue::String(ref s) => OffsetDateTime::parse(s, &Rfc3339)
                .map_err(|e| DecodeError(format!("parse datetime `{s}`: {e}"))),
            other => {
                let secs = other
                    .as_i64()
                    .ok_or_else(|| DecodeError::mismatch("datetime", &other))?;
                OffsetDateTime::from_unix_timestamp(secs)
                    .map_err(|e| DecodeError(format!("unix timestamp {secs}: {e}")))
            }
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(v: SqlValue) -> Result<Self, DecodeError> {
        if v.is_null() {
            return Ok(None);
        }
        T::from_sql_value(v).map(Some)
    }
}
