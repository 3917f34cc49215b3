//! Record：把业务 struct 声明为一张表的行。
//!
//! Rust 没有运行时反射；`record!` 宏为已有 struct 生成字段元数据、取值、零值判断与回写逻辑，
//! 字段角色（主键、自动时间戳、软删除、默认值）在宏里显式声明。

use crate::error::Result;
use crate::value::{DecodeError, SqlValue};
use time::OffsetDateTime;

/// 自动时间戳写入的单位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    /// 字段类型本身是时间（`OffsetDateTime`）。
    DateTime,
}

impl TimeUnit {
    pub fn value_at(self, now: OffsetDateTime) -> SqlValue {
        match self {
            Self::Seconds => SqlValue::I64(now.unix_timestamp()),
            Self::Milliseconds => SqlValue::I64((now.unix_timestamp_nanos() / 1_000_000) as i64),
            Self::DateTime => SqlValue::DateTime(now),
        }
    }
}

/// 软删除标记的写法；未删除行的标记恒为 `0`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoftDeleteMode {
    /// 删除时写入 `1`。
    Flag,
    /// 删除时写入当前 unix 秒。
    UnixSeconds,
}

impl SoftDeleteMode {
    pub fn deleted_marker(self, now: OffsetDateTime) -> SqlValue {
        match self {
            Self::Flag => SqlValue::I64(1),
            Self::UnixSeconds => SqlValue::I64(now.unix_timestamp()),
        }
    }

    pub fn not_deleted() -> SqlValue {
        SqlValue::I64(0)
    }
}

/// 列的语义角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Plain,
    /// 自增主键。
    PrimaryKey,
    AutoCreateTime(TimeUnit),
    AutoUpdateTime(TimeUnit),
    SoftDelete(SoftDeleteMode),
}

/// 字段的存储类型，由 Rust 类型推导。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Text,
    Bytes,
    DateTime,
}

impl ColumnKind {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
        )
    }
}

/// 可以作为列的字段类型。
pub trait ColumnType {
    const KIND: ColumnKind;
    const NULLABLE: bool = false;
}

macro_rules! column_type {
    ($($t:ty => $kind:ident),+ $(,)?) => {
        $(impl ColumnType for $t {
            const KIND: ColumnKind = ColumnKind::$kind;
        })+
    };
}

column_type!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    isize => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    usize => UInt64,
    f32 => Float,
    f64 => Double,
    String => Text,
    Vec<u8> => Bytes,
    OffsetDateTime => DateTime,
);

impl<T: ColumnType> ColumnType for Option<T> {
    const KIND: ColumnKind = T::KIND;
    const NULLABLE: bool = true;
}

/// 零值判断：结构体模式的过滤与更新会跳过零值字段。
///
/// `Option<T>` 是显式的“有/无”包装：`None` 是零值，`Some(_)` 永远不是，
/// 因此 `Some(0)` 可以把 0 作为条件或更新值。
pub trait IsZero {
    fn is_zero(&self) -> bool;
}

impl IsZero for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for Vec<u8> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for bool {
    fn is_zero(&self) -> bool {
        !*self
    }
}

macro_rules! zero_num {
    ($($t:ty),+ $(,)?) => {
        $(impl IsZero for $t {
            fn is_zero(&self) -> bool {
                *self == 0
            }
        })+
    };
}

zero_num!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl IsZero for f32 {
    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl IsZero for f64 {
    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl IsZero for OffsetDateTime {
    fn is_zero(&self) -> bool {
        *self == OffsetDateTime::UNIX_EPOCH
    }
}

impl<T> IsZero for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

/// 单个字段的声明选项，由 `field()` 开始链式构造。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldOpts {
    pub(crate) column: Option<&'static str>,
    pub(crate) role: Role,
    pub(crate) not_null: bool,
    pub(crate) default: Option<SqlValue>,
}

pub fn field() -> FieldOpts {
    FieldOpts::default()
}

impl FieldOpts {
    /// 显式指定列名。
    pub fn column(mut self, name: &'static str) -> Self {
        self.column = Some(name);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.role = Role::PrimaryKey;
        self
    }

    pub fn auto_create_time(mut self, unit: TimeUnit) -> Self {
        self.role = Role::AutoCreateTime(unit);
        self
    }

    pub fn auto_update_time(mut self, unit: TimeUnit) -> Self {
        self.role = Role::AutoUpdateTime(unit);
        self
    }

    pub fn soft_delete(mut self, mode: SoftDeleteMode) -> Self {
        self.role = Role::SoftDelete(mode);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// 建表时的 `DEFAULT`；创建记录时零值字段也会取该值。
    pub fn default_value(mut self, v: impl Into<SqlValue>) -> Self {
        self.default = Some(v.into());
        self
    }
}

/// `record!` 生成的字段元数据。
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub opts: FieldOpts,
}

impl FieldMeta {
    pub fn new<T: ColumnType>(name: &'static str, opts: FieldOpts) -> Self {
        Self {
            name,
            kind: T::KIND,
            nullable: T::NULLABLE,
            opts,
        }
    }
}

/// 一张表的一行。一般通过 `record!` 实现。
///
/// `OffsetDateTime` 没有 `Default`：时间字段声明为 `Option<OffsetDateTime>`，
/// 或手写 `Default` 并以 `UNIX_EPOCH` 作为零值。
pub trait Record: Default + 'static {
    /// 形状名（struct 名），用于推导表名。
    fn shape() -> &'static str;

    fn table_override() -> Option<&'static str> {
        None
    }

    /// 按声明顺序返回字段元数据。
    fn fields() -> Vec<FieldMeta>;

    /// 取字段当前值；未知字段返回 `None`。
    fn field_value(&self, field: &str) -> Option<SqlValue>;

    fn is_zero_field(&self, field: &str) -> bool;

    /// 用结果值回写字段。
    fn set_field(&mut self, field: &str, value: SqlValue) -> std::result::Result<(), DecodeError>;

    /// 创建前的钩子，可以修改即将写入的记录。
    fn before_create(&mut self) -> Result<()> {
        Ok(())
    }
}

/// 为已有 struct 实现 `Record`。
///
/// ```ignore
/// #[derive(Debug, Clone, Default)]
/// struct User { id: u64, name: String, age: u8, email: Option<String> }
///
/// record! {
///     impl User in "t_users" {
///         id: u64 = field().primary_key(),
///         name: String = field(),
///         age: u8 = field(),
///         email: Option<String> = field().default_value("default@gmail.com"),
///     }
///     before_create = User::default_age;
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        impl $ty:ident $(in $table:literal)? {
            $( $field:ident : $fty:ty = $opts:expr ),* $(,)?
        }
        $(before_create = $hook:path;)?
    ) => {
        impl $crate::record::Record for $ty {
            fn shape() -> &'static str {
                stringify!($ty)
            }

            fn table_override() -> Option<&'static str> {
                None $(.or(Some($table)))?
            }

            #[allow(unused_imports)]
            fn fields() -> Vec<$crate::record::FieldMeta> {
                use $crate::record::{field, SoftDeleteMode, TimeUnit};
                vec![
                    $(
                        $crate::record::FieldMeta::new::<$fty>(stringify!($field), $opts)
                    ),*
                ]
            }

            fn field_value(&self, field: &str) -> Option<$crate::value::SqlValue> {
                match field {
                    $(
                        stringify!($field) => Some($crate::value::SqlValue::from(self.$field.clone())),
                    )*
                    _ => None,
                }
            }

            fn is_zero_field(&self, field: &str) -> bool {
                match field {
                    $(
                        stringify!($field) => $crate::record::IsZero::is_zero(&self.$field),
                    )*
                    _ => true,
                }
            }

            fn set_field(
                &mut self,
                field: &str,
                value: $crate::value::SqlValue,
            ) -> std::result::Result<(), $crate::value::DecodeError> {
                match field {
                    $(
                        stringify!($field) => {
                            self.$field = <$fty as $crate::value::FromSqlValue>::from_sql_value(value)?;
                            Ok(())
                        }
                    )*
                    other => Err($crate::value::DecodeError(format!("unknown field `{other}`"))),
                }
            }

            #[allow(unreachable_code)]
            fn before_create(&mut self) -> $crate::error::Result<()> {
                $( return $hook(self); )?
                Ok(())
            }
        }
    };
}
