//! Schema 反射：由 `Record` 的字段声明推导表结构描述（Descriptor）。

use crate::error::{Error, Result};
use crate::naming::{NamingStrategy, snake_case};
use crate::record::{ColumnKind, Record, Role, SoftDeleteMode, TimeUnit};
use crate::value::SqlValue;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, RwLock};

/// 表中的一列。
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// 对应的 record 字段名。
    pub field: &'static str,
    pub role: Role,
    pub kind: ColumnKind,
    /// 字段类型为 `Option<_>`。
    pub nullable: bool,
    pub not_null: bool,
    pub default: Option<SqlValue>,
}

impl Column {
    pub fn is_primary_key(&self) -> bool {
        self.role == Role::PrimaryKey
    }

    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self.role {
            Role::AutoCreateTime(u) | Role::AutoUpdateTime(u) => Some(u),
            _ => None,
        }
    }

    pub fn soft_delete_mode(&self) -> Option<SoftDeleteMode> {
        match self.role {
            Role::SoftDelete(m) => Some(m),
            _ => None,
        }
    }
}

/// 一个 record 形状的表结构描述，构建后只读。
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub shape: &'static str,
    pub table: String,
    pub columns: Vec<Column>,

    pk: usize,
    auto_create: Option<usize>,
    auto_update: Option<usize>,
    soft_delete: Option<usize>,
}

impl Descriptor {
    pub fn primary_key(&self) -> &Column {
        &self.columns[self.pk]
    }

    pub fn auto_create_column(&self) -> Option<&Column> {
        self.auto_create.map(|i| &self.columns[i])
    }

    pub fn auto_update_column(&self) -> Option<&Column> {
        self.auto_update.map(|i| &self.columns[i])
    }

    pub fn soft_delete_column(&self) -> Option<&Column> {
        self.soft_delete.map(|i| &self.columns[i])
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_by_field(&self, field: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// 按列名、字段名、`snake_case(key)` 的顺序解析 key。
    pub fn resolve(&self, key: &str) -> Option<&Column> {
        self.column(key)
            .or_else(|| self.column_by_field(key))
            .or_else(|| self.column(&snake_case(key)))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

type Cache = RwLock<HashMap<(TypeId, NamingStrategy), Arc<Descriptor>>>;

static DESCRIPTORS: OnceLock<Cache> = OnceLock::new();

fn cache() -> &'static Cache {
    DESCRIPTORS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// 获取 `T` 在给定命名策略下的 Descriptor；首次使用时构建并进程级缓存。
///
/// 声明不合法时返回 `Error::Schema`，失败结果不缓存。
pub fn describe<T: Record>(naming: &NamingStrategy) -> Result<Arc<Descriptor>> {
    let key = (TypeId::of::<T>(), naming.clone());
    {
        let read = cache().read().unwrap_or_else(|e| e.into_inner());
        if let Some(d) = read.get(&key) {
            return Ok(Arc::clone(d));
        }
    }

    let built = Arc::new(build_descriptor::<T>(naming)?);
    let mut write = cache().write().unwrap_or_else(|e| e.into_inner());
    let entry = write.entry(key).or_insert(built);
    Ok(Arc::clone(entry))
}

fn build_descriptor<T: Record>(naming: &NamingStrategy) -> Result<Descriptor> {
    let shape = T::shape();
    let table = match T::table_override() {
        Some(t) => t.to_string(),
        None => naming.table_name(shape),
    };

    let fields = T::fields();
    let declared_pk = fields.iter().any(|f| f.opts.role == Role::PrimaryKey);

    let mut columns = Vec::with_capacity(fields.len());
    let mut seen = HashSet::new();
    let mut pk = None;
    let mut auto_create = None;
    let mut auto_update = None;
    let mut soft_delete = None;

    for (idx, f) in fields.into_iter().enumerate() {
        let name = match f.opts.column {
            Some(c) => c.to_string(),
            None => naming.column_name(f.name),
        };
        if !seen.insert(name.clone()) {
            return Err(schema_err(shape, format!("duplicate column `{name}`")));
        }

        let mut role = f.opts.role;
        if role == Role::Plain && !declared_pk && f.name == "id" {
            role = Role::PrimaryKey;
        }

        let slot = match role {
            Role::Plain => None,
            Role::PrimaryKey => Some((&mut pk, "primary key")),
            Role::AutoCreateTime(unit) => {
                check_time_kind(shape, f.name, unit, f.kind)?;
                Some((&mut auto_create, "auto-create time column"))
            }
            Role::AutoUpdateTime(unit) => {
                check_time_kind(shape, f.name, unit, f.kind)?;
                Some((&mut auto_update, "auto-update time column"))
            }
            Role::SoftDelete(_) => {
                if !f.kind.is_integer() {
                    return Err(schema_err(
                        shape,
                        format!("soft-delete field `{}` must be an integer", f.name),
                    ));
                }
                Some((&mut soft_delete, "soft-delete column"))
            }
        };
        if let Some((slot, what)) = slot {
            if slot.is_some() {
                return Err(schema_err(shape, format!("more than one {what}")));
            }
            *slot = Some(idx);
        }

        let default = match (role, f.opts.default) {
            (Role::SoftDelete(_), None) => Some(SqlValue::I64(0)),
            (_, d) => d,
        };

        columns.push(Column {
            name,
            field: f.name,
            role,
            kind: f.kind,
            nullable: f.nullable,
            not_null: f.opts.not_null || role == Role::PrimaryKey,
            default,
        });
    }

    let pk = pk.ok_or_else(|| schema_err(shape, "no primary key (declare one or add an `id` field)"))?;

    Ok(Descriptor {
        shape,
        table,
        columns,
        pk,
        auto_create,
        auto_update,
        soft_delete,
    })
}

fn check_time_kind(shape: &str, field: &str, unit: TimeUnit, kind: ColumnKind) -> Result<()> {
    let ok = match unit {
        TimeUnit::DateTime => kind == ColumnKind::DateTime,
        TimeUnit::Seconds | TimeUnit::Milliseconds => kind.is_integer(),
    };
    if ok {
        Ok(())
    } else {
        Err(schema_err(
            shape,
            format!("timestamp field `{field}` does not match unit {unit:?}"),
        ))
    }
}

fn schema_err(shape: &str, msg: impl std::fmt::Display) -> Error {
    Error::Schema(format!("{shape}: {msg}"))
}
