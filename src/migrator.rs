//! 迁移：按 Descriptor 建表，或为已存在的表补齐缺失的列。
//!
//! 只做“不存在则创建 + 补列”，从不删除列、不修改列类型。

use crate::create_table::{AddColumnBuilder, CreateTableBuilder, DropTableBuilder};
use crate::error::{Error, Result};
use crate::executor::{Executor, Statement};
use crate::flavor::Flavor;
use crate::modifiers::escape;
use crate::query::ident;
use crate::record::{ColumnKind, Record};
use crate::schema::{Column, Descriptor, describe};
use crate::select::SelectBuilder;
use crate::value::{FromSqlValue, SqlValue};
use log::{error, info};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateMode {
    /// 表存在时什么也不做。
    CreateOnly,
    /// 表存在时补齐缺失的列。
    Reconcile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created: bool,
    pub added_columns: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        !self.created && self.added_columns.is_empty()
    }
}

pub struct Migrator<'a> {
    exec: &'a dyn Executor,
}

impl<'a> Migrator<'a> {
    pub fn new(exec: &'a dyn Executor) -> Self {
        Self { exec }
    }

    fn descriptor<T: Record>(&self) -> Result<Arc<Descriptor>> {
        describe::<T>(&self.exec.settings().naming)
    }

    fn flavor(&self) -> Flavor {
        self.exec.flavor()
    }

    pub fn has_table<T: Record>(&self) -> Result<bool> {
        let d = self.descriptor::<T>()?;
        self.has_table_named(&d.table)
    }

    pub fn has_table_named(&self, table: &str) -> Result<bool> {
        let mut sb = SelectBuilder::new();
        let conds = match self.flavor() {
            Flavor::SQLite => vec![
                sb.equal("type", "table"),
                sb.equal("name", table.to_string()),
            ],
            flavor => vec![
                format!("table_schema = {}", current_schema(flavor)),
                sb.equal("table_name", table.to_string()),
                sb.equal("table_type", "BASE TABLE"),
            ],
        };
        let from = if self.flavor() == Flavor::SQLite {
            "sqlite_master"
        } else {
            "information_schema.tables"
        };
        sb.select("count(*)").from(from);
        sb.where_(conds);
        let stmt = Statement::from_builder(&sb, self.flavor())?;
        let rows = self.exec.query(&stmt)?;
        let n = rows
            .into_iter()
            .next()
            .and_then(|r| r.values.into_iter().next())
            .unwrap_or(SqlValue::I64(0));
        let n = i64::from_sql_value(n).map_err(|e| Error::Decode {
            column: "count(*)".to_string(),
            message: e.0,
        })?;
        Ok(n > 0)
    }

    /// 表中现有的列名，按定义顺序。
    pub fn columns_of(&self, table: &str) -> Result<Vec<String>> {
        let stmt = match self.flavor() {
            Flavor::SQLite => Statement::new(
                "SELECT name FROM pragma_table_info(?) ORDER BY cid",
                vec![SqlValue::from(table.to_string())],
            ),
            flavor => {
                let mut sb = SelectBuilder::new();
                let conds = vec![
                    format!("table_schema = {}", current_schema(flavor)),
                    sb.equal("table_name", table.to_string()),
                ];
                sb.select("column_name").from("information_schema.columns");
                sb.where_(conds).order_by("ordinal_position");
                Statement::from_builder(&sb, flavor)?
            }
        };
        self.exec
            .query(&stmt)?
            .into_iter()
            .map(|r| {
                let v = r.values.into_iter().next().unwrap_or(SqlValue::Null);
                String::from_sql_value(v).map_err(|e| Error::Decode {
                    column: "name".to_string(),
                    message: e.0,
                })
            })
            .collect()
    }

    /// `column` 可以是列名或字段名。
    pub fn has_column<T: Record>(&self, column: &str) -> Result<bool> {
        let d = self.descriptor::<T>()?;
        let name = d.resolve(column).map_or(column, |c| c.name.as_str());
        Ok(self
            .columns_of(&d.table)?
            .iter()
            .any(|c| c.eq_ignore_ascii_case(name)))
    }

    pub fn create_table<T: Record>(&self) -> Result<()> {
        let d = self.descriptor::<T>()?;
        let stmt = create_table_statement(&d, self.flavor())?;
        self.run(&d.table, vec![stmt])
    }

    pub fn drop_table<T: Record>(&self) -> Result<()> {
        let d = self.descriptor::<T>()?;
        let flavor = self.flavor();
        let drop = DropTableBuilder::new(&flavor.quote_ident(&d.table));
        let stmt = Statement::from_builder(&drop, flavor)?;
        self.run(&d.table, vec![stmt])
    }

    /// 添加 record 中声明的一列（列名或字段名）。
    pub fn add_column<T: Record>(&self, column: &str) -> Result<()> {
        let d = self.descriptor::<T>()?;
        let col = d.resolve(column).ok_or_else(|| {
            Error::Parameter(format!("{} has no column `{column}`", d.shape))
        })?;
        let stmt = add_column_statement(&d.table, col, self.flavor())?;
        self.run(&d.table, vec![stmt])
    }

    /// 确保表存在；`Reconcile` 模式下补齐缺失列。重复执行不会产生变化。
    pub fn ensure_table<T: Record>(&self, mode: MigrateMode) -> Result<MigrationReport> {
        let started_at = Instant::now();
        let d = self.descriptor::<T>()?;
        let flavor = self.flavor();
        let mut report = MigrationReport::default();
        let mut stmts = Vec::new();

        if !self.has_table_named(&d.table)? {
            stmts.push(create_table_statement(&d, flavor)?);
            report.created = true;
        } else if mode == MigrateMode::Reconcile {
            let existing = self.columns_of(&d.table)?;
            for col in &d.columns {
                if existing.iter().any(|c| c.eq_ignore_ascii_case(&col.name)) {
                    continue;
                }
                stmts.push(add_column_statement(&d.table, col, flavor)?);
                report.added_columns.push(col.name.clone());
            }
        }

        if !stmts.is_empty() {
            self.run(&d.table, stmts)?;
        }
        info!(
            "event=migrate module=migrator status=ok table={} created={} added_columns={} duration_ms={}",
            d.table,
            report.created,
            report.added_columns.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    pub fn auto_migrate<T: Record>(&self) -> Result<MigrationReport> {
        self.ensure_table::<T>(MigrateMode::Reconcile)
    }

    /// 在一个原子单元内执行全部 DDL；失败时报告出错的语句。
    fn run(&self, table: &str, stmts: Vec<Statement>) -> Result<()> {
        self.exec.atomic(&mut |e: &dyn Executor| {
            for stmt in &stmts {
                e.execute(stmt).map_err(|err| {
                    error!("event=migrate module=migrator status=error table={table} error={err}");
                    Error::migration(stmt.sql.clone(), err)
                })?;
            }
            Ok(())
        })
    }
}

pub(crate) fn create_table_statement(d: &Descriptor, flavor: Flavor) -> Result<Statement> {
    let mut ctb = CreateTableBuilder::new();
    ctb.create_table(&flavor.quote_ident(&d.table));
    for col in &d.columns {
        ctb.define(column_definition(col, flavor, false)?);
    }
    if flavor == Flavor::MySQL {
        ctb.define(format!("PRIMARY KEY ({})", ident(flavor, &d.primary_key().name)));
    }
    Statement::from_builder(&ctb, flavor)
}

pub(crate) fn add_column_statement(table: &str, col: &Column, flavor: Flavor) -> Result<Statement> {
    let mut ab = AddColumnBuilder::new(&flavor.quote_ident(table));
    ab.set_flavor(flavor);
    ab.define(column_definition(col, flavor, true)?);
    Statement::from_builder(&ab, flavor)
}

/// 一列的 DDL 片段。
fn column_definition(col: &Column, flavor: Flavor, adding: bool) -> Result<Vec<String>> {
    let mut def = vec![ident(flavor, &col.name)];

    if col.is_primary_key() && col.kind.is_integer() {
        def.push(
            match flavor {
                Flavor::SQLite => "INTEGER PRIMARY KEY AUTOINCREMENT",
                Flavor::MySQL => "BIGINT UNSIGNED NOT NULL AUTO_INCREMENT",
                Flavor::PostgreSQL => "BIGSERIAL PRIMARY KEY",
            }
            .to_string(),
        );
        return Ok(def);
    }

    def.push(sql_type(col.kind, flavor).to_string());
    if col.not_null {
        def.push("NOT NULL".to_string());
    }

    let default = match &col.default {
        Some(v) => Some(v.clone()),
        // SQLite 不允许补一个没有默认值的 NOT NULL 列
        None if adding && col.not_null && flavor.add_column_requires_default() => {
            Some(zero_value(col.kind))
        }
        None => None,
    };
    if let Some(v) = default {
        let lit = flavor
            .literal(&v)
            .map_err(|e| Error::Schema(format!("default of `{}`: {e}", col.name)))?;
        def.push(format!("DEFAULT {}", escape(&lit)));
    }

    if col.is_primary_key() && flavor != Flavor::MySQL {
        def.push("PRIMARY KEY".to_string());
    }
    Ok(def)
}

fn sql_type(kind: ColumnKind, flavor: Flavor) -> &'static str {
    use ColumnKind::*;
    match flavor {
        Flavor::SQLite => match kind {
            Bool => "NUMERIC",
            Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 => "INTEGER",
            Float | Double => "REAL",
            Text => "TEXT",
            Bytes => "BLOB",
            DateTime => "DATETIME",
        },
        Flavor::MySQL => match kind {
            Bool => "BOOLEAN",
            Int8 => "TINYINT",
            Int16 => "SMALLINT",
            Int32 => "INT",
            Int64 => "BIGINT",
            UInt8 => "TINYINT UNSIGNED",
            UInt16 => "SMALLINT UNSIGNED",
            UInt32 => "INT UNSIGNED",
            UInt64 => "BIGINT UNSIGNED",
            Float => "FLOAT",
            Double => "DOUBLE",
            Text => "LONGTEXT",
            Bytes => "LONGBLOB",
            DateTime => "DATETIME(3)",
        },
        Flavor::PostgreSQL => match kind {
            Bool => "BOOLEAN",
            Int8 | Int16 | UInt8 => "SMALLINT",
            Int32 | UInt16 => "INTEGER",
            Int64 | UInt32 | UInt64 => "BIGINT",
            Float => "REAL",
            Double => "DOUBLE PRECISION",
            Text => "TEXT",
            Bytes => "BYTEA",
            DateTime => "TIMESTAMPTZ",
        },
    }
}

fn zero_value(kind: ColumnKind) -> SqlValue {
    match kind {
        ColumnKind::Bool => SqlValue::Bool(false),
        ColumnKind::Float | ColumnKind::Double => SqlValue::F64(0.0),
        ColumnKind::Text => SqlValue::from(""),
        ColumnKind::Bytes => SqlValue::Bytes(Vec::new()),
        ColumnKind::DateTime => SqlValue::DateTime(time::OffsetDateTime::UNIX_EPOCH),
        _ => SqlValue::I64(0),
    }
}

fn current_schema(flavor: Flavor) -> &'static str {
    match flavor {
        Flavor::MySQL => "DATABASE()",
        _ => "CURRENT_SCHEMA()",
    }
}
