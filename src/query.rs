//! 链式查询的状态，以及把状态编译为 SELECT/UPDATE/DELETE 语句。
//!
//! 结构化条件（字段相等、主键）在编译时才按 Descriptor 解析列名，
//! 因此 `where_map` 可以出现在 `model` 之前。

use crate::cond::Cond;
use crate::delete::DeleteBuilder;
use crate::error::{Error, Result};
use crate::executor::{Row, Statement};
use crate::flavor::Flavor;
use crate::modifiers::{Arg, escape};
use crate::record::Record;
use crate::schema::{Column, Descriptor};
use crate::select::SelectBuilder;
use crate::update::UpdateBuilder;
use crate::value::SqlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// 一个过滤条件；多个条件之间为 AND。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Filter {
    /// `?` 占位符的原始片段。
    Raw { expr: String, args: Vec<Arg> },
    /// `key` 可以是列名或字段名；`NULL` 值编译为 `IS NULL`。
    Eq { key: String, value: SqlValue },
    /// 主键等于 / 属于。
    Pks(Vec<SqlValue>),
}

/// 语句作用的表。
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'d> {
    pub table: &'d str,
    pub descriptor: Option<&'d Descriptor>,
    /// 注入软删除条件。
    pub scoped: bool,
}

impl Target<'_> {
    fn column_name(&self, key: &str) -> Result<String> {
        match self.descriptor {
            Some(d) => d
                .resolve(key)
                .map(|c| c.name.clone())
                .ok_or_else(|| Error::Parameter(format!("{} has no column `{key}`", d.shape))),
            None => Ok(key.to_string()),
        }
    }

    fn pk_name(&self) -> &str {
        self.descriptor.map_or("id", |d| d.primary_key().name.as_str())
    }

    fn soft_delete(&self) -> Option<&Column> {
        if !self.scoped {
            return None;
        }
        self.descriptor.and_then(Descriptor::soft_delete_column)
    }

    fn scope_expr(&self, flavor: Flavor) -> Option<String> {
        self.soft_delete()
            .map(|c| format!("{} = 0", ident(flavor, &c.name)))
    }
}

/// 交给 SelectBuilder/Cond 的标识符：加引号并转义 `$`。
pub(crate) fn ident(flavor: Flavor, name: &str) -> String {
    escape(&flavor.quote_ident(name))
}

/// 链式调用累积的查询状态。
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryState {
    pub filters: Vec<Filter>,
    pub select: Vec<String>,
    pub omit: Vec<String>,
    pub distinct: bool,
    pub orders: Vec<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl QueryState {
    pub fn add_select(&mut self, cols: impl IntoIterator<Item = impl Into<String>>) {
        self.select.extend(split_columns(cols));
    }

    pub fn add_omit(&mut self, cols: impl IntoIterator<Item = impl Into<String>>) {
        self.omit.extend(split_columns(cols));
    }

    fn select_all(&self) -> bool {
        self.select.len() == 1 && self.select[0] == "*"
    }

    /// 编译所有过滤条件（以及软删除条件）。空白的原始片段被忽略。
    fn where_exprs(&self, target: &Target<'_>, cond: &Cond, flavor: Flavor) -> Result<Vec<String>> {
        let mut exprs = Vec::with_capacity(self.filters.len() + 1);
        for f in &self.filters {
            let e = match f {
                Filter::Raw { expr, .. } if expr.trim().is_empty() => continue,
                Filter::Raw { expr, args } => cond
                    .bind(expr, args.iter().cloned())
                    .map_err(|e| Error::Parameter(e.to_string()))?,
                Filter::Eq { key, value } => {
                    let col = ident(flavor, &target.column_name(key)?);
                    if value.is_null() {
                        cond.is_null(&col)
                    } else {
                        cond.equal(&col, value.clone())
                    }
                }
                Filter::Pks(values) => {
                    let pk = ident(flavor, target.pk_name());
                    match values.as_slice() {
                        [one] => cond.equal(&pk, one.clone()),
                        many => cond.in_(&pk, many.iter().cloned()),
                    }
                }
            };
            if !e.is_empty() {
                exprs.push(e);
            }
        }
        if let Some(scope) = target.scope_expr(flavor) {
            exprs.push(scope);
        }
        Ok(exprs)
    }

    /// 读取的列：`None` 表示 `*`。
    pub fn read_columns(&self, target: &Target<'_>) -> Result<Option<Vec<String>>> {
        if !self.select.is_empty() && !self.omit.is_empty() {
            return Err(Error::Parameter(
                "select and omit cannot be combined on a query".to_string(),
            ));
        }
        if !self.select.is_empty() {
            let cols = self
                .select
                .iter()
                .map(|s| match target.descriptor.and_then(|d| d.resolve(s)) {
                    Some(c) => c.name.clone(),
                    None => s.clone(),
                })
                .collect();
            return Ok(Some(cols));
        }
        if !self.omit.is_empty() {
            let d = target.descriptor.ok_or_else(|| {
                Error::Parameter("omit requires a model to know the column list".to_string())
            })?;
            let omitted = self.resolve_all(d, &self.omit)?;
            let cols = d
                .columns
                .iter()
                .filter(|c| !omitted.contains(&c.name))
                .map(|c| c.name.clone())
                .collect();
            return Ok(Some(cols));
        }
        Ok(None)
    }

    /// 写入时 select/omit 对列的限制；`None` 表示不限制。
    ///
    /// `select(["*"])` 与 `omit` 组合表示“除 omit 外的全部列”。
    pub fn write_columns(&self, d: &Descriptor) -> Result<Option<Vec<String>>> {
        let all = || d.columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
        let omitted = self.resolve_all(d, &self.omit)?;

        let base = if self.select.is_empty() {
            if omitted.is_empty() {
                return Ok(None);
            }
            all()
        } else if self.select_all() {
            all()
        } else {
            if !omitted.is_empty() {
                return Err(Error::Parameter(
                    "select and omit cannot be combined unless select is `*`".to_string(),
                ));
            }
            self.resolve_all(d, &self.select)?
        };
        Ok(Some(
            base.into_iter().filter(|c| !omitted.contains(c)).collect(),
        ))
    }

    fn resolve_all(&self, d: &Descriptor, keys: &[String]) -> Result<Vec<String>> {
        keys.iter()
            .map(|k| {
                d.resolve(k)
                    .map(|c| c.name.clone())
                    .ok_or_else(|| Error::Parameter(format!("{} has no column `{k}`", d.shape)))
            })
            .collect()
    }

    /// 编译 SELECT；`implicit_order` 仅在没有显式排序时生效。
    pub fn select_statement(
        &self,
        target: &Target<'_>,
        columns: Option<Vec<String>>,
        implicit_order: Option<String>,
        limit_one: bool,
        flavor: Flavor,
    ) -> Result<Statement> {
        let mut sb = SelectBuilder::new();
        let exprs = self.where_exprs(target, &sb, flavor)?;

        let cols: Vec<String> = match columns {
            Some(cols) => cols.iter().map(|c| ident(flavor, c)).collect(),
            None => vec!["*".to_string()],
        };
        sb.select(cols).from(ident(flavor, target.table)).where_(exprs);
        if self.distinct {
            sb.distinct();
        }
        if self.orders.is_empty() {
            if let Some(o) = implicit_order {
                sb.order_by(o);
            }
        } else {
            sb.order_by(self.orders.clone());
        }
        if limit_one {
            sb.limit(1);
        } else if let Some(l) = self.limit {
            sb.limit(l);
        }
        if let Some(o) = self.offset {
            sb.offset(o);
        }
        Statement::from_builder(&sb, flavor)
    }

    /// `SELECT count(*)`：忽略排序与分页。
    pub fn count_statement(&self, target: &Target<'_>, flavor: Flavor) -> Result<Statement> {
        let mut sb = SelectBuilder::new();
        let exprs = self.where_exprs(target, &sb, flavor)?;
        let expr = match (self.distinct, self.read_columns(target)?) {
            (true, Some(cols)) if !cols.is_empty() => {
                let cols: Vec<String> = cols.iter().map(|c| ident(flavor, c)).collect();
                format!("count(DISTINCT {})", cols.join(", "))
            }
            _ => "count(*)".to_string(),
        };
        sb.select(expr).from(ident(flavor, target.table)).where_(exprs);
        Statement::from_builder(&sb, flavor)
    }

    /// 是否有会编译出 WHERE 片段的过滤条件（软删除条件不算），批量写入据此做保护。
    pub fn has_filters(&self) -> bool {
        self.filters.iter().any(|f| match f {
            Filter::Raw { expr, .. } => !expr.trim().is_empty(),
            Filter::Eq { .. } | Filter::Pks(_) => true,
        })
    }

    pub fn update_statement(
        &self,
        target: &Target<'_>,
        assignments: &[(String, SqlValue)],
        flavor: Flavor,
    ) -> Result<Statement> {
        let mut ub = UpdateBuilder::new();
        let sets: Vec<String> = assignments
            .iter()
            .map(|(col, v)| ub.assign(&flavor.quote_ident(col), v.clone()))
            .collect();
        let exprs = self.where_exprs(target, &ub, flavor)?;
        ub.update(&flavor.quote_ident(target.table));
        ub.set(sets).where_(exprs);
        Statement::from_builder(&ub, flavor)
    }

    pub fn delete_statement(&self, target: &Target<'_>, flavor: Flavor) -> Result<Statement> {
        let mut db = DeleteBuilder::new();
        let exprs = self.where_exprs(target, &db, flavor)?;
        db.delete_from(&flavor.quote_ident(target.table));
        db.where_(exprs);
        Statement::from_builder(&db, flavor)
    }
}

/// `select("name, age")` 与 `select(["name", "age"])` 等价。
fn split_columns(cols: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    cols.into_iter()
        .flat_map(|c| {
            c.into()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// 把结果行写回 record；结果中没有对应字段的列被忽略。
pub(crate) fn decode_record<T: Record>(d: &Descriptor, row: Row) -> Result<T> {
    let mut record = T::default();
    for (name, value) in row.columns.into_iter().zip(row.values) {
        let Some(col) = d.columns.iter().find(|c| c.name.eq_ignore_ascii_case(&name)) else {
            continue;
        };
        record
            .set_field(col.field, value)
            .map_err(|e| Error::Decode {
                column: name,
                message: e.0,
            })?;
    }
    Ok(record)
}
