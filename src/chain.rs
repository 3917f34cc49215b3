//! 链式会话 API：在 `Db` 或 `Tx` 上累积条件，再由终结方法发出语句。
//!
//! 条件方法中出现的错误（例如占位符数量不符）会被记录下来，
//! 在终结方法中返回，链式调用本身不会中断。

use crate::args::Args;
use crate::error::{Error, Result};
use crate::executor::{ExecOutcome, Executor, Row, Statement};
use crate::flavor::Flavor;
use crate::insert::InsertBuilder;
use crate::migrator::Migrator;
use crate::modifiers::{Arg, escape};
use crate::naming::NamingStrategy;
use crate::query::{Direction, Filter, QueryState, Target, decode_record, ident};
use crate::record::Record;
use crate::schema::{Column, Descriptor, describe};
use crate::value::{FromSqlValue, SqlValue, ValueMap};
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;
use time::OffsetDateTime;

pub struct Chain<'a> {
    exec: &'a dyn Executor,
    table: Option<String>,
    model: Option<Arc<Descriptor>>,
    state: QueryState,
    skip_hooks: bool,
    allow_global_update: bool,
    unscoped: bool,
    error: Option<Error>,
}

impl<'a> Chain<'a> {
    pub fn new(exec: &'a dyn Executor) -> Self {
        Self {
            exec,
            table: None,
            model: None,
            state: QueryState::default(),
            skip_hooks: false,
            allow_global_update: false,
            unscoped: false,
            error: None,
        }
    }

    fn naming(&self) -> &'a NamingStrategy {
        &self.exec.settings().naming
    }

    fn flavor(&self) -> Flavor {
        self.exec.flavor()
    }

    /// 只保留第一个错误。
    fn fail(mut self, err: Error) -> Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }

    fn check(&mut self) -> Result<()> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn typed<T: Record>(&mut self) -> Result<Arc<Descriptor>> {
        self.check()?;
        describe::<T>(self.naming())
    }

    /// 没有类型参数的终结方法：表来自 `table()` 或 `model()`。
    fn untyped(&mut self) -> Result<(String, Option<Arc<Descriptor>>)> {
        self.check()?;
        let d = self.model.clone();
        let table = self.table_for(d.as_deref())?;
        Ok((table, d))
    }

    fn table_for(&self, d: Option<&Descriptor>) -> Result<String> {
        match (&self.table, d) {
            (Some(t), _) => Ok(t.clone()),
            (None, Some(d)) => Ok(d.table.clone()),
            (None, None) => Err(Error::Parameter(
                "no table: call model() or table() first".to_string(),
            )),
        }
    }

    /// 同一执行者上的新链，沿用表与 hook 设置。
    fn fresh(&self) -> Chain<'a> {
        Chain {
            table: self.table.clone(),
            model: self.model.clone(),
            skip_hooks: self.skip_hooks,
            ..Chain::new(self.exec)
        }
    }

    // ---- scoping ----

    pub fn model<T: Record>(mut self) -> Self {
        match describe::<T>(self.naming()) {
            Ok(d) => {
                self.model = Some(d);
                self
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// 原始条件片段，`?` 为位置参数；`tuple(..)`/`list(..)` 参数展开为多个占位符。
    ///
    /// 空白片段不算条件。
    pub fn where_raw<A: Into<Arg>>(mut self, expr: &str, args: impl IntoIterator<Item = A>) -> Self {
        let args: Vec<Arg> = args.into_iter().map(Into::into).collect();
        if let Err(err) = Args::default().bind_positional(expr, args.iter().cloned()) {
            return self.fail(Error::Parameter(err.to_string()));
        }
        if expr.trim().is_empty() {
            return self;
        }
        self.state.filters.push(Filter::Raw {
            expr: expr.to_string(),
            args,
        });
        self
    }

    /// `key = value`，key 为列名或字段名。
    pub fn where_eq(mut self, key: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.state.filters.push(Filter::Eq {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// 结构体条件：只有非零值字段参与。
    pub fn where_nonzero<T: Record>(mut self, r: &T) -> Self {
        let d = match describe::<T>(self.naming()) {
            Ok(d) => d,
            Err(err) => return self.fail(err),
        };
        for col in &d.columns {
            if r.is_zero_field(col.field) {
                continue;
            }
            self.state.filters.push(Filter::Eq {
                key: col.name.clone(),
                value: r.field_value(col.field).unwrap_or(SqlValue::Null),
            });
        }
        self
    }

    /// 只用指定的字段做条件，零值也参与。
    pub fn where_fields<T: Record>(mut self, r: &T, fields: &[&str]) -> Self {
        let d = match describe::<T>(self.naming()) {
            Ok(d) => d,
            Err(err) => return self.fail(err),
        };
        for f in fields {
            let Some(col) = d.resolve(f) else {
                return self.fail(Error::Parameter(format!("{} has no field `{f}`", d.shape)));
            };
            self.state.filters.push(Filter::Eq {
                key: col.name.clone(),
                value: r.field_value(col.field).unwrap_or(SqlValue::Null),
            });
        }
        self
    }

    /// map 条件：每个 entry 都参与，包括零值。
    pub fn where_map(mut self, map: ValueMap) -> Self {
        for (key, value) in map {
            self.state.filters.push(Filter::Eq { key, value });
        }
        self
    }

    pub fn where_pk(mut self, pk: impl Into<SqlValue>) -> Self {
        self.state.filters.push(Filter::Pks(vec![pk.into()]));
        self
    }

    pub fn where_pks<V: Into<SqlValue>>(mut self, pks: impl IntoIterator<Item = V>) -> Self {
        let pks = pks.into_iter().map(Into::into).collect();
        self.state.filters.push(Filter::Pks(pks));
        self
    }

    pub fn select<S: Into<String>>(mut self, cols: impl IntoIterator<Item = S>) -> Self {
        self.state.add_select(cols);
        self
    }

    pub fn omit<S: Into<String>>(mut self, cols: impl IntoIterator<Item = S>) -> Self {
        self.state.add_omit(cols);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.state.distinct = true;
        self
    }

    /// 原始排序片段；多次调用依次追加。
    pub fn order(mut self, expr: impl Into<String>) -> Self {
        self.state.orders.push(escape(&expr.into()));
        self
    }

    pub fn order_by(mut self, column: &str, dir: Direction) -> Self {
        let column = ident(self.flavor(), column);
        self.state
            .orders
            .push(format!("{column} {}", dir.as_sql()));
        self
    }

    /// 负数取消 LIMIT。
    pub fn limit(mut self, n: i64) -> Self {
        self.state.limit = (n >= 0).then_some(n);
        self
    }

    /// 负数取消 OFFSET。
    pub fn offset(mut self, n: i64) -> Self {
        self.state.offset = (n >= 0).then_some(n);
        self
    }

    /// 不注入软删除条件；删除时执行真正的 `DELETE`。
    pub fn unscoped(mut self) -> Self {
        self.unscoped = true;
        self
    }

    pub fn skip_hooks(mut self) -> Self {
        self.skip_hooks = true;
        self
    }

    pub fn allow_global_update(mut self) -> Self {
        self.allow_global_update = true;
        self
    }

    /// 以一条记录为目标：主键非零时按主键过滤。
    pub fn record<T: Record>(mut self, r: &T) -> Self {
        let d = match describe::<T>(self.naming()) {
            Ok(d) => d,
            Err(err) => return self.fail(err),
        };
        let pk = d.primary_key();
        if !r.is_zero_field(pk.field) {
            let v = r.field_value(pk.field).unwrap_or(SqlValue::Null);
            self.state.filters.push(Filter::Pks(vec![v]));
        }
        self.model = Some(d);
        self
    }

    // ---- fetch ----

    fn fetch_one<T: Record>(mut self, order: Option<Direction>) -> Result<T> {
        let d = self.typed::<T>()?;
        let table = self.table_for(Some(&*d))?;
        let target = Target {
            table: &table,
            descriptor: Some(&*d),
            scoped: !self.unscoped,
        };
        let cols = self.state.read_columns(&target)?;
        let flavor = self.flavor();
        let implicit =
            order.map(|dir| format!("{} {}", ident(flavor, &d.primary_key().name), dir.as_sql()));
        let stmt = self
            .state
            .select_statement(&target, cols, implicit, true, flavor)?;
        let row = self
            .exec
            .query(&stmt)?
            .into_iter()
            .next()
            .ok_or(Error::RecordNotFound)?;
        decode_record(&d, row)
    }

    /// 按主键升序的第一条；没有匹配时返回 `RecordNotFound`。
    pub fn first<T: Record>(self) -> Result<T> {
        self.fetch_one(Some(Direction::Asc))
    }

    /// 按主键降序的第一条。
    pub fn last<T: Record>(self) -> Result<T> {
        self.fetch_one(Some(Direction::Desc))
    }

    /// 任意一条匹配的记录，不附加排序。
    pub fn take<T: Record>(self) -> Result<T> {
        self.fetch_one(None)
    }

    pub fn first_by_pk<T: Record>(self, pk: impl Into<SqlValue>) -> Result<T> {
        self.where_pk(pk).first()
    }

    fn fetch_one_row(mut self, order: Option<Direction>) -> Result<Row> {
        let (table, d) = self.untyped()?;
        let target = Target {
            table: &table,
            descriptor: d.as_deref(),
            scoped: !self.unscoped,
        };
        let cols = self.state.read_columns(&target)?;
        let flavor = self.flavor();
        let implicit = match (order, &d) {
            (Some(dir), Some(d)) => {
                Some(format!("{} {}", ident(flavor, &d.primary_key().name), dir.as_sql()))
            }
            _ => None,
        };
        let stmt = self
            .state
            .select_statement(&target, cols, implicit, true, flavor)?;
        self.exec
            .query(&stmt)?
            .into_iter()
            .next()
            .ok_or(Error::RecordNotFound)
    }

    pub fn first_row(self) -> Result<Row> {
        self.fetch_one_row(Some(Direction::Asc))
    }

    pub fn last_row(self) -> Result<Row> {
        self.fetch_one_row(Some(Direction::Desc))
    }

    pub fn take_row(self) -> Result<Row> {
        self.fetch_one_row(None)
    }

    /// 所有匹配的记录；没有匹配时返回空集合。
    pub fn find<T: Record>(mut self) -> Result<Vec<T>> {
        let d = self.typed::<T>()?;
        let table = self.table_for(Some(&*d))?;
        let target = Target {
            table: &table,
            descriptor: Some(&*d),
            scoped: !self.unscoped,
        };
        let cols = self.state.read_columns(&target)?;
        let stmt = self
            .state
            .select_statement(&target, cols, None, false, self.flavor())?;
        self.exec
            .query(&stmt)?
            .into_iter()
            .map(|row| decode_record(&d, row))
            .collect()
    }

    pub fn find_by_pks<T: Record, V: Into<SqlValue>>(
        self,
        pks: impl IntoIterator<Item = V>,
    ) -> Result<Vec<T>> {
        self.where_pks(pks).find()
    }

    pub fn find_rows(mut self) -> Result<Vec<Row>> {
        let (table, d) = self.untyped()?;
        let target = Target {
            table: &table,
            descriptor: d.as_deref(),
            scoped: !self.unscoped,
        };
        let cols = self.state.read_columns(&target)?;
        let stmt = self
            .state
            .select_statement(&target, cols, None, false, self.flavor())?;
        self.exec.query(&stmt)
    }

    /// 单列查询为标量集合。
    pub fn pluck<V: FromSqlValue>(mut self, column: &str) -> Result<Vec<V>> {
        let (table, d) = self.untyped()?;
        let target = Target {
            table: &table,
            descriptor: d.as_deref(),
            scoped: !self.unscoped,
        };
        let col = d
            .as_deref()
            .and_then(|d| d.resolve(column))
            .map_or_else(|| column.to_string(), |c| c.name.clone());
        let stmt = self
            .state
            .select_statement(&target, Some(vec![col.clone()]), None, false, self.flavor())?;
        self.exec
            .query(&stmt)?
            .into_iter()
            .map(|row| {
                let v = row.values.into_iter().next().unwrap_or(SqlValue::Null);
                V::from_sql_value(v).map_err(|e| Error::Decode {
                    column: col.clone(),
                    message: e.0,
                })
            })
            .collect()
    }

    pub fn count(mut self) -> Result<u64> {
        let (table, d) = self.untyped()?;
        let target = Target {
            table: &table,
            descriptor: d.as_deref(),
            scoped: !self.unscoped,
        };
        let stmt = self.state.count_statement(&target, self.flavor())?;
        let v = self
            .exec
            .query(&stmt)?
            .into_iter()
            .next()
            .and_then(|r| r.values.into_iter().next())
            .unwrap_or(SqlValue::I64(0));
        u64::from_sql_value(v).map_err(|e| Error::Decode {
            column: "count".to_string(),
            message: e.0,
        })
    }

    // ---- create ----

    pub fn create<T: Record>(self, r: &mut T) -> Result<ExecOutcome> {
        self.create_in_batches(std::slice::from_mut(r), 0)
    }

    /// 按 `Settings.create_batch_size` 分批插入。
    pub fn create_batch<T: Record>(self, records: &mut [T]) -> Result<ExecOutcome> {
        let size = self.exec.settings().create_batch_size;
        self.create_in_batches(records, size)
    }

    /// 每 `batch_size` 行一条 INSERT（0 表示不分批），多条语句在同一事务中执行。
    ///
    /// 零值主键由数据库生成并按输入顺序写回。
    pub fn create_in_batches<T: Record>(
        mut self,
        records: &mut [T],
        batch_size: usize,
    ) -> Result<ExecOutcome> {
        let d = self.typed::<T>()?;
        if records.is_empty() {
            return Err(Error::Parameter("no records to create".to_string()));
        }
        let table = self.table_for(Some(&*d))?;

        let now = OffsetDateTime::now_utc();
        for r in records.iter_mut() {
            self.prepare_create(&d, r, now)?;
        }

        let allowed = self.state.write_columns(&d)?;
        let pk = d.primary_key();
        let columns = |with_pk: bool| {
            d.columns
                .iter()
                .filter(|c| {
                    if c.is_primary_key() {
                        with_pk
                    } else {
                        allowed.as_ref().is_none_or(|a| a.contains(&c.name))
                    }
                })
                .collect::<Vec<&Column>>()
        };

        let zero_pks = records.iter().filter(|r| r.is_zero_field(pk.field)).count();
        let plan: Vec<(Range<usize>, bool)> =
            if zero_pks == records.len() && !columns(false).is_empty() {
                chunks(records.len(), batch_size, false)
            } else if zero_pks == 0 {
                chunks(records.len(), batch_size, true)
            } else {
                // 主键有零有非零：逐条插入
                records
                    .iter()
                    .enumerate()
                    .map(|(i, r)| (i..i + 1, !r.is_zero_field(pk.field)))
                    .collect()
            };

        let flavor = self.flavor();
        let mut total = ExecOutcome::default();
        let mut work = |e: &dyn Executor| -> Result<()> {
            for (range, with_pk) in &plan {
                let rows = &mut records[range.clone()];
                let stmt = insert_statement(&table, &columns(*with_pk), rows, flavor)?;
                let out = e.execute(&stmt)?;
                total.rows_affected += out.rows_affected;
                total.last_insert_id = out.last_insert_id;
                if !*with_pk && let Some(last) = out.last_insert_id {
                    backfill_pks(rows, pk, last)?;
                }
            }
            Ok(())
        };

        if plan.len() > 1 {
            self.exec.atomic(&mut work)?;
        } else {
            work(self.exec)?;
        }
        Ok(total)
    }

    fn prepare_create<T: Record>(&self, d: &Descriptor, r: &mut T, now: OffsetDateTime) -> Result<()> {
        if !self.skip_hooks {
            r.before_create()?;
        }
        for col in &d.columns {
            if !r.is_zero_field(col.field) || col.is_primary_key() || col.soft_delete_mode().is_some() {
                continue;
            }
            let value = match col.time_unit() {
                Some(unit) => Some(unit.value_at(now)),
                None => col.default.clone(),
            };
            if let Some(v) = value {
                set_field(r, col, v)?;
            }
        }
        Ok(())
    }

    pub fn create_map(self, map: ValueMap) -> Result<ExecOutcome> {
        self.create_maps_in_batches(vec![map], 0)
    }

    /// map 批量插入：不执行 hook、不填充时间戳、不写回主键。
    ///
    /// 列为所有 map 的 key 的并集，某行缺失的列取该列默认值或 `NULL`。
    pub fn create_maps_in_batches(
        mut self,
        maps: Vec<ValueMap>,
        batch_size: usize,
    ) -> Result<ExecOutcome> {
        let (table, d) = self.untyped()?;
        if maps.is_empty() {
            return Err(Error::Parameter("no records to create".to_string()));
        }

        let mut rows = Vec::with_capacity(maps.len());
        let mut keys = BTreeSet::new();
        for map in maps {
            let mut row = ValueMap::new();
            for (key, value) in map {
                let col = match d.as_deref() {
                    Some(d) => d
                        .resolve(&key)
                        .map(|c| c.name.clone())
                        .ok_or_else(|| Error::Parameter(format!("{} has no column `{key}`", d.shape)))?,
                    None => key,
                };
                keys.insert(col.clone());
                row.insert(col, value);
            }
            rows.push(row);
        }

        let mut columns: Vec<String> = match d.as_deref() {
            Some(d) => d
                .columns
                .iter()
                .filter(|c| keys.contains(&c.name))
                .map(|c| c.name.clone())
                .collect(),
            None => keys.into_iter().collect(),
        };
        if let Some(allowed) = d.as_deref().map(|d| self.state.write_columns(d)).transpose()?.flatten() {
            columns.retain(|c| allowed.contains(c));
        }
        if columns.is_empty() {
            return Err(Error::Parameter("nothing to create".to_string()));
        }

        let default_of = |col: &str| -> SqlValue {
            d.as_deref()
                .and_then(|d| d.column(col))
                .and_then(|c| c.default.clone())
                .unwrap_or(SqlValue::Null)
        };

        let flavor = self.flavor();
        let plan = chunks(rows.len(), batch_size, false);
        let mut total = ExecOutcome::default();
        let mut work = |e: &dyn Executor| -> Result<()> {
            for (range, _) in &plan {
                let mut ib = InsertBuilder::new();
                ib.insert_into(&flavor.quote_ident(&table)).cols(
                    columns
                        .iter()
                        .map(|c| flavor.quote_ident(c))
                        .collect::<Vec<_>>(),
                );
                for row in &rows[range.clone()] {
                    ib.values(
                        columns
                            .iter()
                            .map(|c| row.get(c).cloned().unwrap_or_else(|| default_of(c))),
                    );
                }
                let out = e.execute(&Statement::from_builder(&ib, flavor)?)?;
                total.rows_affected += out.rows_affected;
                total.last_insert_id = out.last_insert_id;
            }
            Ok(())
        };

        if plan.len() > 1 {
            self.exec.atomic(&mut work)?;
        } else {
            work(self.exec)?;
        }
        Ok(total)
    }

    // ---- update ----

    /// 主键为零时创建；否则按主键更新所有列（包括零值），没有匹配行时插入。
    pub fn save<T: Record>(mut self, r: &mut T) -> Result<ExecOutcome> {
        let d = self.typed::<T>()?;
        let pk = d.primary_key();
        if r.is_zero_field(pk.field) {
            return self.create(r);
        }
        let table = self.table_for(Some(&*d))?;

        if let Some(col) = d.auto_update_column()
            && let Some(unit) = col.time_unit()
        {
            set_field(r, col, unit.value_at(OffsetDateTime::now_utc()))?;
        }

        let allowed = self.state.write_columns(&d)?;
        let sets: Vec<(String, SqlValue)> = d
            .columns
            .iter()
            .filter(|c| !c.is_primary_key())
            .filter(|c| allowed.as_ref().is_none_or(|a| a.contains(&c.name)))
            .map(|c| (c.name.clone(), r.field_value(c.field).unwrap_or(SqlValue::Null)))
            .collect();
        if sets.is_empty() {
            return Err(Error::Parameter("nothing to update".to_string()));
        }

        let pk_value = r.field_value(pk.field).unwrap_or(SqlValue::Null);
        let mut state = self.state.clone();
        state.filters.push(Filter::Pks(vec![pk_value]));
        let target = Target {
            table: &table,
            descriptor: Some(&*d),
            scoped: !self.unscoped,
        };
        let stmt = state.update_statement(&target, &sets, self.flavor())?;
        let out = self.exec.execute(&stmt)?;
        if out.rows_affected > 0 {
            return Ok(out);
        }
        self.fresh().create(r)
    }

    /// 更新单列。
    pub fn update(self, column: &str, value: impl Into<SqlValue>) -> Result<ExecOutcome> {
        let mut map = ValueMap::new();
        map.insert(column.to_string(), value.into());
        self.updates_map(map)
    }

    /// 结构体更新：只写非零字段；`select` 指定的列即使为零也写入。
    ///
    /// 记录主键非零时按主键过滤。
    pub fn updates_nonzero<T: Record>(mut self, r: &T) -> Result<ExecOutcome> {
        let d = self.typed::<T>()?;
        let table = self.table_for(Some(&*d))?;
        let allowed = self.state.write_columns(&d)?;
        let explicit = !self.state.select.is_empty();

        let sets: Vec<(String, SqlValue)> = d
            .columns
            .iter()
            .filter(|c| !c.is_primary_key())
            .filter(|c| allowed.as_ref().is_none_or(|a| a.contains(&c.name)))
            .filter(|c| explicit || !r.is_zero_field(c.field))
            .map(|c| (c.name.clone(), r.field_value(c.field).unwrap_or(SqlValue::Null)))
            .collect();

        let pk = d.primary_key();
        if !r.is_zero_field(pk.field) {
            let v = r.field_value(pk.field).unwrap_or(SqlValue::Null);
            self.state.filters.push(Filter::Pks(vec![v]));
        }
        self.run_update(&table, Some(&*d), sets)
    }

    /// map 更新：每个 key 都写入，包括零值。
    pub fn updates_map(mut self, map: ValueMap) -> Result<ExecOutcome> {
        let (table, d) = self.untyped()?;
        let mut sets = Vec::with_capacity(map.len());
        for (key, value) in map {
            let col = match d.as_deref() {
                Some(d) => d
                    .resolve(&key)
                    .map(|c| c.name.clone())
                    .ok_or_else(|| Error::Parameter(format!("{} has no column `{key}`", d.shape)))?,
                None => key,
            };
            sets.push((col, value));
        }
        if let Some(allowed) = d.as_deref().map(|d| self.state.write_columns(d)).transpose()?.flatten() {
            sets.retain(|(c, _)| allowed.contains(c));
        }
        self.run_update(&table, d.as_deref(), sets)
    }

    fn run_update(
        &self,
        table: &str,
        d: Option<&Descriptor>,
        mut sets: Vec<(String, SqlValue)>,
    ) -> Result<ExecOutcome> {
        if !self.state.has_filters() && !self.allow_global_update {
            return Err(Error::MissingFilter);
        }
        if sets.is_empty() {
            return Err(Error::Parameter("nothing to update".to_string()));
        }

        if let Some(d) = d
            && let Some(col) = d.auto_update_column()
            && let Some(unit) = col.time_unit()
            && !sets.iter().any(|(c, _)| *c == col.name)
            && !self.omits(d, col)
        {
            sets.push((col.name.clone(), unit.value_at(OffsetDateTime::now_utc())));
        }

        let target = Target {
            table,
            descriptor: d,
            scoped: !self.unscoped,
        };
        let stmt = self.state.update_statement(&target, &sets, self.flavor())?;
        self.exec.execute(&stmt)
    }

    fn omits(&self, d: &Descriptor, col: &Column) -> bool {
        self.state
            .omit
            .iter()
            .any(|o| d.resolve(o).is_some_and(|c| c.name == col.name))
    }

    // ---- delete ----

    /// 软删除模型改写为设置删除标记的 UPDATE；`unscoped()` 时执行真正的 DELETE。
    pub fn delete<T: Record>(mut self) -> Result<ExecOutcome> {
        let d = self.typed::<T>()?;
        let table = self.table_for(Some(&*d))?;
        if !self.state.has_filters() && !self.allow_global_update {
            return Err(Error::MissingFilter);
        }

        let target = Target {
            table: &table,
            descriptor: Some(&*d),
            scoped: !self.unscoped,
        };
        let soft = d
            .soft_delete_column()
            .and_then(|c| c.soft_delete_mode().map(|m| (c, m)));
        let stmt = match soft {
            Some((col, mode)) if !self.unscoped => {
                let sets = vec![(col.name.clone(), mode.deleted_marker(OffsetDateTime::now_utc()))];
                self.state.update_statement(&target, &sets, self.flavor())?
            }
            _ => self.state.delete_statement(&target, self.flavor())?,
        };
        self.exec.execute(&stmt)
    }

    /// 按记录主键删除；主键为零时没有过滤条件。
    pub fn delete_record<T: Record>(self, r: &T) -> Result<ExecOutcome> {
        self.record(r).delete::<T>()
    }

    pub fn delete_by_pk<T: Record>(self, pk: impl Into<SqlValue>) -> Result<ExecOutcome> {
        self.where_pk(pk).delete::<T>()
    }

    // ---- raw ----

    /// 原始 SQL 查询，不注入任何条件。
    pub fn raw<A: Into<Arg>>(self, sql: &str, args: impl IntoIterator<Item = A>) -> RawQuery<'a> {
        let flavor = self.flavor();
        let stmt = match self.error {
            Some(err) => Err(err),
            None => bind_raw(sql, args, flavor),
        };
        RawQuery {
            exec: self.exec,
            stmt,
        }
    }

    /// 原始 SQL 写入，返回影响行数。
    pub fn exec<A: Into<Arg>>(mut self, sql: &str, args: impl IntoIterator<Item = A>) -> Result<ExecOutcome> {
        self.check()?;
        let stmt = bind_raw(sql, args, self.flavor())?;
        self.exec.execute(&stmt)
    }
}

/// 原始查询的结果。
pub struct RawQuery<'a> {
    exec: &'a dyn Executor,
    stmt: Result<Statement>,
}

impl RawQuery<'_> {
    pub fn statement(&self) -> Option<&Statement> {
        self.stmt.as_ref().ok()
    }

    pub fn rows(self) -> Result<Vec<Row>> {
        self.exec.query(&self.stmt?)
    }

    /// 按列名写回 record；没有对应字段的列被忽略。
    pub fn scan<T: Record>(self) -> Result<Vec<T>> {
        let d = describe::<T>(&self.exec.settings().naming)?;
        self.exec
            .query(&self.stmt?)?
            .into_iter()
            .map(|row| decode_record(&d, row))
            .collect()
    }

    /// 第一列的标量集合。
    pub fn pluck<V: FromSqlValue>(self) -> Result<Vec<V>> {
        self.exec
            .query(&self.stmt?)?
            .into_iter()
            .map(|row| {
                let column = row.columns.first().cloned().unwrap_or_default();
                let v = row.values.into_iter().next().unwrap_or(SqlValue::Null);
                V::from_sql_value(v).map_err(|e| Error::Decode {
                    column,
                    message: e.0,
                })
            })
            .collect()
    }
}

/// `Db`/`Tx` 上的链式入口。
pub trait Session: Executor + Sized {
    fn chain(&self) -> Chain<'_> {
        Chain::new(self)
    }

    fn model<T: Record>(&self) -> Chain<'_> {
        self.chain().model::<T>()
    }

    fn table(&self, name: impl Into<String>) -> Chain<'_> {
        self.chain().table(name)
    }

    fn migrator(&self) -> Migrator<'_> {
        Migrator::new(self)
    }

    fn create<T: Record>(&self, r: &mut T) -> Result<ExecOutcome> {
        self.chain().create(r)
    }

    fn create_batch<T: Record>(&self, records: &mut [T]) -> Result<ExecOutcome> {
        self.chain().create_batch(records)
    }

    fn save<T: Record>(&self, r: &mut T) -> Result<ExecOutcome> {
        self.chain().save(r)
    }

    fn first<T: Record>(&self) -> Result<T> {
        self.chain().first()
    }

    fn find<T: Record>(&self) -> Result<Vec<T>> {
        self.chain().find()
    }

    fn raw<A: Into<Arg>>(&self, sql: &str, args: impl IntoIterator<Item = A>) -> RawQuery<'_> {
        self.chain().raw(sql, args)
    }

    fn exec<A: Into<Arg>>(&self, sql: &str, args: impl IntoIterator<Item = A>) -> Result<ExecOutcome> {
        self.chain().exec(sql, args)
    }
}

impl<E: Executor> Session for E {}

fn bind_raw<A: Into<Arg>>(
    sql: &str,
    args: impl IntoIterator<Item = A>,
    flavor: Flavor,
) -> Result<Statement> {
    let mut a = Args::default();
    let format = a
        .bind_positional(sql, args.into_iter().map(Into::into))
        .map_err(|e| Error::Parameter(e.to_string()))?;
    let (sql, args) = a.compile_with_flavor(&format, flavor, &[]);
    Statement::from_compiled(sql, args)
}

/// 把 `len` 行切成每段最多 `size` 行（0 表示一段）。
fn chunks(len: usize, size: usize, with_pk: bool) -> Vec<(Range<usize>, bool)> {
    let size = if size == 0 { len.max(1) } else { size };
    (0..len)
        .step_by(size)
        .map(|start| (start..(start + size).min(len), with_pk))
        .collect()
}

/// 没有可写的列时只能逐行插入全默认值（`DEFAULT VALUES`）。
fn insert_statement<T: Record>(
    table: &str,
    columns: &[&Column],
    rows: &[T],
    flavor: Flavor,
) -> Result<Statement> {
    if columns.is_empty() && rows.len() != 1 {
        return Err(Error::Parameter(format!(
            "nothing to create: {} rows without writable columns",
            rows.len()
        )));
    }
    let mut ib = InsertBuilder::new();
    ib.insert_into(&flavor.quote_ident(table)).cols(
        columns
            .iter()
            .map(|c| flavor.quote_ident(&c.name))
            .collect::<Vec<_>>(),
    );
    if !columns.is_empty() {
        for r in rows {
            ib.values(
                columns
                    .iter()
                    .map(|c| r.field_value(c.field).unwrap_or(SqlValue::Null)),
            );
        }
    }
    Statement::from_builder(&ib, flavor)
}

/// SQLite 的 `last_insert_rowid` 是本条语句插入的最后一行。
fn backfill_pks<T: Record>(rows: &mut [T], pk: &Column, last: i64) -> Result<()> {
    let first = last - rows.len() as i64 + 1;
    for (i, r) in rows.iter_mut().enumerate() {
        set_field(r, pk, SqlValue::I64(first + i as i64))?;
    }
    Ok(())
}

fn set_field<T: Record>(r: &mut T, col: &Column, v: SqlValue) -> Result<()> {
    r.set_field(col.field, v).map_err(|e| Error::Decode {
        column: col.name.clone(),
        message: e.0,
    })
}
