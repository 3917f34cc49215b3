//! SelectBuilder：构建 SELECT 语句。

use crate::args::Args;
use crate::cond::{ArgsRef, Cond};
use crate::flavor::Flavor;
use crate::macros::{IntoStrings, collect_into_strings};
use crate::modifiers::{Arg, Builder};
use crate::string_builder::StringBuilder;
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

#[derive(Debug)]
pub struct SelectBuilder {
    args: ArgsRef,
    cond: Cond,

    distinct: bool,
    tables: Vec<String>,
    select_cols: Vec<String>,
    where_exprs: Vec<String>,
    order_by_cols: Vec<String>,
    limit_var: Option<String>,
    offset_var: Option<String>,
}

impl Deref for SelectBuilder {
    type Target = Cond;
    fn deref(&self) -> &Self::Target {
        &self.cond
    }
}

impl SelectBuilder {
    pub fn new() -> Self {
        let args = Rc::new(RefCell::new(Args::default()));
        let cond = Cond::with_args(args.clone());
        Self {
            args,
            cond,
            distinct: false,
            tables: Vec::new(),
            select_cols: Vec::new(),
            where_exprs: Vec::new(),
            order_by_cols: Vec::new(),
            limit_var: None,
            offset_var: None,
        }
    }

    pub fn set_flavor(&mut self, flavor: Flavor) -> Flavor {
        let mut a = self.args.borrow_mut();
        let old = a.flavor;
        a.flavor = flavor;
        old
    }

    pub fn flavor(&self) -> Flavor {
        self.args.borrow().flavor
    }

    pub fn build(&self) -> (String, Vec<Arg>) {
        Builder::build(self)
    }

    fn var(&self, v: impl Into<Arg>) -> String {
        self.args.borrow_mut().add(v)
    }

    pub fn select<T>(&mut self, cols: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.select_cols = collect_into_strings(cols);
        self
    }

    pub fn select_more<T>(&mut self, cols: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.select_cols.extend(collect_into_strings(cols));
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    pub fn from<T>(&mut self, tables: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.tables = collect_into_strings(tables);
        self
    }

    /// 追加 AND 条件；空表达式会被忽略。
    pub fn where_<T>(&mut self, and_expr: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.where_exprs.extend(
            collect_into_strings(and_expr)
                .into_iter()
                .filter(|s| !s.is_empty()),
        );
        self
    }

    pub fn order_by<T>(&mut self, cols: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.order_by_cols.extend(collect_into_strings(cols));
        self
    }

    pub fn order_by_asc(&mut self, col: impl Into<String>) -> &mut Self {
        self.order_by_cols.push(format!("{} ASC", col.into()));
        self
    }

    pub fn order_by_desc(&mut self, col: impl Into<String>) -> &mut Self {
        self.order_by_cols.push(format!("{} DESC", col.into()));
        self
    }

    /// 负数表示清除 LIMIT。
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        if limit < 0 {
            self.limit_var = None;
            return self;
        }
        self.limit_var = Some(self.var(limit));
        self
    }

    /// 负数表示清除 OFFSET。
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        if offset < 0 {
            self.offset_var = None;
            return self;
        }
        self.offset_var = Some(self.var(offset));
        self
    }

    pub fn as_(&self, name: &str, alias: &str) -> String {
        format!("{name} AS {alias}")
    }
}

impl Clone for SelectBuilder {
    fn clone(&self) -> Self {
        // 深拷贝 Args，避免克隆体与原 builder 共享占位符
        let args = Rc::new(RefCell::new(self.args.borrow().clone()));
        let cond = Cond::with_args(args.clone());
        Self {
            args,
            cond,
            distinct: self.distinct,
            tables: self.tables.clone(),
            select_cols: self.select_cols.clone(),
            where_exprs: self.where_exprs.clone(),
            order_by_cols: self.order_by_cols.clone(),
            limit_var: self.limit_var.clone(),
            offset_var: self.offset_var.clone(),
        }
    }
}

impl Default for SelectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for SelectBuilder {
    fn build_with_flavor(&self, flavor: Flavor, initial_arg: &[Arg]) -> (String, Vec<Arg>) {
        let mut buf = StringBuilder::new();

        if !self.select_cols.is_empty() {
            buf.write_leading("SELECT");
            if self.distinct {
                buf.write_str(" DISTINCT");
            }
            buf.write_str(" ");
            buf.write_str(&self.select_cols.join(", "));
        }

        if !self.tables.is_empty() {
            buf.write_leading("FROM");
            buf.write_str(" ");
            buf.write_str(&self.tables.join(", "));
        }

        if !self.where_exprs.is_empty() {
            buf.write_leading("WHERE");
            buf.write_str(" ");
            buf.write_strings(&self.where_exprs, " AND ");
        }

        if !self.order_by_cols.is_empty() {
            buf.write_leading("ORDER BY");
            buf.write_str(" ");
            buf.write_str(&self.order_by_cols.join(", "));
        }

        write_limit_offset(
            &mut buf,
            flavor,
            self.limit_var.as_deref(),
            self.offset_var.as_deref(),
        );

        self.args
            .borrow()
            .compile_with_flavor(&buf.into_string(), flavor, initial_arg)
    }

    fn flavor(&self) -> Flavor {
        self.flavor()
    }
}

/// LIMIT/OFFSET 按 flavor 规则输出。
///
/// SQLite 的 OFFSET 必须跟在 LIMIT 后面，单独 offset 时补 `LIMIT -1`；
/// MySQL 没有 LIMIT 时忽略 OFFSET。
fn write_limit_offset(
    buf: &mut StringBuilder,
    flavor: Flavor,
    limit: Option<&str>,
    offset: Option<&str>,
) {
    match flavor {
        Flavor::MySQL => {
            if let Some(lim) = limit {
                buf.write_leading("LIMIT");
                buf.write_str(" ");
                buf.write_str(lim);
                if let Some(off) = offset {
                    buf.write_leading("OFFSET");
                    buf.write_str(" ");
                    buf.write_str(off);
                }
            }
        }
        Flavor::SQLite => {
            if limit.is_some() || offset.is_some() {
                buf.write_leading("LIMIT");
                buf.write_str(" ");
                buf.write_str(limit.unwrap_or("-1"));
            }
            if let Some(off) = offset {
                buf.write_leading("OFFSET");
                buf.write_str(" ");
                buf.write_str(off);
            }
        }
        Flavor::PostgreSQL => {
            if let Some(lim) = limit {
                buf.write_leading("LIMIT");
                buf.write_str(" ");
                buf.write_str(lim);
            }
            if let Some(off) = offset {
                buf.write_leading("OFFSET");
                buf.write_str(" ");
                buf.write_str(off);
            }
        }
    }
}
