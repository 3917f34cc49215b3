//! UpdateBuilder：构建 UPDATE 语句。

use crate::args::Args;
use crate::cond::{ArgsRef, Cond};
use crate::flavor::Flavor;
use crate::macros::{IntoStrings, collect_into_strings};
use crate::modifiers::{Arg, Builder, escape};
use crate::string_builder::StringBuilder;
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

#[derive(Debug)]
pub struct UpdateBuilder {
    args: ArgsRef,
    cond: Cond,

    table: Option<String>,
    assignments: Vec<String>,
    where_exprs: Vec<String>,
}

impl Deref for UpdateBuilder {
    type Target = Cond;
    fn deref(&self) -> &Self::Target {
        &self.cond
    }
}

impl Default for UpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for UpdateBuilder {
    fn clone(&self) -> Self {
        let args = Rc::new(RefCell::new(self.args.borrow().clone()));
        let cond = Cond::with_args(args.clone());
        Self {
            args,
            cond,
            table: self.table.clone(),
            assignments: self.assignments.clone(),
            where_exprs: self.where_exprs.clone(),
        }
    }
}

impl UpdateBuilder {
    pub fn new() -> Self {
        let args = Rc::new(RefCell::new(Args::default()));
        let cond = Cond::with_args(args.clone());
        Self {
            args,
            cond,
            table: None,
            assignments: Vec::new(),
            where_exprs: Vec::new(),
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

    pub fn update(&mut self, table: &str) -> &mut Self {
        self.table = Some(escape(table));
        self
    }

    pub fn set<T>(&mut self, assignments: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.assignments = collect_into_strings(assignments);
        self
    }

    pub fn set_more(&mut self, assignments: impl IntoStrings) -> &mut Self {
        self.assignments.extend(collect_into_strings(assignments));
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

    pub fn assign(&self, field: &str, value: impl Into<Arg>) -> String {
        format!("{} = {}", escape(field), self.var(value))
    }

    pub fn incr(&self, field: &str) -> String {
        let f = escape(field);
        format!("{f} = {f} + 1")
    }

    pub fn add(&self, field: &str, value: impl Into<Arg>) -> String {
        let f = escape(field);
        format!("{f} = {f} + {}", self.var(value))
    }

    pub fn num_assignment(&self) -> usize {
        self.assignments.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn num_where(&self) -> usize {
        self.where_exprs.len()
    }
}

impl Builder for UpdateBuilder {
    fn build_with_flavor(&self, flavor: Flavor, initial_arg: &[Arg]) -> (String, Vec<Arg>) {
        let mut buf = StringBuilder::new();

        if let Some(t) = &self.table {
            buf.write_leading("UPDATE");
            buf.write_str(" ");
            buf.write_str(t);
        }

        if self.num_assignment() > 0 {
            buf.write_leading("SET");
            buf.write_str(" ");
            buf.write_strings(&self.assignments, ", ");
        }

        if !self.where_exprs.is_empty() {
            buf.write_leading("WHERE");
            buf.write_str(" ");
            buf.write_strings(&self.where_exprs, " AND ");
        }

        self.args
            .borrow()
            .compile_with_flavor(&buf.into_string(), flavor, initial_arg)
    }

    fn flavor(&self) -> Flavor {
        self.flavor()
    }
}
